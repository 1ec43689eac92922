use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use charming::{Chart, HtmlRenderer, ImageRenderer};

/// Writes charts as interactive HTML and, unless disabled, as static SVG images.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    images: bool,
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            images: true,
        }
    }

    /// Only write the HTML documents.
    pub fn without_images(mut self) -> Self {
        self.images = false;
        self
    }

    /// Render `chart` to `<dir>/<stem>.html` and `<dir>/<stem>.svg` at the default size.
    pub fn render(
        &self,
        chart: &Chart,
        title: &str,
        dir: &Path,
        stem: &str,
    ) -> anyhow::Result<Vec<PathBuf>> {
        self.render_with_height(chart, title, dir, stem, self.height)
    }

    /// Like [ChartRenderer::render], for charts that need more vertical space.
    pub fn render_with_height(
        &self,
        chart: &Chart,
        title: &str,
        dir: &Path,
        stem: &str,
        height: u32,
    ) -> anyhow::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create chart directory {}", dir.display()))?;

        let html = dir.join(format!("{stem}.html"));
        HtmlRenderer::new(title, self.width as u64, height as u64)
            .save(chart, &html)
            .map_err(|e| anyhow!("Failed to write {}: {e:?}", html.display()))?;
        log::debug!("Wrote {}", html.display());
        let mut written = vec![html];

        if self.images {
            let svg = dir.join(format!("{stem}.svg"));
            let mut renderer = ImageRenderer::new(self.width, height);
            renderer
                .save(chart, &svg)
                .map_err(|e| anyhow!("Failed to write {}: {e:?}", svg.display()))?;
            log::debug!("Wrote {}", svg.display());
            written.push(svg);
        }

        Ok(written)
    }
}
