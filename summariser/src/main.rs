use std::path::PathBuf;

use clap::Parser;
use stress_summariser::table::print_report;
use stress_summariser::{summarise, SummariseOptions};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct SummariserCli {
    /// The run directory containing the `*_results.csv` series files.
    #[clap(env = "RESULTS_DIR")]
    results_dir: PathBuf,

    /// Where to write the summary and charts. Defaults to `<results_dir>_analysis`.
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// Width of the rendered charts, in pixels.
    #[clap(long, default_value = "1200")]
    width: u32,

    /// Height of the rendered charts, in pixels. The combined chart grows with the number of tests.
    #[clap(long, default_value = "600")]
    height: u32,

    /// Only write the interactive HTML charts, not the SVG images.
    #[clap(long, default_value = "false")]
    skip_images: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = SummariserCli::parse();
    let output = summarise(&SummariseOptions {
        results_dir: cli.results_dir,
        output_dir: cli.output_dir,
        width: cli.width,
        height: cli.height,
        images: !cli.skip_images,
    })?;

    print_report(&output);

    Ok(())
}
