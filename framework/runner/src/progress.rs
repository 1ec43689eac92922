use std::fmt::Write;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressState, ProgressStyle};

/// A progress bar counting seconds towards a scenario's deadline.
///
/// Returns `None` when progress is disabled. The bar ticks on its own thread so the spinner
/// keeps moving while the supervisor is waiting on output.
pub(crate) fn scenario_progress(
    name: &str,
    deadline: Duration,
    enabled: bool,
) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new(deadline.as_secs());
    match ProgressStyle::with_template(
        "{spinner:.green} {prefix} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {deadline}] {msg}",
    ) {
        Ok(style) => pb.set_style(
            style
                .with_key("deadline", {
                    let hours = deadline.as_secs() / 3600;
                    let minutes = (deadline.as_secs() % 3600) / 60;
                    let seconds = deadline.as_secs() % 60;
                    move |_state: &ProgressState, w: &mut dyn Write| {
                        let _ = write!(w, "{hours:02}:{minutes:02}:{seconds:02}");
                    }
                })
                .progress_chars("#>-"),
        ),
        Err(e) => log::warn!("Using the default progress style: {e}"),
    }
    pb.set_prefix(name.to_string());
    pb.enable_steady_tick(Duration::from_millis(250));

    Some(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_progress_has_no_bar() {
        assert!(scenario_progress("Baseline Test", Duration::from_secs(60), false).is_none());
    }

    #[test]
    fn bar_length_is_deadline_in_seconds() {
        let pb = scenario_progress("Baseline Test", Duration::from_secs(90), true).unwrap();
        assert_eq!(Some(90), pb.length());
        pb.finish_and_clear();
    }
}
