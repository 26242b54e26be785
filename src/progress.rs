//! Spinner decorator for long-running calls.

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

fn start(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Await `fut` with a spinner showing `message`. No spinner when disabled.
pub async fn with_spinner<F, T>(message: &str, enabled: bool, fut: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = enabled.then(|| start(message));
    let output = fut.await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    output
}

/// Run a blocking operation with a spinner showing `message`.
pub fn run_with_spinner<T>(message: &str, enabled: bool, op: impl FnOnce() -> T) -> T {
    let spinner = enabled.then(|| start(message));
    let output = op();
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    output
}
