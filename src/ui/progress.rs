//! Spinners and download bars with CI fallback

use super::context::UiContext;
use crate::install::{ProgressSink, RequestKey};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// One progress bar per concurrent download.
///
/// Interactive mode stacks indicatif bars in a [`MultiProgress`]; otherwise
/// a line is printed when each download starts and when unpacking begins.
pub struct DownloadProgress {
    multi: Option<MultiProgress>,
    bars: Mutex<HashMap<RequestKey, ProgressBar>>,
}

impl DownloadProgress {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            multi: ctx.use_fancy_output().then(MultiProgress::new),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_style(total_known: bool) -> ProgressStyle {
        let template = if total_known {
            "  {spinner:.cyan} {prefix}  {bar:24.cyan/dim} {bytes}/{total_bytes} {msg:.dim}"
        } else {
            "  {spinner:.cyan} {prefix}  {bytes} {msg:.dim}"
        };
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars(TICK_CHARS)
            .progress_chars("━╸─")
    }

    fn with_bar(&self, key: &RequestKey, f: impl FnOnce(&ProgressBar)) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = bars.get(key) {
            f(bar);
        }
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ProgressSink for DownloadProgress {
    fn download_started(&self, key: &RequestKey, total: Option<u64>) {
        let Some(ref multi) = self.multi else {
            println!("{} Downloading {}", style("...").dim(), key);
            return;
        };

        let bar = multi.add(ProgressBar::new(total.unwrap_or(0)));
        bar.set_style(Self::bar_style(total.is_some()));
        bar.set_prefix(key.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), bar);
    }

    fn download_progress(&self, key: &RequestKey, downloaded: u64) {
        self.with_bar(key, |bar| bar.set_position(downloaded));
    }

    fn unpacking(&self, key: &RequestKey) {
        if self.multi.is_none() {
            println!("{} Unpacking {}", style("...").dim(), key);
            return;
        }
        self.with_bar(key, |bar| bar.set_message("unpacking"));
    }

    fn finished(&self, key: &RequestKey) {
        let bar = self
            .bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if let Some(bar) = bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
