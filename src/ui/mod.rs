//! Terminal output for the jdkup CLI
//!
//! Uses `cliclack` for prompts and log lines and `indicatif` for download
//! bars, falling back to plain line output when stdout is not a terminal
//! or a CI environment is detected.
//!
//! ```rust,ignore
//! use jdkup::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Loading catalog...");
//! spinner.stop("Catalog loaded");
//! ui::step_ok_detail(&ctx, "temurin 17.0.2", "/home/me/.jdks/temurin-17.0.2");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, outro_error, outro_success, remark, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{DownloadProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, JdkupTheme};
