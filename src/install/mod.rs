//! Deduplicated JDK installs
//!
//! - [`RequestKey`] identifies an artifact (sha256, version, url)
//! - [`InstallCoordinator`] shares one [`InstallHandle`] between every
//!   concurrent request for a key
//! - [`InstallExecutor`] does the physical work; [`ArchiveInstaller`] is the
//!   production implementation

mod archive;
mod coordinator;
mod executor;
mod handle;
mod key;
pub mod marker;

pub use archive::ArchiveInstaller;
pub use coordinator::{InstallCoordinator, InstallTicket, TicketRole};
pub use executor::{InstallExecutor, ProgressSink};
pub use handle::{InstallHandle, InstallState};
pub use key::RequestKey;
