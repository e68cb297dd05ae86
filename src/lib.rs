pub use remote_tray_core::*;

mod tray;
pub use tray::TrayManager;

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod icons;
pub mod lifecycle;
pub mod menu_builder;
pub mod menu_helper;
pub mod scheduler;
#[cfg(feature = "status_window")]
pub mod status_window;

pub use backend::{TrayBackendFactory, native_backends};
#[cfg(feature = "status_window")]
pub use backend::default_backends;
pub use config::HarnessConfig;
pub use coordinator::{Candidates, CoordinatorState, DeferredAction, EventOutcome, TrayCoordinator};
pub use error::HarnessError;
pub use menu_helper::{MenuHelper, MenuHelperFactory, ToolkitMenuHelper, default_menu_helpers};
