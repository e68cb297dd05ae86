use std::rc::Rc;

use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, WindowEvent},
    icon::Icon,
    window::WindowId,
};
pub use winit::event::MouseButton;

pub mod client;
pub use client::{
    ClientCapabilities, ClientState, ClipboardDirection, Feature, FeatureState, StateError,
    PREFERRED_ENCODINGS,
};

pub mod menu;
pub use menu::*;

pub mod tray_id;

/// Events raised by a tray backend.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum TrayEvent {
    /// A pointer button was pressed or released over the tray icon.
    Click {
        button: MouseButton,
        state: ElementState,
        /// Milliseconds on the backend's own clock.
        time: u32,
    },

    /// The pointer moved over the tray icon.
    MouseOver {
        /// Pointer position in screen coordinates, when the backend knows it.
        position: Option<PhysicalPosition<f64>>,
    },

    /// The user (or the platform) asked the application to quit.
    ExitRequested,

    /// The tray icon geometry may have changed and should be re-read from the handle.
    GeometryQuery,
}

pub type TrayProxy = std::sync::Arc<dyn Fn(tray_id::TrayId, TrayEvent) + Send + Sync>;

/// Screen rectangle occupied by a tray icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrayGeometry {
    pub position: PhysicalPosition<i32>,
    pub size: PhysicalSize<u32>,
}

impl TrayGeometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            position: PhysicalPosition::new(x, y),
            size: PhysicalSize::new(width, height),
        }
    }
}

/// An attached tray icon.
///
/// Backends report interaction through the [`TrayProxy`] they were built with; the methods here
/// are the calls the application makes back into the backend.
pub trait TrayBackend: std::fmt::Debug {
    fn id(&self) -> tray_id::TrayId;

    /// Name of the backend, as listed in the candidate table.
    fn backend_name(&self) -> &'static str;

    fn set_tooltip(&mut self, tooltip: &str) -> anyhow::Result<()>;

    /// Current on-screen rectangle of the icon.
    fn geometry(&self) -> anyhow::Result<TrayGeometry>;

    /// Window owned by the backend, for backends that draw their own icon window.
    fn window_id(&self) -> Option<WindowId> {
        None
    }

    /// Feed a window event for [`TrayBackend::window_id`] to the backend.
    fn handle_window_event(&mut self, _event: &WindowEvent) {}
}

/// Everything a backend constructor receives besides the event proxy.
#[derive(Debug, Clone)]
pub struct TrayAttributes {
    pub app_id: u32,
    pub title: String,
    pub tooltip: Option<String>,
    pub icon_name: String,
    pub icon: Option<Icon>,
    pub menu: Option<Rc<TrayMenu>>,
}

impl Default for TrayAttributes {
    fn default() -> Self {
        TrayAttributes {
            app_id: 0,
            title: "Tray".to_string(),
            tooltip: None,
            icon_name: String::new(),
            icon: None,
            menu: None,
        }
    }
}

impl TrayAttributes {
    /// Set the application identifier reported to the platform.
    pub fn with_app_id(mut self, app_id: u32) -> Self {
        self.app_id = app_id;
        self
    }

    /// Set the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the initial tooltip. Falls back to the title when unset.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Set the icon resource name and its decoded pixels, if they could be loaded.
    pub fn with_icon(mut self, icon_name: impl Into<String>, icon: Option<Icon>) -> Self {
        self.icon_name = icon_name.into();
        self.icon = icon;
        self
    }

    /// Attach the menu shown on tray interaction.
    pub fn with_menu(mut self, menu: Rc<TrayMenu>) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn tooltip_or_title(&self) -> &str {
        self.tooltip.as_deref().unwrap_or(&self.title)
    }
}
