use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::util::SniIcon;
use anyhow::{Result, anyhow};
use dpi::{PhysicalPosition, PhysicalSize};
use remote_tray_core::{TrayEvent, TrayGeometry, TrayProxy, tray_id::TrayId};
use tracing::trace;
use winit_core::event::{ElementState, MouseButton};
use zbus::object_server::SignalEmitter;
use zbus::zvariant::ObjectPath;

/// Mutable part of the item, shared with the owning [`crate::Tray`].
#[derive(Debug, Default)]
pub(crate) struct ItemState {
    pub(crate) title: String,
    pub(crate) tooltip: String,
    /// Where the host last reported an activation, the closest thing to a geometry SNI offers.
    pub(crate) last_activation: Option<PhysicalPosition<i32>>,
}

impl ItemState {
    /// Returns whether the tooltip changed.
    pub(crate) fn set_tooltip(&mut self, tooltip: &str) -> bool {
        if self.tooltip == tooltip {
            return false;
        }
        self.tooltip = tooltip.to_string();
        true
    }

    /// The last activation point, with zero size.
    pub(crate) fn geometry(&self) -> Result<TrayGeometry> {
        let position = self
            .last_activation
            .ok_or_else(|| anyhow!("the StatusNotifierItem host has not reported a position yet"))?;
        Ok(TrayGeometry {
            position,
            size: PhysicalSize::new(0, 0),
        })
    }
}

/// StatusNotifierItem D-Bus interface implementation.
pub struct StatusNotifierItemInterface {
    pub(crate) id: String,
    pub(crate) icon_name: String,
    pub(crate) icon_pixmap: Vec<SniIcon>,
    pub(crate) tray_id: TrayId,
    pub(crate) proxy: TrayProxy,
    pub(crate) state: Arc<Mutex<ItemState>>,
    pub(crate) started: Instant,
}

impl StatusNotifierItemInterface {
    fn elapsed_ms(&self) -> u32 {
        u32::try_from(self.started.elapsed().as_millis()).unwrap_or(u32::MAX)
    }

    /// SNI only reports completed activations, so each one is delivered as a press and a release.
    fn click(&self, button: MouseButton, x: i32, y: i32) {
        if let Ok(mut state) = self.state.lock() {
            state.last_activation = Some(PhysicalPosition::new(x, y));
        }
        let time = self.elapsed_ms();
        for state in [ElementState::Pressed, ElementState::Released] {
            (self.proxy)(self.tray_id, TrayEvent::Click { button, state, time });
        }
        (self.proxy)(self.tray_id, TrayEvent::GeometryQuery);
    }

    fn read<R>(&self, f: impl FnOnce(&ItemState) -> R) -> R
    where
        R: Default,
    {
        self.state.lock().map(|s| f(&s)).unwrap_or_default()
    }
}

#[zbus::interface(name = "org.kde.StatusNotifierItem")]
impl StatusNotifierItemInterface {
    /// Primary activation (typically left-click).
    fn activate(&mut self, x: i32, y: i32) {
        trace!(x, y, "StatusNotifierItem::Activate called");
        self.click(MouseButton::Left, x, y);
    }

    /// Secondary activation (typically middle-click on KDE, right-click elsewhere).
    fn secondary_activate(&mut self, x: i32, y: i32) {
        trace!(x, y, "StatusNotifierItem::SecondaryActivate called");
        self.click(MouseButton::Right, x, y);
    }

    /// The host wants the context menu; we have no exported menu, so treat it as a right-click.
    fn context_menu(&mut self, x: i32, y: i32) {
        trace!(x, y, "StatusNotifierItem::ContextMenu called");
        self.click(MouseButton::Right, x, y);
    }

    fn scroll(&mut self, delta: i32, orientation: &str) {
        trace!(delta, orientation, "StatusNotifierItem::Scroll called");
        (self.proxy)(self.tray_id, TrayEvent::MouseOver { position: None });
    }

    #[zbus(signal)]
    pub(crate) async fn new_tool_tip(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;

    #[zbus(property)]
    fn id(&self) -> &str {
        &self.id
    }

    #[zbus(property)]
    fn title(&self) -> String {
        self.read(|s| s.title.clone())
    }

    #[zbus(property)]
    fn category(&self) -> &str {
        "ApplicationStatus"
    }

    #[zbus(property)]
    fn status(&self) -> &str {
        "Active"
    }

    #[zbus(property)]
    fn window_id(&self) -> i32 {
        0
    }

    /// Theme icon name, used by hosts when no pixmap is advertised.
    #[zbus(property)]
    fn icon_name(&self) -> &str {
        if self.icon_pixmap.is_empty() {
            &self.icon_name
        } else {
            ""
        }
    }

    /// Icon pixmap data in ARGB32 format.
    #[zbus(property)]
    fn icon_pixmap(&self) -> &Vec<SniIcon> {
        &self.icon_pixmap
    }

    #[zbus(property)]
    fn overlay_icon_name(&self) -> &str {
        ""
    }

    #[zbus(property)]
    fn overlay_icon_pixmap(&self) -> Vec<SniIcon> {
        vec![]
    }

    #[zbus(property)]
    fn attention_icon_name(&self) -> &str {
        ""
    }

    #[zbus(property)]
    fn attention_icon_pixmap(&self) -> Vec<SniIcon> {
        vec![]
    }

    #[zbus(property)]
    fn attention_movie_name(&self) -> &str {
        ""
    }

    /// Format: (icon_name, icon_pixmap, title, description)
    #[zbus(property)]
    fn tool_tip(&self) -> (String, Vec<SniIcon>, String, String) {
        let (title, tooltip) = self.read(|s| (s.title.clone(), s.tooltip.clone()));
        (String::new(), vec![], title, tooltip)
    }

    #[zbus(property)]
    fn icon_theme_path(&self) -> &str {
        ""
    }

    /// No DBusMenu is exported; menus are driven by the application on activation.
    #[zbus(property)]
    fn menu(&self) -> ObjectPath<'static> {
        ObjectPath::from_static_str_unchecked("/")
    }

    #[zbus(property)]
    fn item_is_menu(&self) -> bool {
        false
    }
}
