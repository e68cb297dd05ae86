#![cfg(target_os = "linux")]

mod dbus_interface;
mod util;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use remote_tray_core::{TrayAttributes, TrayBackend, TrayGeometry, TrayProxy, tray_id::TrayId};
use tracing::{debug, trace, warn};
use zbus::blocking::Connection;

use dbus_interface::{ItemState, StatusNotifierItemInterface};
use util::icon_pixmaps;

pub const BACKEND_NAME: &str = "status-notifier-item";

const SNI_OBJECT_PATH: &str = "/StatusNotifierItem";
const SNI_WATCHER_SERVICE: &str = "org.kde.StatusNotifierWatcher";
const SNI_WATCHER_PATH: &str = "/StatusNotifierWatcher";

/// Whether a session bus looks reachable. Cheap: no connection is made.
pub fn is_available() -> bool {
    std::env::var_os("DBUS_SESSION_BUS_ADDRESS").is_some()
        || std::env::var_os("XDG_RUNTIME_DIR")
            .is_some_and(|dir| Path::new(&dir).join("bus").exists())
}

/// Linux system tray icon implementation using StatusNotifierItem.
pub struct Tray {
    tray_id: TrayId,
    connection: Connection,
    state: Arc<Mutex<ItemState>>,
}

impl std::fmt::Debug for Tray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tray")
            .field("tray_id", &self.tray_id)
            .field("unique_name", &self.connection.unique_name())
            .finish_non_exhaustive()
    }
}

impl Tray {
    /// Export a StatusNotifierItem and register it with the watcher.
    ///
    /// Fails when the session bus or the StatusNotifierWatcher cannot be reached, since the icon
    /// would never be shown.
    pub fn new(proxy: TrayProxy, attr: &TrayAttributes) -> Result<Self> {
        let tray_id = TrayId::next();
        debug!(?tray_id, title = %attr.title, "Creating StatusNotifierItem");

        let state = Arc::new(Mutex::new(ItemState {
            title: attr.title.clone(),
            tooltip: attr.tooltip_or_title().to_string(),
            last_activation: None,
        }));

        let interface = StatusNotifierItemInterface {
            id: format!("remote_tray_{}_{}", attr.app_id, tray_id.into_raw()),
            icon_name: attr.icon_name.clone(),
            icon_pixmap: icon_pixmaps(attr.icon.as_ref()),
            tray_id,
            proxy,
            state: state.clone(),
            started: Instant::now(),
        };

        let connection =
            Connection::session().context("Failed to connect to D-Bus session bus")?;
        debug!("Connected to D-Bus session bus");

        connection
            .object_server()
            .at(SNI_OBJECT_PATH, interface)
            .context("Failed to register StatusNotifierItem interface")?;
        debug!(path = SNI_OBJECT_PATH, "Registered StatusNotifierItem interface");

        let tray = Tray {
            tray_id,
            connection,
            state,
        };
        // On failure `tray` is dropped here, which removes the exported interface again.
        register_with_watcher(&tray.connection)?;
        Ok(tray)
    }
}

impl Tray {
    /// Hosts watch `NewToolTip`; property caches watch `PropertiesChanged`. Send both.
    fn emit_tooltip_changed(&self) -> Result<()> {
        let iface_ref = self
            .connection
            .object_server()
            .interface::<_, StatusNotifierItemInterface>(SNI_OBJECT_PATH)
            .context("StatusNotifierItem interface is not exported")?;
        let emitter = iface_ref.signal_emitter();

        zbus::block_on(iface_ref.get().tool_tip_changed(emitter))
            .context("Failed to emit ToolTip property change")?;
        zbus::block_on(StatusNotifierItemInterface::new_tool_tip(emitter))
            .context("Failed to emit NewToolTip")?;
        trace!("Emitted StatusNotifierItem tooltip change");
        Ok(())
    }
}

impl TrayBackend for Tray {
    fn id(&self) -> TrayId {
        self.tray_id
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn set_tooltip(&mut self, tooltip: &str) -> Result<()> {
        let changed = self
            .state
            .lock()
            .map_err(|_| anyhow!("StatusNotifierItem state lock poisoned"))?
            .set_tooltip(tooltip);
        if changed {
            self.emit_tooltip_changed()?;
        }
        Ok(())
    }

    fn geometry(&self) -> Result<TrayGeometry> {
        self.state
            .lock()
            .map_err(|_| anyhow!("StatusNotifierItem state lock poisoned"))?
            .geometry()
    }
}

impl Drop for Tray {
    fn drop(&mut self) {
        debug!(tray_id = ?self.tray_id, "Dropping StatusNotifierItem");
        unregister_from_watcher(&self.connection);
        if let Err(e) = self
            .connection
            .object_server()
            .remove::<StatusNotifierItemInterface, _>(SNI_OBJECT_PATH)
        {
            warn!("Failed to remove StatusNotifierItem interface: {e}");
        }
    }
}

fn service_name(connection: &Connection) -> Result<String> {
    let unique_name = connection
        .unique_name()
        .ok_or_else(|| anyhow!("Failed to get D-Bus unique name"))?;
    Ok(format!("{unique_name}{SNI_OBJECT_PATH}"))
}

fn watcher_proxy(connection: &Connection) -> zbus::Result<zbus::blocking::Proxy<'_>> {
    zbus::blocking::Proxy::new(
        connection,
        SNI_WATCHER_SERVICE,
        SNI_WATCHER_PATH,
        SNI_WATCHER_SERVICE,
    )
}

/// Registers this tray icon with the StatusNotifierWatcher, which tells the host about it.
fn register_with_watcher(connection: &Connection) -> Result<()> {
    let service_name = service_name(connection)?;
    debug!(service = %service_name, "Calling RegisterStatusNotifierItem");

    watcher_proxy(connection)
        .context("StatusNotifierWatcher is not available")?
        .call::<_, _, ()>("RegisterStatusNotifierItem", &service_name)
        .context("Failed to call RegisterStatusNotifierItem")?;

    debug!("Registered with StatusNotifierWatcher");
    Ok(())
}

/// Best effort: most watchers drop items when their bus name vanishes and have no unregister call.
fn unregister_from_watcher(connection: &Connection) {
    let Ok(service_name) = service_name(connection) else {
        return;
    };
    match watcher_proxy(connection) {
        Ok(proxy) => {
            let _ = proxy.call::<_, _, ()>("UnregisterStatusNotifierItem", &service_name);
            trace!(service = %service_name, "Unregistered from StatusNotifierWatcher");
        }
        Err(e) => debug!("Could not create proxy for unregistration: {e}"),
    }
}
