use remote_tray_core::{TrayAttributes, TrayBackend, TrayProxy};
#[cfg(feature = "status_window")]
use winit::event_loop::ActiveEventLoop;

type BackendConstructor<'a> =
    Box<dyn Fn(&TrayAttributes, TrayProxy) -> anyhow::Result<Box<dyn TrayBackend>> + 'a>;

/// A tray backend candidate.
pub struct TrayBackendFactory<'a> {
    pub name: &'static str,
    /// Evaluated before construction is attempted; `false` skips the candidate.
    pub available: fn() -> bool,
    construct: BackendConstructor<'a>,
}

impl std::fmt::Debug for TrayBackendFactory<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrayBackendFactory")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<'a> TrayBackendFactory<'a> {
    pub fn new(
        name: &'static str,
        available: fn() -> bool,
        construct: impl Fn(&TrayAttributes, TrayProxy) -> anyhow::Result<Box<dyn TrayBackend>> + 'a,
    ) -> Self {
        Self {
            name,
            available,
            construct: Box::new(construct),
        }
    }

    pub fn construct(
        &self,
        attr: &TrayAttributes,
        proxy: TrayProxy,
    ) -> anyhow::Result<Box<dyn TrayBackend>> {
        (self.construct)(attr, proxy)
    }
}

/// Platform-native backends, in priority order. Empty on platforms without one.
pub fn native_backends<'a>() -> Vec<TrayBackendFactory<'a>> {
    #[allow(unused_mut)]
    let mut backends = Vec::new();

    #[cfg(target_os = "linux")]
    backends.push(TrayBackendFactory::new(
        remote_tray_linux::BACKEND_NAME,
        remote_tray_linux::is_available,
        |attr, proxy| {
            let tray = remote_tray_linux::Tray::new(proxy, attr)?;
            Ok(Box::new(tray) as Box<dyn TrayBackend>)
        },
    ));

    #[cfg(target_os = "windows")]
    backends.push(TrayBackendFactory::new(
        remote_tray_windows::BACKEND_NAME,
        remote_tray_windows::is_available,
        |attr, proxy| {
            let tray = remote_tray_windows::Tray::new(proxy, attr)?;
            Ok(Box::new(tray) as Box<dyn TrayBackend>)
        },
    ));

    #[cfg(target_os = "macos")]
    backends.push(TrayBackendFactory::new(
        remote_tray_macos::BACKEND_NAME,
        remote_tray_macos::is_available,
        |attr, proxy| {
            let tray = remote_tray_macos::Tray::new(proxy, attr)?;
            Ok(Box::new(tray) as Box<dyn TrayBackend>)
        },
    ));

    backends
}

/// `native` in order, then `fallback`, which is tried only when every native backend failed.
pub fn with_fallback<'a>(
    mut native: Vec<TrayBackendFactory<'a>>,
    fallback: TrayBackendFactory<'a>,
) -> Vec<TrayBackendFactory<'a>> {
    native.push(fallback);
    native
}

/// Native backends followed by the generic status window.
#[cfg(feature = "status_window")]
pub fn default_backends<'a>(event_loop: &'a dyn ActiveEventLoop) -> Vec<TrayBackendFactory<'a>> {
    with_fallback(
        native_backends(),
        crate::status_window::StatusWindowTray::factory(event_loop),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unused(name: &'static str) -> TrayBackendFactory<'static> {
        TrayBackendFactory::new(name, || true, |_, _| anyhow::bail!("not constructed"))
    }

    #[test]
    fn native_backends_exclude_the_status_window() {
        let names: Vec<_> = native_backends().iter().map(|b| b.name).collect();
        assert!(!names.contains(&"status-window"));
        #[cfg(target_os = "linux")]
        assert_eq!(names, [remote_tray_linux::BACKEND_NAME]);
        #[cfg(target_os = "windows")]
        assert_eq!(names, [remote_tray_windows::BACKEND_NAME]);
        #[cfg(target_os = "macos")]
        assert_eq!(names, [remote_tray_macos::BACKEND_NAME]);
    }

    #[test]
    fn fallback_comes_after_native_candidates() {
        let mut native = native_backends();
        native.push(unused("first"));
        let native_names: Vec<_> = native.iter().map(|b| b.name).collect();

        let ordered = with_fallback(native, unused("status-window"));
        let names: Vec<_> = ordered.iter().map(|b| b.name).collect();
        assert_eq!(names.last(), Some(&"status-window"));
        assert_eq!(names[..names.len() - 1], native_names[..]);
    }

    #[cfg(feature = "status_window")]
    #[test]
    fn status_window_name_matches_its_factory() {
        assert_eq!(crate::status_window::StatusWindowTray::NAME, "status-window");
    }
}
