//! System-tray harness: a tray icon and menu driven by a fake connected client.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use remote_tray::icons::IconLoader;
use remote_tray::lifecycle::{ProgramContext, register_signal_handlers};
use remote_tray::{
    Candidates, ClientState, EventOutcome, HarnessConfig, HarnessError, TrayCoordinator,
    TrayManager, default_backends, default_menu_helpers,
};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::WindowId;

struct App {
    config: HarnessConfig,
    client: ClientState,
    tray_manager: TrayManager,
    coordinator: Option<TrayCoordinator>,
    exit_signal: Arc<AtomicBool>,
    fatal: Rc<RefCell<Option<HarnessError>>>,
}

impl App {
    fn exit(&mut self, event_loop: &dyn ActiveEventLoop) {
        if let Some(coordinator) = &mut self.coordinator {
            coordinator.request_exit();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn can_create_surfaces(&mut self, event_loop: &dyn ActiveEventLoop) {
        if self.coordinator.is_some() {
            return;
        }

        let icon = IconLoader::new(self.config.icon_dirs.clone()).load(&self.config.icon_name);
        let candidates = Candidates {
            menu_helpers: default_menu_helpers(),
            backends: default_backends(event_loop),
            forced_backend: self.config.backend.clone(),
        };
        let attributes = self.config.tray_attributes(icon);

        let proxy = self.tray_manager.proxy();
        match TrayCoordinator::new(&self.client, attributes, candidates, proxy) {
            Ok(coordinator) => self.coordinator = Some(coordinator),
            Err(err) => {
                error!("{err}");
                *self.fatal.borrow_mut() = Some(err);
                event_loop.exit();
            }
        }
    }

    fn proxy_wake_up(&mut self, event_loop: &dyn ActiveEventLoop) {
        if self.exit_signal.load(Ordering::SeqCst) {
            info!("exiting on signal");
            self.exit(event_loop);
            return;
        }

        let Some(coordinator) = &mut self.coordinator else {
            return;
        };
        while let Ok((tray_id, event)) = self.tray_manager.try_recv() {
            if coordinator.handle_event(tray_id, event) == EventOutcome::Exit {
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &dyn ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(coordinator) = &mut self.coordinator {
            coordinator.forward_window_event(window_id, &event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &dyn ActiveEventLoop) {
        if let Some(coordinator) = &mut self.coordinator {
            coordinator.run_deferred();
        }
    }
}

fn main() -> anyhow::Result<()> {
    demos::init_logging();

    let config = HarnessConfig::from_env()?;
    let client = config.load_client_state()?;
    let _context = ProgramContext::enter("Tray-Test", &config.title);

    let event_loop = EventLoop::new()?;
    let exit_signal = Arc::new(AtomicBool::new(false));
    let _signals = register_signal_handlers({
        let exit_signal = exit_signal.clone();
        let proxy = event_loop.create_proxy();
        move |_| {
            exit_signal.store(true, Ordering::SeqCst);
            proxy.wake_up();
        }
    })?;

    let fatal = Rc::new(RefCell::new(None));
    let app = App {
        config,
        client,
        tray_manager: TrayManager::new(&event_loop),
        coordinator: None,
        exit_signal,
        fatal: fatal.clone(),
    };
    event_loop.run_app(app)?;

    match fatal.take() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
