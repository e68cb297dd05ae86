//! Minimal text-entry window.

use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use demos::{SharedWindow, SurfaceRenderer, TextEntry, is_close_accelerator};
use remote_tray::HarnessConfig;
use remote_tray::icons::IconLoader;
use remote_tray::lifecycle::{ProgramContext, register_signal_handlers};
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{WindowAttributes, WindowId};

const BACKGROUND: u32 = 0x00f0_f0f0;
const FIELD: u32 = 0x00ff_ffff;
const TEXT_BAR: u32 = 0x0040_4040;

struct App {
    icon_loader: IconLoader,
    window: Option<SharedWindow>,
    renderer: Option<SurfaceRenderer>,
    entry: TextEntry,
    modifiers: ModifiersState,
    focused: bool,
    exit_signal: Arc<AtomicBool>,
}

impl App {
    fn edited(&self) {
        debug!(text = self.entry.text(), "entry changed");
        if let Some(window) = &self.window {
            window.set_title(&self.entry.window_title());
            window.request_redraw();
        }
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let (Some(window), Some(renderer)) = (&self.window, &mut self.renderer) else {
            return Ok(());
        };
        let size = window.surface_size();
        // One bar segment per character stands in for glyphs.
        let chars = self.entry.text().chars().count();
        window.pre_present_notify();
        renderer.render(size.width, size.height, |x, y, width, height| {
            let margin = 16;
            let half = height.min(48) / 2;
            let (top, bottom) = (height / 2 - half, height / 2 + half);
            if y < top || y >= bottom || x < margin || x + margin >= width {
                return BACKGROUND;
            }
            let bar_end = margin + 4 + chars * 8;
            let in_bar = (top + 8..bottom.saturating_sub(8)).contains(&y)
                && (margin + 4..bar_end).contains(&x);
            if in_bar {
                TEXT_BAR
            } else {
                FIELD
            }
        })
    }
}

impl ApplicationHandler for App {
    fn can_create_surfaces(&mut self, event_loop: &dyn ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(TextEntry::TITLE)
            .with_surface_size(LogicalSize::new(320.0, 200.0))
            .with_window_icon(self.icon_loader.load("font.png"));
        let window: SharedWindow = match event_loop.create_window(window_attributes) {
            Ok(window) => Rc::new(window),
            Err(err) => {
                error!(%err, "failed to create window");
                event_loop.exit();
                return;
            }
        };

        match SurfaceRenderer::new(window.clone()) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(err) => warn!("{err:#}"),
        }

        // Request an initial redraw so the window appears on Wayland
        window.request_redraw();
        self.window = Some(window);
    }

    fn proxy_wake_up(&mut self, event_loop: &dyn ActiveEventLoop) {
        if self.exit_signal.load(Ordering::SeqCst) {
            info!("exiting on signal");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &dyn ActiveEventLoop, _: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested, stopping");
                event_loop.exit();
            }
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if is_close_accelerator(&event.logical_key, self.modifiers) {
                    info!(key = ?event.logical_key, "close accelerator, stopping");
                    event_loop.exit();
                    return;
                }
                let changed = match (&event.logical_key, &event.text) {
                    (Key::Named(NamedKey::Backspace), _) => self.entry.backspace(),
                    (_, Some(text)) if !self.modifiers.control_key() => self.entry.insert(text),
                    _ => false,
                };
                if changed {
                    self.edited();
                }
            }
            WindowEvent::SurfaceResized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    if let Err(err) = renderer.resize(size.width, size.height) {
                        warn!("{err:#}");
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.render() {
                    warn!("{err:#}");
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &dyn ActiveEventLoop) {
        if self.focused {
            return;
        }
        if let Some(window) = &self.window {
            window.focus_window();
            self.focused = true;
            info!(text = self.entry.text(), "text entry ready");
        }
    }
}

fn main() -> anyhow::Result<()> {
    demos::init_logging();

    let config = HarnessConfig::from_env()?;
    let _context = ProgramContext::enter("Text-Entry", TextEntry::TITLE);

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

    let app = App {
        icon_loader: IconLoader::new(config.icon_dirs),
        window: None,
        renderer: None,
        entry: TextEntry::default(),
        modifiers: ModifiersState::empty(),
        focused: false,
        exit_signal,
    };
    event_loop.run_app(app)?;
    Ok(())
}
