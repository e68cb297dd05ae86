//! Generic fallback tray: a small window showing the tray icon.
//!
//! Used when no platform tray is reachable. Pointer and window-manager events on the window are
//! translated into the same [`TrayEvent`]s a real tray icon produces.

use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, anyhow};
use remote_tray_core::{
    TrayAttributes, TrayBackend, TrayEvent, TrayGeometry, TrayProxy, tray_id::TrayId,
};
use tracing::{debug, trace, warn};
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ButtonSource, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::icon::{Icon, RgbaIcon};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::backend::TrayBackendFactory;

const ICON_SIZE: f64 = 48.0;
const BACKGROUND: u32 = 0x0030_3030;

type SharedWindow = Rc<Box<dyn Window>>;

/// Decoded RGBA pixels of the tray icon.
struct IconPixels {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl IconPixels {
    fn from_icon(icon: &Icon) -> Option<Self> {
        let rgba = icon.0.cast_ref::<RgbaIcon>()?;
        Some(Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.buffer().to_vec(),
        })
    }

    /// Nearest-neighbour sample at (`x`, `y`) of a `width`×`height` target, blended over
    /// `BACKGROUND`.
    fn sample(&self, x: usize, y: usize, width: usize, height: usize) -> u32 {
        let sx = x * self.width as usize / width.max(1);
        let sy = y * self.height as usize / height.max(1);
        let idx = (sy * self.width as usize + sx) * 4;
        let Some(px) = self.rgba.get(idx..idx + 4) else {
            return BACKGROUND;
        };
        let (r, g, b, a) = (px[0], px[1], px[2], px[3] as u32);
        let blend = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * (255 - a)) / 255) as u8;
        let [back_b, back_g, back_r, _] = BACKGROUND.to_le_bytes();
        u32::from_le_bytes([blend(b, back_b), blend(g, back_g), blend(r, back_r), 0])
    }
}

/// The tray event a status-window event stands for. `origin` is the window's outer position,
/// used to report pointer positions in screen coordinates.
fn tray_event(
    event: &WindowEvent,
    origin: Option<PhysicalPosition<i32>>,
    time: u32,
) -> Option<TrayEvent> {
    match event {
        WindowEvent::PointerButton {
            state,
            button: ButtonSource::Mouse(button),
            ..
        } => Some(TrayEvent::Click {
            button: *button,
            state: *state,
            time,
        }),
        WindowEvent::PointerEntered { position, .. } => {
            let position = match origin {
                Some(origin) => PhysicalPosition::new(
                    origin.x as f64 + position.x,
                    origin.y as f64 + position.y,
                ),
                None => *position,
            };
            Some(TrayEvent::MouseOver {
                position: Some(position),
            })
        }
        WindowEvent::CloseRequested => Some(TrayEvent::ExitRequested),
        WindowEvent::Moved(_) | WindowEvent::SurfaceResized(_) => Some(TrayEvent::GeometryQuery),
        _ => None,
    }
}

pub struct StatusWindowTray {
    tray_id: TrayId,
    window: SharedWindow,
    _context: softbuffer::Context<SharedWindow>,
    surface: softbuffer::Surface<SharedWindow, SharedWindow>,
    icon: Option<IconPixels>,
    proxy: TrayProxy,
    started: Instant,
}

impl std::fmt::Debug for StatusWindowTray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusWindowTray")
            .field("tray_id", &self.tray_id)
            .field("window_id", &self.window.id())
            .finish_non_exhaustive()
    }
}

impl StatusWindowTray {
    pub const NAME: &'static str = "status-window";

    pub fn new(
        event_loop: &dyn ActiveEventLoop,
        attr: &TrayAttributes,
        proxy: TrayProxy,
    ) -> anyhow::Result<Self> {
        let tray_id = TrayId::next();
        debug!(?tray_id, title = %attr.title, "Creating status window tray");

        let window_attributes = WindowAttributes::default()
            .with_title(attr.tooltip_or_title())
            .with_surface_size(LogicalSize::new(ICON_SIZE, ICON_SIZE))
            .with_resizable(false)
            .with_window_icon(attr.icon.clone());
        let window: SharedWindow = Rc::new(
            event_loop
                .create_window(window_attributes)
                .map_err(|e| anyhow!("failed to create status window: {e}"))?,
        );

        let context = softbuffer::Context::new(window.clone())
            .map_err(|e| anyhow!("failed to create softbuffer context: {e}"))?;
        let mut surface = softbuffer::Surface::new(&context, window.clone())
            .map_err(|e| anyhow!("failed to create softbuffer surface: {e}"))?;
        let size = window.surface_size();
        surface
            .resize(
                NonZeroU32::new(size.width).unwrap_or(NonZeroU32::MIN),
                NonZeroU32::new(size.height).unwrap_or(NonZeroU32::MIN),
            )
            .map_err(|e| anyhow!("failed to size status window surface: {e}"))?;

        // Request an initial redraw so the window appears on Wayland
        window.request_redraw();

        Ok(Self {
            tray_id,
            window,
            _context: context,
            surface,
            icon: attr.icon.as_ref().and_then(IconPixels::from_icon),
            proxy,
            started: Instant::now(),
        })
    }

    pub fn factory<'a>(event_loop: &'a dyn ActiveEventLoop) -> TrayBackendFactory<'a> {
        TrayBackendFactory::new(Self::NAME, || true, move |attr, proxy| {
            let tray = StatusWindowTray::new(event_loop, attr, proxy)?;
            Ok(Box::new(tray) as Box<dyn TrayBackend>)
        })
    }

    fn emit(&self, event: TrayEvent) {
        trace!(?event, "status window event");
        (self.proxy)(self.tray_id, event);
    }

    fn elapsed_ms(&self) -> u32 {
        u32::try_from(self.started.elapsed().as_millis()).unwrap_or(u32::MAX)
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let size = self.window.surface_size();
        let (width, height) = (size.width as usize, size.height as usize);
        if width == 0 || height == 0 {
            return Ok(());
        }

        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|e| anyhow!("failed to map status window buffer: {e}"))?;
        for y in 0..height {
            for x in 0..width {
                buffer[y * width + x] = match &self.icon {
                    Some(icon) => icon.sample(x, y, width, height),
                    None => BACKGROUND,
                };
            }
        }
        self.window.pre_present_notify();
        buffer
            .present()
            .map_err(|e| anyhow!("failed to present status window: {e}"))
    }
}

impl TrayBackend for StatusWindowTray {
    fn id(&self) -> TrayId {
        self.tray_id
    }

    fn backend_name(&self) -> &'static str {
        Self::NAME
    }

    fn set_tooltip(&mut self, tooltip: &str) -> anyhow::Result<()> {
        self.window.set_title(tooltip);
        Ok(())
    }

    fn geometry(&self) -> anyhow::Result<TrayGeometry> {
        let position = self
            .window
            .outer_position()
            .map_err(|e| anyhow!("{e}"))
            .context("status window position is not available")?;
        Ok(TrayGeometry {
            position,
            size: self.window.outer_size(),
        })
    }

    fn window_id(&self) -> Option<WindowId> {
        Some(self.window.id())
    }

    fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::SurfaceResized(size) => {
                if let (Some(width), Some(height)) =
                    (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                {
                    if let Err(e) = self.surface.resize(width, height) {
                        warn!("failed to resize status window surface: {e}");
                    }
                }
                self.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    warn!("{e:#}");
                }
            }
            _ => {}
        }

        let origin = self.window.outer_position().ok();
        if let Some(tray_event) = tray_event(event, origin, self.elapsed_ms()) {
            self.emit(tray_event);
        }
    }
}
