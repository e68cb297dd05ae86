#![cfg(target_os = "macos")]

mod util;

use anyhow::{Result, anyhow};
use dpi::PhysicalPosition;
use objc2::rc::Retained;
use objc2::{AllocAnyThread, DeclaredClass, MainThreadMarker, define_class, msg_send};
use objc2_app_kit::{
    NSEvent, NSScreen, NSStatusBar, NSStatusItem, NSTrackingArea, NSTrackingAreaOptions,
    NSVariableStatusItemLength, NSView,
};
use objc2_core_foundation::{CGPoint, CGRect, CGSize};
use objc2_foundation::NSString;
use remote_tray_core::{
    TrayAttributes, TrayBackend, TrayEvent, TrayGeometry, TrayProxy, tray_id::TrayId,
};
use tracing::{debug, trace, warn};
use winit_core::event::{ElementState, MouseButton};

use crate::util::{frame_to_geometry, icon_to_nsimage, to_top_left_y};

pub const BACKEND_NAME: &str = "macos-status-item";

/// The system status bar exists in every GUI session.
pub fn is_available() -> bool {
    true
}

/// macOS menu bar icon built on `NSStatusItem`.
pub struct Tray {
    tray_id: TrayId,
    status_item: Retained<NSStatusItem>,
    tray_target: Retained<TrayTarget>,
}

impl std::fmt::Debug for Tray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tray")
            .field("tray_id", &self.tray_id)
            .finish_non_exhaustive()
    }
}

struct TrayTargetIvars {
    tray_id: TrayId,
    proxy: TrayProxy,
    status_item: Retained<NSStatusItem>,
}

define_class!(
    #[unsafe(super(NSView))]
    #[name = "RemoteTrayTarget"]
    #[ivars = TrayTargetIvars]
    struct TrayTarget;

    /// Mouse events on NSResponder
    impl TrayTarget {
        #[unsafe(method(mouseDown:))]
        fn on_mouse_down(&self, event: &NSEvent) {
            self.set_highlight(true);
            self.send_click(event, MouseButton::Left, ElementState::Pressed);
        }

        #[unsafe(method(mouseUp:))]
        fn on_mouse_up(&self, event: &NSEvent) {
            self.set_highlight(false);
            self.send_click(event, MouseButton::Left, ElementState::Released);
        }

        #[unsafe(method(rightMouseDown:))]
        fn on_right_mouse_down(&self, event: &NSEvent) {
            self.send_click(event, MouseButton::Right, ElementState::Pressed);
        }

        #[unsafe(method(rightMouseUp:))]
        fn on_right_mouse_up(&self, event: &NSEvent) {
            self.send_click(event, MouseButton::Right, ElementState::Released);
        }

        #[unsafe(method(otherMouseDown:))]
        fn on_other_mouse_down(&self, event: &NSEvent) {
            if event.buttonNumber() == 2 {
                self.send_click(event, MouseButton::Middle, ElementState::Pressed);
            }
        }

        #[unsafe(method(otherMouseUp:))]
        fn on_other_mouse_up(&self, event: &NSEvent) {
            if event.buttonNumber() == 2 {
                self.send_click(event, MouseButton::Middle, ElementState::Released);
            }
        }

        #[unsafe(method(mouseEntered:))]
        fn on_mouse_entered(&self, _event: &NSEvent) {
            let location = NSEvent::mouseLocation();
            let mtm = MainThreadMarker::from(self);
            let position = NSScreen::mainScreen(mtm).map(|screen| {
                let screen_frame = screen.frame();
                let scale = screen.backingScaleFactor();
                let y = to_top_left_y(location.y, 0.0, screen_frame.size.height);
                PhysicalPosition::new(location.x * scale, y * scale)
            });
            self.send(TrayEvent::MouseOver { position });
        }
    }

    /// Tracking mouse enter/exit events
    impl TrayTarget {
        #[unsafe(method(updateTrackingAreas))]
        fn update_tracking_areas(&self) {
            for area in self.trackingAreas() {
                self.removeTrackingArea(&area);
            }

            let _: () = unsafe { msg_send![super(self), updateTrackingAreas] };

            let options = NSTrackingAreaOptions::MouseEnteredAndExited
                | NSTrackingAreaOptions::ActiveAlways
                | NSTrackingAreaOptions::InVisibleRect;
            let rect = CGRect {
                origin: CGPoint { x: 0.0, y: 0.0 },
                size: CGSize {
                    width: 0.0,
                    height: 0.0,
                },
            };
            let area = unsafe {
                NSTrackingArea::initWithRect_options_owner_userInfo(
                    NSTrackingArea::alloc(),
                    rect,
                    options,
                    Some(self),
                    None,
                )
            };
            self.addTrackingArea(&area);
        }
    }
);

impl TrayTarget {
    fn send(&self, event: TrayEvent) {
        trace!(?event, "status item event");
        (self.ivars().proxy)(self.ivars().tray_id, event);
    }

    fn send_click(&self, event: &NSEvent, button: MouseButton, state: ElementState) {
        // Seconds since boot; the wrap after ~49 days matches the other backends' u32 clocks.
        let time = (event.timestamp() * 1000.0) as u64 as u32;
        self.send(TrayEvent::Click {
            button,
            state,
            time,
        });
    }

    fn set_highlight(&self, highlighted: bool) {
        let mtm = MainThreadMarker::from(self);
        if let Some(button) = self.ivars().status_item.button(mtm) {
            button.highlight(highlighted);
        }
    }

    fn update_dimensions(&self) {
        let mtm = MainThreadMarker::from(self);
        if let Some(button) = self.ivars().status_item.button(mtm) {
            self.setFrame(button.frame());
        }
    }
}

impl Tray {
    /// Must be called on the main thread.
    pub fn new(proxy: TrayProxy, attr: &TrayAttributes) -> Result<Self> {
        let mtm = MainThreadMarker::new()
            .ok_or_else(|| anyhow!("Tray must be created on the main thread"))?;
        let tray_id = TrayId::next();
        debug!(?tray_id, title = %attr.title, "Creating NSStatusItem");

        let status_item =
            NSStatusBar::systemStatusBar().statusItemWithLength(NSVariableStatusItemLength);
        let Some(button) = status_item.button(mtm) else {
            NSStatusBar::systemStatusBar().removeStatusItem(&status_item);
            return Err(anyhow!("Failed to get status item button"));
        };

        match attr.icon.as_ref().map(icon_to_nsimage) {
            Some(Some(nsimage)) => button.setImage(Some(&nsimage)),
            Some(None) => warn!("Tray icon could not be converted, showing the title instead"),
            None => {}
        }
        if button.image().is_none() {
            button.setTitle(&NSString::from_str(&attr.title));
        }
        button.setToolTip(Some(&NSString::from_str(attr.tooltip_or_title())));

        let target = mtm.alloc().set_ivars(TrayTargetIvars {
            tray_id,
            proxy,
            status_item: status_item.clone(),
        });
        let tray_target: Retained<TrayTarget> =
            unsafe { msg_send![super(target), initWithFrame: button.frame()] };
        tray_target.setWantsLayer(true);
        button.addSubview(&tray_target);

        Ok(Tray {
            tray_id,
            status_item,
            tray_target,
        })
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
        let mtm = MainThreadMarker::new()
            .ok_or_else(|| anyhow!("set_tooltip must be called on the main thread"))?;
        let button = self
            .status_item
            .button(mtm)
            .ok_or_else(|| anyhow!("Failed to get status item button"))?;
        button.setToolTip(Some(&NSString::from_str(tooltip)));
        self.tray_target.update_dimensions();
        Ok(())
    }

    /// The status item's window frame, flipped against the main screen.
    fn geometry(&self) -> Result<TrayGeometry> {
        let mtm = MainThreadMarker::new()
            .ok_or_else(|| anyhow!("geometry must be read on the main thread"))?;
        let button = self
            .status_item
            .button(mtm)
            .ok_or_else(|| anyhow!("Failed to get status item button"))?;
        let window = button
            .window()
            .ok_or_else(|| anyhow!("status item is not on screen"))?;
        let screen = NSScreen::mainScreen(mtm).ok_or_else(|| anyhow!("no main screen"))?;

        Ok(frame_to_geometry(
            window.frame(),
            window.backingScaleFactor(),
            screen.frame().size.height,
        ))
    }
}

impl Drop for Tray {
    fn drop(&mut self) {
        // NSStatusItem must be removed on the main thread
        if MainThreadMarker::new().is_some() {
            debug!(tray_id = ?self.tray_id, "Removing NSStatusItem");
            NSStatusBar::systemStatusBar().removeStatusItem(&self.status_item);
            self.tray_target.removeFromSuperview();
        } else {
            warn!("Tray dropped from non-main thread, status item will leak");
        }
    }
}
