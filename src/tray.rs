use std::sync::mpsc::{self, Receiver, RecvError, TryRecvError};
use std::sync::Arc;

use remote_tray_core::{TrayEvent, TrayProxy, tray_id::TrayId};
use winit::event_loop::EventLoop;

/// Collects events from every tray backend into one queue read on the UI thread.
///
/// Backends hold a [`TrayProxy`] obtained from [`TrayManager::proxy`]; each call queues the event
/// and wakes the event loop, which then drains the queue with [`TrayManager::try_recv`].
pub struct TrayManager {
    receiver: Receiver<(TrayId, TrayEvent)>,
    callback_proxy: TrayProxy,
}

impl std::fmt::Debug for TrayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrayManager")
            .field("receiver", &"<...>")
            .field("callback_proxy", &"<...>")
            .finish()
    }
}

impl TrayManager {
    pub fn new(event_loop: &EventLoop) -> Self {
        let proxy = event_loop.create_proxy();
        Self::with_waker(move || proxy.wake_up())
    }

    /// Build a manager whose proxy calls `wake` after queueing each event.
    pub fn with_waker(wake: impl Fn() + Send + Sync + 'static) -> Self {
        let (sender, receiver) = mpsc::channel();
        TrayManager {
            callback_proxy: Arc::new(move |id, event| {
                if let Err(e) = sender.send((id, event)) {
                    tracing::error!("Failed to send tray event: {e}");
                }
                wake();
            }),
            receiver,
        }
    }

    pub fn proxy(&self) -> TrayProxy {
        self.callback_proxy.clone()
    }

    pub fn recv(&self) -> Result<(TrayId, TrayEvent), RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<(TrayId, TrayEvent), TryRecvError> {
        self.receiver.try_recv()
    }
}
