//! Process lifecycle: program identity and OS signal handling.

use std::io;
use std::thread::JoinHandle;

use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Scoped program identity. Logs entry on creation and exit on drop.
#[derive(Debug)]
pub struct ProgramContext {
    id: String,
    title: String,
}

impl ProgramContext {
    pub fn enter(id: impl Into<String>, title: impl Into<String>) -> Self {
        let context = Self {
            id: id.into(),
            title: title.into(),
        };
        info!(id = %context.id, title = %context.title, "starting");
        context
    }
}

impl Drop for ProgramContext {
    fn drop(&mut self) {
        info!(id = %self.id, title = %self.title, "exiting");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT or Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

#[cfg(unix)]
struct Terminate(tokio::signal::unix::Signal);

#[cfg(unix)]
impl Terminate {
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        signal(SignalKind::terminate()).map(Self)
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct Terminate;

#[cfg(not(unix))]
impl Terminate {
    fn install() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}

/// Keeps the signal listener alive. Dropping it stops the listener thread.
#[derive(Debug)]
pub struct SignalGuard {
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

/// Call `handler` from a background thread for every SIGINT/SIGTERM (Ctrl-C elsewhere) received
/// while the returned guard is alive.
pub fn register_signal_handlers(
    handler: impl Fn(Signal) + Send + 'static,
) -> io::Result<SignalGuard> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let terminate = {
        let _enter = runtime.enter();
        Terminate::install()?
    };
    let (shutdown, shutdown_rx) = oneshot::channel();

    let thread = std::thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || runtime.block_on(listen(handler, terminate, shutdown_rx)))?;
    debug!("signal handlers installed");

    Ok(SignalGuard {
        shutdown: Some(shutdown),
        thread: Some(thread),
    })
}

async fn listen(
    handler: impl Fn(Signal),
    mut terminate: Terminate,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let signal = tokio::select! {
            _ = &mut shutdown => break,
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => Signal::Interrupt,
                Err(err) => {
                    error!("failed to listen for interrupt: {err}");
                    break;
                }
            },
            _ = terminate.recv() => Signal::Terminate,
        };
        info!(?signal, "signal received");
        handler(signal);
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("signal handler thread panicked");
            }
        }
        debug!("signal handlers removed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn guard_stops_listener_without_calling_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let guard = register_signal_handlers({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();
        drop(guard);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
