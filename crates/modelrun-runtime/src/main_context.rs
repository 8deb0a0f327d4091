use std::panic::AssertUnwindSafe;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub const MAIN_THREAD_NAME: &str = "modelrun-main";

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Single-consumer queue of completions, drained in order on one dedicated
/// thread. The thread exits when the last handle is dropped.
#[derive(Clone)]
pub struct MainContext {
    tx: mpsc::UnboundedSender<Callback>,
}

impl MainContext {
    pub fn spawn() -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Callback>();
        std::thread::Builder::new()
            .name(MAIN_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("main context started");
                while let Some(callback) = rx.blocking_recv() {
                    if std::panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                        error!("completion callback panicked");
                    }
                }
                debug!("main context stopped");
            })?;
        Ok(Self { tx })
    }

    pub fn deliver(&self, callback: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(callback)).is_err() {
            warn!("main context is gone, dropping completion");
        }
    }

    /// True when called from a main-context thread.
    pub fn is_current() -> bool {
        std::thread::current().name() == Some(MAIN_THREAD_NAME)
    }
}
