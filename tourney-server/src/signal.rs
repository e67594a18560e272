use tokio::sync::watch;

/// Waits until the process receives SIGINT or SIGTERM.
pub async fn wait() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                log::warn!("Failed to install SIGTERM handler: {}", err);
                ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c() => (),
            _ = terminate.recv() => (),
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for SIGINT: {}", err);
        // Keep serving without a SIGINT handler.
        futures::future::pending::<()>().await;
    }
}

/// Broadcasts the shutdown of the server to all running tasks.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Notifies all [`ShutdownListener`]s.
    pub fn terminate(&self) {
        self.tx.send_replace(true);
    }

    pub fn listen(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    #[inline]
    pub fn is_active(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the shutdown was requested.
    pub async fn wait(&mut self) {
        while !self.is_active() {
            // The sender lives in the shared state and outlives every listener.
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
