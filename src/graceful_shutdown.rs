use tokio::sync::broadcast;
use tracing::info;

/// Broadcasts a single shutdown signal to every subscribed component (the
/// UDP server, the Control API, the Classifier). Each component decides for
/// itself how to wind down on receipt.
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<()>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn trigger(&self) {
        info!("initiating graceful shutdown");
        let _ = self.shutdown_tx.send(());
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
