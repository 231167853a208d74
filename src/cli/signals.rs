//! Interrupt handling for interactive recording

use tokio::sync::mpsc;
use tracing::debug;

/// Delivers one message per SIGINT (Ctrl+C) or SIGTERM.
///
/// The recorder treats both as "discard the current attempt".
pub struct InterruptSignal {
    receiver: mpsc::Receiver<()>,
}

impl InterruptSignal {
    /// Start listening for interrupts
    pub fn new() -> Result<Self, std::io::Error> {
        let (tx, rx) = mpsc::channel(4);

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let tx_term = tx.clone();
            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::spawn(async move {
                sigterm.recv().await;
                debug!("Received SIGTERM");
                let _ = tx_term.send(()).await;
            });
        }

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                debug!("Received SIGINT");
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { receiver: rx })
    }

    /// Wait for the next interrupt
    pub async fn recv(&mut self) -> Option<()> {
        self.receiver.recv().await
    }
}
