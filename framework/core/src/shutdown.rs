use std::sync::Arc;

use tokio::sync::broadcast::{error::RecvError, error::TryRecvError, Receiver, Sender};
use tokio::sync::Mutex;

/// Broadcasts a request to stop the run, for example after Ctrl-C.
///
/// The supervisor treats a shutdown like a deadline that has been reached early, so the current
/// scenario's process group is still terminated before the run stops.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.sender.send(()) {
            // Will fail if nobody is listening for a shutdown signal, in which case the log message
            // can be ignored.
            log::warn!("Failed to send shutdown signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
    triggered: bool,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            triggered: false,
        }
    }

    /// Point in time check if the shutdown signal has been received.
    ///
    /// Once this has returned true it keeps returning true.
    pub fn should_shutdown(&mut self) -> bool {
        if self.triggered {
            return true;
        }

        let triggered = match self.receiver.try_lock() {
            Ok(mut guard) => match guard.try_recv() {
                Ok(_) => true,
                Err(TryRecvError::Closed) => true,
                // If the receiver is empty or lagged then we should not shutdown.
                Err(_) => false,
            },
            Err(_) => false,
        };
        self.triggered = triggered;

        triggered
    }

    /// Wait for the shutdown signal to be received.
    ///
    /// It is safe to race this with another future so that the shutdown signal can be used to
    /// cancel other work in progress. If every [ShutdownHandle] has been dropped then no signal
    /// can arrive and this waits forever.
    pub async fn wait_for_shutdown(&mut self) {
        if self.triggered {
            return;
        }

        let receiver = self.receiver.clone();
        let mut guard = receiver.lock().await;
        match guard.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
        drop(guard);
        self.triggered = true;
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}
