use std::time::Duration;

use stress_tunnel_core::prelude::ShutdownHandle;
use tokio::runtime::Runtime;
use tokio::signal;

/// How long the runtime is driven to let the Ctrl-C task catch up.
const SETTLE_TIME: Duration = Duration::from_millis(10);

/// Turn Ctrl-C into a shutdown signal for the run.
///
/// The listener task only makes progress while `runtime` is being driven, which for the runner
/// is while a scenario is supervised. Call [settle] between scenarios so a signal that arrived
/// in the meantime is seen before the next scenario starts.
pub(crate) fn start_shutdown_listener(runtime: &Runtime) -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        listener_handle.shutdown();
        println!("Received shutdown signal, stopping the current scenario...");
    });

    // Installs the signal handler before any scenario is started
    settle(runtime);

    handle
}

/// Drive the runtime briefly so pending signal notifications are delivered.
///
/// The timer is created inside `block_on`, it needs the runtime's time driver.
pub(crate) fn settle(runtime: &Runtime) {
    runtime.block_on(async { tokio::time::sleep(SETTLE_TIME).await });
}
