use std::future::Future;
use std::io;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit status used when a second interrupt forces termination
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawns the Ctrl-C handler for a run.
///
/// The first interrupt cancels `token`, which starts a graceful shutdown.
/// A second interrupt exits the process immediately with [`FORCED_EXIT_CODE`].
pub fn spawn_interrupt_handler(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(watch_interrupts(token, signal::ctrl_c, || {
        std::process::exit(FORCED_EXIT_CODE);
    }))
}

/// Drives the two-stage interrupt sequence over an arbitrary signal source.
///
/// # Arguments
/// * `token` - Cancelled on the first signal
/// * `next_signal` - Resolves when the next interrupt arrives
/// * `force` - Called on the second signal
pub async fn watch_interrupts<S, Fut, F>(token: CancellationToken, mut next_signal: S, force: F)
where
    S: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
    F: FnOnce(),
{
    if let Err(e) = next_signal().await {
        error!("Failed to listen for interrupt: {}", e);
        return;
    }
    warn!("Interrupt received, shutting down (interrupt again to force exit)");
    eprintln!("Shutting down gracefully, press Ctrl-C again to force exit");
    token.cancel();

    match next_signal().await {
        Ok(()) => {
            error!("Second interrupt received, exiting immediately");
            force();
        }
        Err(e) => info!("Stopped listening for interrupts: {}", e),
    }
}
