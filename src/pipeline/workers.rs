use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::processor::{process_page, WorkerContext};
use crate::crawler::Page;

/// Starts the worker pool draining the page queue
///
/// All workers share one receiver. A worker exits when the queue closes
/// or the cancellation token fires; a page already taken is finished first.
///
/// # Arguments
/// * `page_rx` - Receiving half of the bounded page queue
/// * `ctx` - Shared worker context
/// * `count` - Number of workers to spawn
///
/// # Returns
/// * `Vec<JoinHandle<()>>` - One handle per worker, joined at drain
pub fn start_workers(
    page_rx: mpsc::Receiver<Page>,
    ctx: Arc<WorkerContext>,
    count: usize,
) -> Vec<JoinHandle<()>> {
    // Wrap the receiver in a mutex so multiple workers can access it
    let page_rx = Arc::new(Mutex::new(page_rx));

    info!("Spawning {} workers", count);
    (0..count)
        .map(|worker_id| {
            let page_rx = page_rx.clone();
            let ctx = ctx.clone();

            tokio::spawn(async move {
                debug!("Worker {} started", worker_id);
                loop {
                    trace!("Worker {} waiting for page", worker_id);
                    let page_opt = tokio::select! {
                        biased;
                        _ = ctx.cancel.cancelled() => {
                            info!("Worker {} shutting down - interrupted", worker_id);
                            break;
                        }
                        page = async { page_rx.lock().await.recv().await } => page,
                    };

                    match page_opt {
                        Some(page) => {
                            debug!("Worker {} processing {}", worker_id, page.url);
                            process_page(&ctx, page).await;
                        }
                        None => {
                            info!("Worker {} shutting down - queue closed", worker_id);
                            break;
                        }
                    }
                }
            })
        })
        .collect()
}
