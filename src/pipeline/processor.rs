use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use super::{CheckPolicy, PipelineOptions, Stats, TldAllowList};
use crate::checker::{AvailabilityChecker, Status};
use crate::crawler::Page;
use crate::extractor::{CandidateDomain, DomainExtractor};
use crate::sink::{ResultRow, ResultSink};
use crate::store::CheckedStore;

/// Everything a worker needs to process a page, shared by all workers
pub struct WorkerContext {
    pub extractor: DomainExtractor,
    pub store: Arc<dyn CheckedStore>,
    pub checker: AvailabilityChecker,
    pub sink: Arc<dyn ResultSink>,
    pub allow_list: Arc<TldAllowList>,
    pub stats: Arc<Stats>,
    pub options: PipelineOptions,
    pub cancel: CancellationToken,
}

/// Runs one page through extraction, filtering, dedup, checking and persistence.
///
/// Every failure below this level is logged and dropped, so a bad page or
/// domain never stops the worker.
///
/// # Arguments
/// * `ctx` - Shared worker context
/// * `page` - The fetched page; consumed
#[instrument(skip_all, fields(url = %page.url))]
pub async fn process_page(ctx: &WorkerContext, page: Page) {
    ctx.stats.record_url();

    if !page.is_success() {
        debug!("Skipping page with status {}", page.status);
        return;
    }

    let candidates = ctx.extractor.find_domains(&page.body);
    trace!("Found {} candidate domains", candidates.len());
    let source = page.url.to_string();

    for candidate in candidates {
        ctx.stats.record_domain();

        if !ctx.allow_list.permits(&candidate.tld) {
            trace!("TLD {} not allowed, dropping {}", candidate.tld, candidate);
            continue;
        }

        // Nothing is marked once shutdown starts
        if ctx.cancel.is_cancelled() {
            debug!("Shutdown in progress, leaving remaining candidates");
            return;
        }

        let root = candidate.root();
        match ctx.store.has_checked(&root) {
            Ok(true) => {
                trace!("{} already checked", root);
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Dedup store rejected {}, skipping: {:#}", root, e);
                continue;
            }
        }
        ctx.stats.record_unique();

        check_and_record(ctx, &source, candidate, root).await;
    }
}

async fn check_and_record(ctx: &WorkerContext, source: &str, candidate: CandidateDomain, root: String) {
    let status = match ctx.checker.check(&root).await {
        Ok(status) => status,
        Err(e) => {
            ctx.stats.record_failure();
            warn!("Dropping {}: {:#}", root, e);
            if ctx.options.check_policy == CheckPolicy::ReleaseOnFailure {
                if let Err(e) = ctx.store.release(&root) {
                    warn!("Failed to release {} after failed check: {:#}", root, e);
                }
            }
            return;
        }
    };
    ctx.stats.record_check(status);

    info!("{} {}", root, status);
    if ctx.options.echo {
        println!("{:<40} {}", root, status);
    }

    if ctx.options.available_only && status != Status::Available {
        return;
    }

    let row = ResultRow {
        url: source.to_string(),
        name: candidate.name,
        tld: candidate.tld,
        status,
    };
    if let Err(e) = ctx.sink.write(&row) {
        error!("Failed to write result for {}: {:#}", root, e);
    }
}
