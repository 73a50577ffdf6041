//! Bulk domain discovery.
//!
//! Crawls seed sites, pulls domain names out of page text, drops the ones
//! checked recently and asks an availability oracle about the rest.

pub mod checker;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod extractor;
pub mod pipeline;
pub mod shutdown;
pub mod sink;
pub mod store;
pub mod utils;

pub use checker::{AvailabilityChecker, AvailabilityOracle, Status};
pub use crawler::{CrawlEngine, Page};
pub use extractor::{CandidateDomain, DomainExtractor, TldTable};
pub use pipeline::{CheckPolicy, Pipeline, PipelineOptions, PipelineState, StatsSnapshot};
pub use sink::{ResultRow, ResultSink};
pub use store::{CheckedStore, DiskStore};
