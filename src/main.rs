use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use domain_spider::checker::whois::WhoisOracle;
use domain_spider::checker::AvailabilityChecker;
use domain_spider::cli::{Cli, Command, StartArgs};
use domain_spider::config::{self, AppConfig};
use domain_spider::crawler::url_validator::validate_seeds;
use domain_spider::crawler::HttpCrawler;
use domain_spider::extractor::{DomainExtractor, TldTable};
use domain_spider::pipeline::{Pipeline, PipelineOptions, TldAllowList};
use domain_spider::shutdown::spawn_interrupt_handler;
use domain_spider::sink::CsvSink;
use domain_spider::store::DiskStore;
use domain_spider::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init { dir } => {
            let base = match dir {
                Some(dir) => dir,
                None => config::default_base_dir()?,
            };
            let path = config::init(&base)?;
            println!("Configuration written to {}", path.display());
        }
        Command::Update { config: path } => {
            let path = match path {
                Some(path) => path,
                None => config::default_config_path()?,
            };
            config::update(&path)?;
            println!("Configuration updated at {}", path.display());
        }
        Command::Start(args) => start(args).await?,
    }

    Ok(())
}

async fn start(args: StartArgs) -> Result<()> {
    let settings = AppConfig::load(args.config.as_deref())?.resolve()?;
    let log_file = init_logger(&settings.log_path, settings.log_max_age)?;
    eprintln!("Logging to {}", log_file.display());

    let seeds = validate_seeds(args.source.read()?);
    if seeds.is_empty() {
        bail!("No valid seed URLs");
    }
    info!("Loaded {} seed URLs", seeds.len());

    let tlds = Arc::new(TldTable::builtin().context("Failed to load TLD table")?);
    let store = DiskStore::open(&settings.store_path, settings.store_ttl)
        .context("Failed to open dedup store")?;
    let oracle = WhoisOracle::new().context("Failed to set up whois client")?;
    let checker = AvailabilityChecker::new(Arc::new(oracle)).with_timeout(settings.timeout);
    let output = args.output.as_ref().unwrap_or(&settings.result_path);
    let sink = CsvSink::open(output).context("Failed to open result output")?;

    let cancel = CancellationToken::new();
    let engine = HttpCrawler::new(settings.crawler.clone())
        .context("Failed to set up crawler")?
        .with_cancellation(cancel.child_token());

    let pipeline = Pipeline::new(
        Arc::new(engine),
        DomainExtractor::new(tlds),
        Arc::new(store),
        checker,
        Arc::new(sink),
    )
    .with_allow_list(TldAllowList::new(&settings.allowed_tlds))
    .with_options(PipelineOptions {
        workers: settings.workers,
        check_policy: settings.check_policy,
        available_only: args.available_only,
        echo: true,
    })
    .with_cancellation(cancel.clone());

    let interrupts = spawn_interrupt_handler(cancel);
    let result = pipeline.run(seeds).await;
    interrupts.abort();

    match result {
        Ok(summary) => {
            info!("Run finished: {}", summary);
            println!("{}", summary);
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            Err(e)
        }
    }
}
