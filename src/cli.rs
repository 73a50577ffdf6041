use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Crawl web pages for domain names and report which ones are available
#[derive(Debug, Parser)]
#[command(name = "domain-spider", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the default config and create the working directories
    Init {
        /// Base directory instead of ~/.domain-spider
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Crawl seed URLs and check the domains found
    Start(StartArgs),
    /// Rewrite the config file with fields added by newer versions
    Update {
        /// Config file instead of ~/.domain-spider/config.json
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct StartArgs {
    #[command(subcommand)]
    pub source: SeedSource,

    /// Config file instead of ~/.domain-spider/config.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Result directory or .csv file, overriding result.path
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Only write domains found to be available
    #[arg(long, global = true)]
    pub available_only: bool,
}

/// Where seed URLs come from
#[derive(Debug, Clone, Subcommand)]
pub enum SeedSource {
    /// Read seeds from one column of a CSV file with a header row
    Csv {
        #[arg(long)]
        file: PathBuf,
        /// Header name of the URL column
        #[arg(long)]
        column: String,
    },
    /// Read one seed per line from a file
    File {
        #[arg(long)]
        file: PathBuf,
    },
    /// Read one seed per line from standard input
    Stdin,
}

impl SeedSource {
    /// Reads the raw seed strings. Validation happens later, per seed.
    pub fn read(&self) -> Result<Vec<String>> {
        match self {
            SeedSource::Csv { file, column } => {
                let reader = open(file)?;
                read_csv_column(reader, column)
                    .with_context(|| format!("Failed to read seeds from {}", file.display()))
            }
            SeedSource::File { file } => {
                let reader = BufReader::new(open(file)?);
                read_seed_lines(reader)
                    .with_context(|| format!("Failed to read seeds from {}", file.display()))
            }
            SeedSource::Stdin => {
                read_seed_lines(io::stdin().lock()).context("Failed to read seeds from stdin")
            }
        }
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open seed file: {}", path.display()))
}

/// Collects non-blank lines, skipping `#` comments
pub fn read_seed_lines<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut seeds = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read line")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        seeds.push(line.to_string());
    }
    debug!("Read {} seed lines", seeds.len());
    Ok(seeds)
}

/// Collects the non-empty values of the header column named `column`
pub fn read_csv_column<R: Read>(reader: R, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read CSV headers")?.clone();
    let idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(column))
        .with_context(|| format!("CSV has no '{}' column", column))?;

    let mut seeds = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to parse CSV record")?;
        if let Some(value) = record.get(idx).filter(|v| !v.is_empty()) {
            seeds.push(value.to_string());
        }
    }
    debug!("Read {} seeds from CSV column '{}'", seeds.len(), column);
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_start_with_flags() {
        let cli = Cli::try_parse_from([
            "domain-spider",
            "start",
            "--output",
            "out.csv",
            "csv",
            "--file",
            "seeds.csv",
            "--column",
            "url",
            "--available-only",
        ])
        .unwrap();

        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert!(args.available_only);
        assert_eq!(args.output, Some(PathBuf::from("out.csv")));
        match args.source {
            SeedSource::Csv { file, column } => {
                assert_eq!(file, PathBuf::from("seeds.csv"));
                assert_eq!(column, "url");
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_seed_lines_skip_blanks_and_comments() {
        let input = "https://a.example\n\n# comment\n  https://b.example  \n";
        let seeds = read_seed_lines(input.as_bytes()).unwrap();
        assert_eq!(seeds, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_csv_column() {
        let input = "name,URL\nfirst,https://a.example\nsecond,\nthird, https://c.example \n";
        let seeds = read_csv_column(input.as_bytes(), "url").unwrap();
        assert_eq!(seeds, vec!["https://a.example", "https://c.example"]);

        assert!(read_csv_column("name\nx\n".as_bytes(), "url").is_err());
    }
}
