use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use csv::{Writer, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::{ResultRow, ResultSink};

const HEADER: [&str; 2] = ["domain", "status"];

/// Writes result rows as `domain,status` CSV records.
///
/// Rows are appended, so several runs on the same day share one file.
pub struct CsvSink {
    path: PathBuf,
    // None once closed
    writer: Mutex<Option<Writer<File>>>,
}

impl CsvSink {
    /// Opens a sink at `output`.
    ///
    /// A path ending in `.csv` is used as the file itself. Anything else is
    /// treated as a directory holding one `YYYY-MM-DD_domains.csv` file per day.
    pub fn open(output: impl AsRef<Path>) -> Result<Self> {
        let path = resolve_output_path(output.as_ref());
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }

        let is_new = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open result file: {}", path.display()))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer
                .write_record(HEADER)
                .context("Failed to write result header")?;
            writer.flush().context("Failed to flush result header")?;
        }

        info!("Writing results to {}", path.display());
        Ok(Self {
            path,
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvSink {
    fn write(&self, row: &ResultRow) -> Result<()> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| anyhow!("Result sink lock poisoned"))?;
        let Some(writer) = guard.as_mut() else {
            bail!("Result sink is closed");
        };

        let domain = row.domain();
        let status = row.status.to_string();
        writer
            .write_record([domain.as_str(), status.as_str()])
            .with_context(|| format!("Failed to write result for {}", domain))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush result for {}", domain))?;

        debug!("Wrote result row for {}", domain);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| anyhow!("Result sink lock poisoned"))?;
        if let Some(writer) = guard.take() {
            let file = writer
                .into_inner()
                .map_err(|e| anyhow!("Failed to flush result file: {}", e))?;
            file.sync_all().context("Failed to sync result file")?;
            info!("Closed result file {}", self.path.display());
        }
        Ok(())
    }
}

fn resolve_output_path(output: &Path) -> PathBuf {
    let is_csv = output
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        output.to_path_buf()
    } else {
        let name = format!("{}_domains.csv", Local::now().format("%Y-%m-%d"));
        output.join(name)
    }
}
