use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::{CheckedDomain, CheckedStore, Clock, SystemClock, MIN_TTL};

const JOURNAL_FILE: &str = "checked.jsonl";
const COMPACT_FILE: &str = "checked.jsonl.tmp";

/// Journal length below which the store never compacts mid-run
pub const DEFAULT_COMPACT_THRESHOLD: usize = 10_000;

/// One line of the on-disk journal
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalEntry {
    Mark(CheckedDomain),
    Release { domain: String },
}

struct StoreState {
    entries: HashMap<String, CheckedDomain>,
    // None once the store is closed
    journal: Option<BufWriter<File>>,
    journal_lines: usize,
}

/// Dedup store backed by an append-only JSON-lines journal.
///
/// All entries live in memory behind one lock, which makes check-and-mark
/// atomic per key. Every mark is appended and flushed before `has_checked`
/// returns, so checks from earlier runs are honored after a restart. Expiry
/// is lazy: stale entries are replaced on the next lookup and dropped when
/// the journal is replayed or compacted. The journal is compacted on close,
/// and mid-run once it passes the compaction threshold with more than half
/// of its lines stale.
pub struct DiskStore {
    dir: PathBuf,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    compact_threshold: usize,
    state: Mutex<StoreState>,
}

impl DiskStore {
    /// Opens (or creates) the store in `dir` using the system clock
    pub fn open(dir: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        Self::open_with_clock(dir, ttl, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        dir: impl AsRef<Path>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;

        let ttl = if ttl < MIN_TTL {
            warn!(
                "Store TTL {:?} is below the {:?} minimum, using the minimum",
                ttl, MIN_TTL
            );
            MIN_TTL
        } else {
            ttl
        };
        let ttl = chrono::Duration::from_std(ttl).context("Store TTL is out of range")?;

        let journal_path = dir.join(JOURNAL_FILE);
        let (entries, journal_lines) = replay_journal(&journal_path, clock.now())?;
        let journal = open_journal(&journal_path)?;

        info!(
            "Opened dedup store at {} with {} live entries",
            dir.display(),
            entries.len()
        );

        Ok(Self {
            dir,
            ttl,
            clock,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            state: Mutex::new(StoreState {
                entries,
                journal: Some(journal),
                journal_lines,
            }),
        })
    }

    /// Sets the journal length at which mid-run compaction is considered
    pub fn with_compact_threshold(mut self, lines: usize) -> Self {
        self.compact_threshold = lines.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Dedup store lock poisoned"))
    }

    /// Rewrites the journal with live entries once it has grown past the
    /// threshold and stale lines outnumber live ones
    fn maybe_compact(&self, state: &mut StoreState) -> Result<()> {
        if state.journal_lines < self.compact_threshold
            || state.journal_lines <= state.entries.len() * 2
        {
            return Ok(());
        }
        let Some(mut journal) = state.journal.take() else {
            return Ok(());
        };
        journal.flush().context("Failed to flush store journal")?;
        drop(journal);

        let now = self.clock.now();
        state.entries.retain(|_, entry| entry.is_live(now));
        let before = state.journal_lines;
        let compacted = compact(&self.dir, state.entries.values());
        // Reopened whether or not the rewrite succeeded
        state.journal = Some(open_journal(&self.dir.join(JOURNAL_FILE))?);
        compacted?;
        state.journal_lines = state.entries.len();

        debug!(
            "Compacted store journal from {} to {} lines",
            before, state.journal_lines
        );
        Ok(())
    }
}

impl CheckedStore for DiskStore {
    fn has_checked(&self, domain: &str) -> Result<bool> {
        let mut state = self.lock()?;
        let StoreState {
            entries,
            journal,
            journal_lines,
        } = &mut *state;
        let Some(journal) = journal.as_mut() else {
            bail!("Dedup store is closed");
        };

        let now = self.clock.now();
        if let Some(entry) = entries.get(domain) {
            if entry.is_live(now) {
                trace!("{} already checked at {}", domain, entry.checked_at);
                return Ok(true);
            }
            debug!("Mark for {} expired at {}", domain, entry.expires_at);
        }

        let entry = CheckedDomain {
            domain: domain.to_string(),
            checked_at: now,
            expires_at: now + self.ttl,
        };
        // Kept in memory even when the journal write below fails
        entries.insert(domain.to_string(), entry.clone());
        append(journal, &JournalEntry::Mark(entry))
            .with_context(|| format!("Failed to persist check mark for {}", domain))?;
        *journal_lines += 1;

        if let Err(e) = self.maybe_compact(&mut state) {
            warn!("Store journal compaction failed: {:#}", e);
        }
        Ok(false)
    }

    fn release(&self, domain: &str) -> Result<()> {
        let mut state = self.lock()?;
        let StoreState {
            entries,
            journal,
            journal_lines,
        } = &mut *state;
        let Some(journal) = journal.as_mut() else {
            bail!("Dedup store is closed");
        };

        if entries.remove(domain).is_some() {
            debug!("Released check mark for {}", domain);
            append(
                journal,
                &JournalEntry::Release {
                    domain: domain.to_string(),
                },
            )
            .with_context(|| format!("Failed to persist release of {}", domain))?;
            *journal_lines += 1;

            if let Err(e) = self.maybe_compact(&mut state) {
                warn!("Store journal compaction failed: {:#}", e);
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        let now = self.clock.now();
        self.lock()
            .map(|state| state.entries.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    fn close(&self) -> Result<()> {
        let mut state = self.lock()?;
        let Some(mut journal) = state.journal.take() else {
            debug!("Dedup store already closed");
            return Ok(());
        };
        journal.flush().context("Failed to flush store journal")?;
        drop(journal);

        let now = self.clock.now();
        state.entries.retain(|_, entry| entry.is_live(now));
        compact(&self.dir, state.entries.values())?;

        info!(
            "Closed dedup store at {} with {} live entries",
            self.dir.display(),
            state.entries.len()
        );
        Ok(())
    }
}

fn open_journal(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open store journal: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn append(journal: &mut BufWriter<File>, entry: &JournalEntry) -> Result<()> {
    let line = serde_json::to_string(entry).context("Failed to serialize journal entry")?;
    journal.write_all(line.as_bytes())?;
    journal.write_all(b"\n")?;
    journal.flush()?;
    Ok(())
}

/// Rebuilds the live entry map from the journal, skipping corrupt lines.
/// Also returns the number of non-empty lines read.
fn replay_journal(
    path: &Path,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<(HashMap<String, CheckedDomain>, usize)> {
    let mut entries = HashMap::new();
    if !path.exists() {
        return Ok((entries, 0));
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open store journal: {}", path.display()))?;
    let mut corrupt = 0usize;
    let mut lines = 0usize;

    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Stopped reading store journal at line {}: {}", line_num + 1, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(JournalEntry::Mark(entry)) => {
                entries.insert(entry.domain.clone(), entry);
            }
            Ok(JournalEntry::Release { domain }) => {
                entries.remove(&domain);
            }
            Err(e) => {
                corrupt += 1;
                debug!("Skipping corrupt journal line {}: {}", line_num + 1, e);
            }
        }
    }

    if corrupt > 0 {
        warn!("Skipped {} corrupt lines in {}", corrupt, path.display());
    }

    entries.retain(|_, entry: &mut CheckedDomain| entry.is_live(now));
    Ok((entries, lines))
}

/// Rewrites the journal with only the given entries (write temp, then rename)
fn compact<'a>(dir: &Path, entries: impl Iterator<Item = &'a CheckedDomain>) -> Result<()> {
    let temp_path = dir.join(COMPACT_FILE);
    let journal_path = dir.join(JOURNAL_FILE);

    let file = File::create(&temp_path)
        .with_context(|| format!("Failed to create {}", temp_path.display()))?;
    let mut writer = BufWriter::new(file);
    for entry in entries {
        append(&mut writer, &JournalEntry::Mark(entry.clone()))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush compacted journal: {}", e))?;
    file.sync_all().context("Failed to sync compacted journal")?;

    fs::rename(&temp_path, &journal_path)
        .with_context(|| format!("Failed to replace {}", journal_path.display()))?;
    Ok(())
}
