use anyhow::{anyhow, Result};
use publicsuffix::{List, Psl, Type};
use std::collections::HashSet;
use tracing::debug;

const PUBLIC_SUFFIX_LIST: &str = include_str!("public_suffix_list.dat");
const BUILTIN_TLDS: &str = include_str!("tlds.dat");

/// Maximum length of a fully qualified domain name
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Immutable lookup of public-suffix rules and accepted top-level domains.
///
/// Built once at startup and shared by reference between workers.
pub struct TldTable {
    suffixes: List,
    known: HashSet<String>,
}

impl std::fmt::Debug for TldTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TldTable")
            .field("known", &self.known.len())
            .finish()
    }
}

impl TldTable {
    /// Builds the table from the public suffix list and TLD list embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::new(PUBLIC_SUFFIX_LIST, BUILTIN_TLDS)
    }

    /// Builds a table from public-suffix rules and a list of accepted TLDs
    ///
    /// # Arguments
    /// * `suffix_rules` - Rules in public suffix list format, with ICANN/PRIVATE section markers
    /// * `tlds` - One top-level domain per line; `//` starts a comment
    ///
    /// # Returns
    /// * `Result<Self>` - The table, or an error if the rules do not parse
    pub fn new(suffix_rules: &str, tlds: &str) -> Result<Self> {
        let suffixes: List = suffix_rules
            .parse()
            .map_err(|e| anyhow!("Failed to parse public suffix rules: {:?}", e))?;

        let known: HashSet<String> = tlds
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("//"))
            .map(|line| line.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        debug!("Loaded TLD table with {} accepted TLDs", known.len());
        Ok(Self { suffixes, known })
    }

    /// Returns true if the top-level domain is accepted
    pub fn is_known(&self, tld: &str) -> bool {
        self.known.contains(tld)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Splits a token into its registrable name and public suffix.
    ///
    /// Returns `None` when the token is too long, is itself a public suffix,
    /// sits under a privately operated suffix (`github.io`), has a name
    /// label that starts or ends with `-`, or ends in a TLD absent from the
    /// accepted list.
    pub fn split(&self, token: &str) -> Option<(String, String)> {
        if token.len() > MAX_DOMAIN_LENGTH {
            return None;
        }

        let lowered = token.to_ascii_lowercase();
        let domain = self.suffixes.domain(lowered.as_bytes())?;
        // Unlisted suffixes come back untyped through the implicit `*` rule
        if domain.suffix().typ() != Some(Type::Icann) {
            return None;
        }
        let root = std::str::from_utf8(domain.as_bytes()).ok()?;

        let (name, suffix) = root.split_once('.')?;
        if !is_hostname_label(name) {
            return None;
        }
        let top = suffix.rsplit('.').next()?;
        if !self.is_known(top) {
            return None;
        }

        Some((name.to_string(), suffix.to_string()))
    }
}

fn is_hostname_label(label: &str) -> bool {
    !label.is_empty() && !label.starts_with('-') && !label.ends_with('-')
}
