use std::collections::HashSet;

/// Optional TLD allow-list. Built once and shared read-only between workers.
///
/// An empty list permits every TLD.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TldAllowList {
    tlds: HashSet<String>,
}

impl TldAllowList {
    pub fn new<I, S>(tlds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tlds = tlds
            .into_iter()
            .map(|tld| tld.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|tld| !tld.is_empty())
            .collect();
        Self { tlds }
    }

    pub fn permits(&self, tld: &str) -> bool {
        self.tlds.is_empty() || self.tlds.contains(tld)
    }

    pub fn is_empty(&self) -> bool {
        self.tlds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tlds.len()
    }
}
