use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};
use whois_rust::{WhoIs, WhoIsLookupOptions};

use super::{AvailabilityOracle, Status};

/// Whois servers used when no server list is configured.
/// `_` holds the server for IP queries, which the client requires.
const DEFAULT_SERVERS: &str = r#"{
    "_": { "ip": { "host": "whois.arin.net", "query": "n + $addr\r\n" } },
    "com": "whois.verisign-grs.com",
    "net": "whois.verisign-grs.com",
    "org": "whois.pir.org",
    "info": "whois.nic.info",
    "io": "whois.nic.io",
    "co": "whois.nic.co",
    "me": "whois.nic.me",
    "ai": "whois.nic.ai",
    "dev": "whois.nic.google",
    "app": "whois.nic.google",
    "xyz": "whois.nic.xyz",
    "uk": "whois.nic.uk",
    "co.uk": "whois.nic.uk",
    "de": "whois.denic.de",
    "": "whois.iana.org"
}"#;

/// Response fragments registries use for names nobody holds
const NOT_FOUND_MARKERS: &[&str] = &[
    "no match for",
    "no match!!",
    "not found",
    "no data found",
    "no entries found",
    "no object found",
    "object does not exist",
    "nothing found",
    "status: free",
    "status: available",
    "is available for registration",
];

/// Fields only present in records of registered names
const REGISTRATION_FIELDS: &[&str] = &[
    "domain name",
    "registrar",
    "creation date",
    "created",
    "registry domain id",
];

/// Availability oracle backed by whois lookups
#[derive(Clone)]
pub struct WhoisOracle {
    client: Arc<WhoIs>,
}

impl WhoisOracle {
    /// Creates an oracle using the built-in server list
    pub fn new() -> Result<Self> {
        Self::from_servers(DEFAULT_SERVERS)
    }

    /// Creates an oracle from a whois server list in JSON form
    pub fn from_servers(servers: &str) -> Result<Self> {
        let client = WhoIs::from_string(servers)
            .map_err(|e| anyhow!("Failed to create WHOIS client: {}", e))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Creates an oracle from a whois server list file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let servers = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read whois server list: {}", path.display()))?;
        Self::from_servers(&servers)
    }
}

#[async_trait]
impl AvailabilityOracle for WhoisOracle {
    async fn lookup(&self, domain: &str) -> Result<Status> {
        debug!("Running whois lookup for {}", domain);
        let options = WhoIsLookupOptions::from_string(domain)
            .map_err(|e| anyhow!("Invalid domain for WHOIS lookup: {}", e))?;

        let client = self.client.clone();
        let raw = tokio::task::spawn_blocking(move || client.lookup(options))
            .await
            .context("WHOIS lookup task panicked")?
            .map_err(|e| anyhow!("WHOIS lookup failed: {}", e))?;

        trace!("WHOIS response for {}: {} bytes", domain, raw.len());
        Ok(classify_response(&raw))
    }
}

/// Extract a field from the whois output by checking for multiple possible keys.
fn extract_field(raw: &str, keys: &[&str]) -> Option<String> {
    for line in raw.lines() {
        let line = line.trim().to_lowercase();
        for key in keys {
            if line.starts_with(&format!("{}:", key)) {
                let value = line.splitn(2, ':').nth(1).map(|s| s.trim().to_string())?;
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Maps a raw whois response to a registration status
pub fn classify_response(raw: &str) -> Status {
    if extract_field(raw, REGISTRATION_FIELDS).is_some() {
        return Status::Registered;
    }

    let lowered = raw.to_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Status::Available;
    }

    Status::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_registered_record() {
        let raw = "   Domain Name: EXAMPLE.COM\n   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\n   Registrar: RESERVED-Internet Assigned Numbers Authority\n";
        assert_eq!(classify_response(raw), Status::Registered);
    }

    #[test]
    fn test_classify_not_found_responses() {
        assert_eq!(
            classify_response("No match for \"AVAILABLE-TEST123.COM\".\n>>> Last update of whois database"),
            Status::Available
        );
        assert_eq!(classify_response("Domain not found.\n"), Status::Available);
        assert_eq!(classify_response("Status: free\n"), Status::Available);
    }

    #[test]
    fn test_classify_unrecognized_response() {
        assert_eq!(classify_response(""), Status::Unknown);
        assert_eq!(
            classify_response("Query rate limit exceeded, try again later"),
            Status::Unknown
        );
    }

    #[test]
    fn test_empty_field_value_is_ignored() {
        assert_eq!(extract_field("Registrar:\n", REGISTRATION_FIELDS), None);
        assert_eq!(
            extract_field("registrar: Example Registrar, Inc.", REGISTRATION_FIELDS),
            Some("example registrar, inc.".to_string())
        );
    }

    #[test]
    fn test_default_server_list_loads() {
        assert!(WhoisOracle::new().is_ok());
    }

    #[tokio::test]
    #[ignore] // Run only when needed, hits real whois servers
    async fn test_lookup_real_domain() {
        let oracle = WhoisOracle::new().expect("whois client should build");
        let status = oracle.lookup("example.com").await.expect("lookup should succeed");
        assert_eq!(status, Status::Registered);
    }
}
