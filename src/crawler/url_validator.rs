use anyhow::{bail, Context, Result};
use tracing::error;
use url::Url;

// Constants for validation
const MAX_URL_LENGTH: usize = 2048; // Maximum allowable URL length

/// Validates a seed URL and parses it.
///
/// # Arguments
/// * `url` - Raw seed as read from the seed source
///
/// # Returns
/// * `Result<Url>` - The parsed URL, or why the seed was rejected
pub fn validate_seed(url: &str) -> Result<Url> {
    let url = url.trim();
    if url.is_empty() {
        error!("Received empty URL");
        bail!("URL cannot be empty");
    }

    if url.len() > MAX_URL_LENGTH {
        error!("URL exceeds maximum length: {} > {}", url.len(), MAX_URL_LENGTH);
        bail!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH);
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        error!("URL lacks proper protocol: {}", url);
        bail!("URL must start with http:// or https://");
    }

    let parsed = Url::parse(url).with_context(|| format!("Failed to parse URL: {}", url))?;
    if parsed.host_str().is_none() {
        bail!("URL has no host: {}", url);
    }
    Ok(parsed)
}

/// Validates every seed, logging and dropping the ones that fail.
pub fn validate_seeds<I, S>(seeds: I) -> Vec<Url>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    seeds
        .into_iter()
        .filter_map(|seed| match validate_seed(seed.as_ref()) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Skipping seed '{}': {}", seed.as_ref(), e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_seed() {
        let url = validate_seed(" https://example.com/start ").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_rejected_seeds() {
        assert!(validate_seed("").is_err());
        assert!(validate_seed("ftp://example.com").is_err());
        assert!(validate_seed("example.com").is_err());
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(validate_seed(&long).is_err());
    }

    #[test]
    fn test_validate_seeds_drops_invalid() {
        let seeds = validate_seeds(["https://a.example", "nope", "http://b.example/x"]);
        assert_eq!(seeds.len(), 2);
    }
}
