use once_cell::sync::Lazy;
use regex::Regex;

/// Two or more dot-joined alphanumeric labels (single inner hyphens allowed)
/// ending in a 2-4 letter alphabetic label.
pub static DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(([[:alnum:]]-?)?([[:alnum:]]-?)+\.)+[[:alpha:]]{2,4}\b")
        .unwrap()
});

/// `\uXXXX` escapes left in JSON blobs and inline scripts.
pub static UNICODE_ESCAPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\u([0-9a-fA-F]{4})").unwrap()
});

/// `%XX` percent-encoded bytes.
pub static PERCENT_ESCAPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%([0-9a-fA-F]{2})").unwrap()
});
