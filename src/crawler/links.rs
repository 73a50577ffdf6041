use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::CrawlerConfig;

// Links to binary or document assets are never fetched
static SKIPPED_EXTENSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|ico|eps|pdf|iso|mp3|mp4|zip|aif|mpa|wav|wma|7z|deb|pkg|rar|rpm|bin|dmg|dat|tar|gz|exe|ps|psd|svg|tiff?|pps|pptx?|xlsx?|wmv|docx?|txt|mov|mpl|css|js|woff2?)$").unwrap()
});

/// Collects the crawlable links of `body`, resolved against `base`.
///
/// Only links sharing `base`'s origin survive. Fragments are stripped so
/// `/a#x` and `/a#y` count as one page.
pub fn extract_links(base: &Url, body: &[u8], config: &CrawlerConfig) -> Vec<Url> {
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return vec![],
    };
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);
    let origin = base.origin();

    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| is_followable_href(href))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .filter(|url| url.origin() == origin && should_follow(url, config))
        .collect()
}

/// Rejects empty hrefs and non-navigational schemes before URL resolution
pub fn is_followable_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }
    let lower = href.to_ascii_lowercase();
    !(lower.starts_with("tel:") || lower.starts_with("mailto:") || lower.starts_with("javascript:"))
}

/// Whether a resolved link passes the scheme, length and asset filters
pub fn should_follow(url: &Url, config: &CrawlerConfig) -> bool {
    config.allowed_schemes.iter().any(|s| s == url.scheme())
        && url.as_str().len() <= config.max_url_length
        && !SKIPPED_EXTENSION_REGEX.is_match(url.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.example.com/catalog/").unwrap()
    }

    #[test]
    fn test_same_origin_links_resolved() {
        let body = br#"<html><body>
            <a href="/about">About</a>
            <a href="page2.html#top">Next</a>
            <a href="https://shop.example.com/contact">Contact</a>
            <a href="https://other.example.org/">Elsewhere</a>
            <a href="http://shop.example.com/insecure">Scheme change</a>
        </body></html>"#;
        let links: Vec<String> = extract_links(&base(), body, &CrawlerConfig::default())
            .into_iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(
            links,
            vec![
                "https://shop.example.com/about",
                "https://shop.example.com/catalog/page2.html",
                "https://shop.example.com/contact",
            ]
        );
    }

    #[test]
    fn test_non_navigational_links_skipped() {
        let body = br##"<a href="mailto:a@b.com">m</a><a href="tel:123">t</a>
            <a href="javascript:void(0)">j</a><a href="#section">f</a><a href="">e</a>
            <a href="/files/report.PDF">pdf</a><a href="/logo.png">img</a>"##;
        assert!(extract_links(&base(), body, &CrawlerConfig::default()).is_empty());
    }

    #[test]
    fn test_href_filter() {
        assert!(is_followable_href("/path"));
        assert!(!is_followable_href("  MAILTO:x@y.z"));
        assert!(!is_followable_href("#"));
    }
}
