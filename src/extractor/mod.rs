pub mod decoder;
pub mod patterns;
pub mod tld;

use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

pub use decoder::decode_escapes;
pub use tld::TldTable;

use patterns::DOMAIN_REGEX;

/// Elements whose text content is never scanned
const SKIPPED_ELEMENTS: &[&str] = &["style", "noscript", "template"];

/// Elements that start a new line of rendered text. Text inside any other
/// element runs on from its neighbours, so `brand<b>name</b>.com` reads as
/// one token.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "caption", "dd", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "li", "main", "nav", "ol", "option", "p", "pre",
    "script", "section", "select", "table", "tbody", "td", "textarea", "tfoot", "th", "thead",
    "title", "tr", "ul",
];

/// A registrable domain found in page text, split into name and TLD.
///
/// Both parts are lowercase. `tld` may span several labels (`co.uk`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateDomain {
    pub name: String,
    pub tld: String,
}

impl CandidateDomain {
    pub fn new(name: impl Into<String>, tld: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tld: tld.into(),
        }
    }

    /// The root domain, `name.tld`
    pub fn root(&self) -> String {
        format!("{}.{}", self.name, self.tld)
    }
}

impl fmt::Display for CandidateDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.tld)
    }
}

/// Pulls candidate domains out of raw page bodies
#[derive(Debug, Clone)]
pub struct DomainExtractor {
    tlds: Arc<TldTable>,
}

impl DomainExtractor {
    pub fn new(tlds: Arc<TldTable>) -> Self {
        Self { tlds }
    }

    pub fn tlds(&self) -> &TldTable {
        &self.tlds
    }

    /// Extracts the page-local set of candidate domains from an HTML body.
    ///
    /// Markup is discarded, escaped characters are decoded, and every
    /// domain-shaped token is validated against the TLD table. Bodies that
    /// are empty or contain no text yield an empty set.
    pub fn find_domains(&self, body: &[u8]) -> HashSet<CandidateDomain> {
        let text = visible_text(body);
        if text.trim().is_empty() {
            trace!("Page body has no visible text");
            return HashSet::new();
        }
        self.find_in_text(&decode_escapes(&text))
    }

    /// Scans already-extracted text for candidate domains
    pub fn find_in_text(&self, text: &str) -> HashSet<CandidateDomain> {
        let mut domains = HashSet::new();
        for token in DOMAIN_REGEX.find_iter(text) {
            match self.tlds.split(token.as_str()) {
                Some((name, tld)) => {
                    domains.insert(CandidateDomain { name, tld });
                }
                None => trace!("Rejected token: {}", token.as_str()),
            }
        }
        debug!("Found {} candidate domains", domains.len());
        domains
    }
}

enum Step<'a> {
    Enter(ElementRef<'a>),
    Text(&'a str),
    Break,
}

/// Collects the rendered text of an HTML document.
///
/// Text nodes are concatenated as they appear; block-level elements are
/// surrounded by a space so text from separate blocks never fuses.
fn visible_text(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }

    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);

    let mut text = String::new();
    let mut stack = vec![Step::Enter(document.root_element())];
    while let Some(step) = stack.pop() {
        match step {
            Step::Text(chunk) => text.push_str(chunk),
            Step::Break => text.push(' '),
            Step::Enter(element) => {
                let name = element.value().name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    text.push(' ');
                    stack.push(Step::Break);
                }
                for child in element.children().rev() {
                    if let Some(chunk) = child.value().as_text() {
                        stack.push(Step::Text(chunk));
                    } else if let Some(child) = ElementRef::wrap(child) {
                        stack.push(Step::Enter(child));
                    }
                }
            }
        }
    }

    text
}
