#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resolves a gazette issue date to the published PDF's address.
//!
//! The TCM-PA gazette is served through the IOEPA search portal: a GET
//! against the portal with the date in the `dts` query parameter returns
//! an HTML page whose `div#mid` container links to the issue's PDF.
//! Resolution is a pure lookup — no caching, no retries. Transport
//! failures and "no publication on this date" are distinct outcomes so
//! callers can retry the former and skip the latter.

use std::time::Duration;

use gazette_models::IssueDate;
use reqwest::Url;
use scraper::{Html, Selector};

/// Default index page for gazette lookups. The date is appended as
/// `d/m/yyyy`.
pub const DEFAULT_BASE_URL: &str = "https://tcm.ioepa.com.br/busca/default.aspx?dts=";

/// Timeout for index page lookups. Downloads use a longer one.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from issue resolution.
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    /// The index page could not be reached or returned an HTTP error.
    /// Transient — the caller's orchestration layer decides on retry.
    #[error("upstream index unavailable: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The index page exists but carries no document link for the date.
    /// Expected for holidays and weekends; never retried.
    #[error("no gazette issue published for {date}")]
    IssueNotFound {
        /// The date that had no publication.
        date: String,
    },

    /// The response could not be interpreted (bad URL, malformed HTML
    /// structure).
    #[error("parse error: {0}")]
    Parse(String),
}

/// Resolves issue dates to PDF addresses against a configurable index
/// page.
#[derive(Debug, Clone)]
pub struct GazetteLocator {
    base_url: String,
    timeout: Duration,
}

impl Default for GazetteLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GazetteLocator {
    /// Creates a locator against the default IOEPA index page.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: LOOKUP_TIMEOUT,
        }
    }

    /// Overrides the index page base URL (the date query string is
    /// appended verbatim).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.base_url);
        self
    }

    /// Overrides the lookup timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves the PDF address for the given date.
    ///
    /// Idempotent: re-running for the same date yields the same address
    /// barring upstream changes.
    ///
    /// # Errors
    ///
    /// * [`LocatorError::Upstream`] — transport/HTTP failure.
    /// * [`LocatorError::IssueNotFound`] — the page has no content
    ///   container or no usable link (no publication for the date).
    /// * [`LocatorError::Parse`] — the page URL or a link could not be
    ///   interpreted.
    pub async fn resolve(&self, date: IssueDate) -> Result<String, LocatorError> {
        let endpoint = format!("{}{}", self.base_url, date.query_string());
        log::info!("Looking up gazette issue at {endpoint}");

        let page_url = Url::parse(&endpoint)
            .map_err(|e| LocatorError::Parse(format!("invalid index URL '{endpoint}': {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response = client.get(page_url.clone()).send().await?.error_for_status()?;
        let body = response.text().await?;

        let address = find_pdf_link(&body, &page_url, date)?;
        log::info!("Resolved PDF address: {address}");
        Ok(address)
    }
}

/// Locates the issue's PDF link inside the index page HTML.
///
/// Pure function of the page body: the first anchor inside `div#mid` is
/// taken, resolved against the page URL. If its address does not end in
/// `.pdf`, sibling anchors are searched for one that does; failing
/// that, the first address is returned as a best-effort result with a
/// warning.
///
/// # Errors
///
/// Returns [`LocatorError::IssueNotFound`] when the container or a
/// usable link is absent, [`LocatorError::Parse`] when a link cannot be
/// resolved to an absolute URL.
pub fn find_pdf_link(html: &str, page_url: &Url, date: IssueDate) -> Result<String, LocatorError> {
    let document = Html::parse_document(html);

    let mid_sel = parse_selector("div#mid")?;
    let anchor_sel = parse_selector("a")?;

    let Some(mid) = document.select(&mid_sel).next() else {
        log::warn!("Content container 'div#mid' not found for {date}");
        return Err(LocatorError::IssueNotFound {
            date: date.to_string(),
        });
    };

    let Some(href) = mid
        .select(&anchor_sel)
        .find_map(|a| a.value().attr("href"))
    else {
        log::warn!("No link found inside 'div#mid' for {date}");
        return Err(LocatorError::IssueNotFound {
            date: date.to_string(),
        });
    };

    let address = resolve_href(page_url, href)?;

    if address.to_lowercase().ends_with(".pdf") {
        return Ok(address);
    }

    // The first link is not a PDF; look for a sibling that is.
    for anchor in mid.select(&anchor_sel) {
        if let Some(candidate) = anchor.value().attr("href") {
            if candidate.to_lowercase().ends_with(".pdf") {
                return resolve_href(page_url, candidate);
            }
        }
    }

    log::warn!("Resolved address does not look like a PDF: {address}");
    Ok(address)
}

/// Resolves a possibly-relative href against the index page URL.
fn resolve_href(page_url: &Url, href: &str) -> Result<String, LocatorError> {
    page_url
        .join(href)
        .map(String::from)
        .map_err(|e| LocatorError::Parse(format!("cannot resolve link '{href}': {e}")))
}

/// Parses a CSS selector string, returning a [`LocatorError`] on failure.
fn parse_selector(selector: &str) -> Result<Selector, LocatorError> {
    Selector::parse(selector)
        .map_err(|e| LocatorError::Parse(format!("invalid CSS selector '{selector}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> IssueDate {
        IssueDate::new(19, 3, 2025).unwrap()
    }

    fn page_url() -> Url {
        Url::parse("https://tcm.ioepa.com.br/busca/default.aspx?dts=19/3/2025").unwrap()
    }

    #[test]
    fn finds_direct_pdf_link() {
        let html = r#"<html><body>
            <div id="mid"><a href="https://tcm.ioepa.com.br/arquivos/diario-1234.pdf">Diário</a></div>
        </body></html>"#;

        let address = find_pdf_link(html, &page_url(), date()).unwrap();
        assert_eq!(address, "https://tcm.ioepa.com.br/arquivos/diario-1234.pdf");
    }

    #[test]
    fn resolves_relative_link_against_page_url() {
        let html = r#"<div id="mid"><a href="/arquivos/diario-1234.pdf">Diário</a></div>"#;

        let address = find_pdf_link(html, &page_url(), date()).unwrap();
        assert_eq!(address, "https://tcm.ioepa.com.br/arquivos/diario-1234.pdf");
    }

    #[test]
    fn searches_siblings_when_first_link_is_not_pdf() {
        let html = r#"<div id="mid">
            <a href="/busca/ajuda.aspx">Ajuda</a>
            <a href="/arquivos/diario-1234.PDF">Diário</a>
        </div>"#;

        let address = find_pdf_link(html, &page_url(), date()).unwrap();
        assert_eq!(address, "https://tcm.ioepa.com.br/arquivos/diario-1234.PDF");
    }

    #[test]
    fn falls_back_to_first_link_when_no_pdf_found() {
        let html = r#"<div id="mid"><a href="/busca/viewer.aspx?id=99">Diário</a></div>"#;

        let address = find_pdf_link(html, &page_url(), date()).unwrap();
        assert_eq!(address, "https://tcm.ioepa.com.br/busca/viewer.aspx?id=99");
    }

    #[test]
    fn missing_container_is_not_found() {
        let html = "<html><body><div id=\"other\"></div></body></html>";

        let result = find_pdf_link(html, &page_url(), date());
        assert!(matches!(result, Err(LocatorError::IssueNotFound { .. })));
    }

    #[test]
    fn container_without_links_is_not_found() {
        let html = r#"<div id="mid"><p>Nenhum resultado.</p></div>"#;

        let result = find_pdf_link(html, &page_url(), date());
        assert!(matches!(result, Err(LocatorError::IssueNotFound { .. })));
    }
}
