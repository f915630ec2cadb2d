//! Per-page text extraction from cached gazette PDFs.

use gazette_models::GazetteIssue;
use regex::Regex;

use crate::TextNormalizer;

/// Pattern locating the issue's serial number in raw page text, e.g.
/// `… 2025 DOE TCMPA Nº 1.234 …`. Capture group 1 is the dotted serial.
const SERIAL_NUMBER_PATTERN: &str = r"\b\d{4}[\s\W]+DOE\s+TCMPA\s+Nº\s+([\d.]+)";

/// Page index of the gazette's fixed cover page, which carries no act
/// content and is always skipped.
const COVER_PAGE_INDEX: usize = 0;

/// Extracts and normalizes the text of a cached gazette PDF.
///
/// Extraction is memoized on the issue's text slot: it runs at most
/// once per [`GazetteIssue`] instance, and later calls return the
/// cached value byte-for-byte.
#[derive(Debug)]
pub struct TextExtractor {
    normalizer: TextNormalizer,
    normalize: bool,
    serial: Regex,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    /// Creates an extractor with normalization enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            normalize: true,
            serial: Regex::new(SERIAL_NUMBER_PATTERN).unwrap_or_else(|_| unreachable!()),
        }
    }

    /// Enables or disables per-page normalization.
    #[must_use]
    pub const fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Extracts the issue's text, populating its memo slot and serial
    /// number.
    ///
    /// The cover page (index 0) is skipped; remaining pages are
    /// normalized when enabled and joined with newlines. Any extraction
    /// error logs and returns an empty string — downstream stages treat
    /// empty text as "nothing to extract". Errors are not memoized, so
    /// a fresh issue instance may retry.
    pub fn extract(&self, issue: &mut GazetteIssue) -> String {
        if let Some(text) = issue.cached_text() {
            log::info!("Text already extracted for {}, reusing", issue.date);
            return text.to_owned();
        }

        let Some(path) = issue.local_path.clone() else {
            log::warn!("No cached PDF path for {}, nothing to extract", issue.date);
            return String::new();
        };

        log::info!("Extracting text from {}", path.display());
        let pages = match pdf_extract::extract_text_by_pages(&path) {
            Ok(pages) => pages,
            Err(e) => {
                log::error!("Text extraction failed for {}: {e}", path.display());
                return String::new();
            }
        };

        let total = pages.len();
        let mut extracted = Vec::new();

        for (index, page) in pages.iter().enumerate() {
            if index == COVER_PAGE_INDEX {
                continue;
            }
            log::debug!("Processing page {}/{total}", index + 1);

            if issue.serial_number.is_empty() {
                if let Some(caps) = self.serial.captures(page) {
                    issue.serial_number = caps[1].to_owned();
                    log::debug!("Issue serial number: {}", issue.serial_number);
                }
            }

            let page_text = if self.normalize {
                self.normalizer.normalize(page)
            } else {
                page.clone()
            };

            if !page_text.is_empty() {
                extracted.push(page_text);
            }
        }

        let text = extracted.join("\n");
        if text.is_empty() {
            log::warn!("No text extracted from {}", path.display());
        }

        issue.cache_text(text).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use gazette_models::IssueDate;

    use super::*;

    fn issue() -> GazetteIssue {
        let date = IssueDate::new(19, 3, 2025).unwrap();
        GazetteIssue::new(date, "https://example.com/diario.pdf".to_owned())
    }

    #[test]
    fn memoized_text_is_returned_without_reparsing() {
        let extractor = TextExtractor::new();
        let mut issue = issue();
        issue.cache_text("texto já extraído".to_owned());

        // No local_path is set, so a re-parse would return "".
        assert_eq!(extractor.extract(&mut issue), "texto já extraído");
        assert_eq!(extractor.extract(&mut issue), "texto já extraído");
    }

    #[test]
    fn missing_pdf_path_yields_empty_text() {
        let extractor = TextExtractor::new();
        let mut issue = issue();

        assert_eq!(extractor.extract(&mut issue), "");
        // Soft failure is not memoized.
        assert!(issue.cached_text().is_none());
    }

    #[test]
    fn unreadable_pdf_yields_empty_text() {
        let extractor = TextExtractor::new();
        let mut issue = issue();
        issue.local_path = Some(std::path::PathBuf::from("/nonexistent/diario.pdf"));

        assert_eq!(extractor.extract(&mut issue), "");
    }

    #[test]
    fn serial_number_pattern_captures_dotted_serial() {
        let serial = Regex::new(SERIAL_NUMBER_PATTERN).unwrap();
        let page = "Quarta-feira, 19 de março de 2025 DOE TCMPA Nº 1.234 Diário Oficial";

        let caps = serial.captures(page).unwrap();
        assert_eq!(&caps[1], "1.234");
    }
}
