//! Text normalization for extracted gazette pages.
//!
//! Strips the boilerplate the gazette stamps on every page (QR-code
//! consultation notice, portal URLs, biennium banner, social-media
//! footer, private-use watermark glyphs, "Publicado por:" lines),
//! reverses line-wrap hyphenation, and collapses whitespace. The final
//! step removes all remaining newlines: downstream key/value matching
//! works on label…colon…content windows that may have spanned line
//! breaks in the original layout.

use regex::Regex;

/// Boilerplate patterns removed verbatim from every page, in order.
const BOILERPLATE_PATTERNS: [&str; 9] = [
    r"(?s)Consulta via leitor de QR Code.*?diario-eletronico\.",
    r"https?://www\.tcmpa\.tc\.br/?",
    r"www\.tcm\.pa\.gov\.br",
    r"BIÊNIO – \w+ de \d{4}/\w+ de \d{4}",
    r"Redes Sociais \d+ Páginas",
    r"(?m)^\s*-\s*$",
    r"[\u{f0e7}\u{f038}\u{f039}\u{f028}\u{f02b}\u{f03c}]",
    r"\\uf[0-9A-Fa-f]{3,}",
    r"(?m)^\s*Publicado por:.*$",
];

/// Normalizes extracted page text.
///
/// Every step is idempotent, so re-normalizing already-clean text is a
/// no-op.
#[derive(Debug)]
pub struct TextNormalizer {
    boilerplate: Vec<Regex>,
    hyphenation: Regex,
    newline_runs: Regex,
    space_runs: Regex,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    /// Compiles the normalization pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boilerplate: BOILERPLATE_PATTERNS
                .iter()
                .map(|p| Regex::new(p).unwrap_or_else(|_| unreachable!()))
                .collect(),
            hyphenation: Regex::new(r"(\w+)-\s+(\w+)").unwrap_or_else(|_| unreachable!()),
            newline_runs: Regex::new(r"\n{3,}").unwrap_or_else(|_| unreachable!()),
            space_runs: Regex::new(r" {2,}").unwrap_or_else(|_| unreachable!()),
        }
    }

    /// Runs the full pipeline: boilerplate removal, de-hyphenation,
    /// whitespace collapse, newline strip, trim.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            log::warn!("Empty text given to normalizer");
            return String::new();
        }

        let mut text = text.to_owned();
        for pattern in &self.boilerplate {
            text = pattern.replace_all(&text, "").into_owned();
        }

        text = self.hyphenation.replace_all(&text, "${1}${2}").into_owned();
        text = self.newline_runs.replace_all(&text, "\n\n").into_owned();
        text = self.space_runs.replace_all(&text, " ").into_owned();
        text = text.replace('\n', "");

        text.trim().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_portal_urls() {
        let normalizer = TextNormalizer::new();
        let text = "Decisão publicada em https://www.tcmpa.tc.br/ e www.tcm.pa.gov.br hoje";
        assert_eq!(
            normalizer.normalize(text),
            "Decisão publicada em e hoje"
        );
    }

    #[test]
    fn removes_qr_code_notice() {
        let normalizer = TextNormalizer::new();
        let text = "Início Consulta via leitor de QR Code\nna página diario-eletronico. Fim";
        assert_eq!(normalizer.normalize(text), "Início Fim");
    }

    #[test]
    fn removes_publisher_footer_lines() {
        let normalizer = TextNormalizer::new();
        let text = "Relator: Conselheiro\nPublicado por: Secretaria Geral\nEmenta: contas";
        assert_eq!(
            normalizer.normalize(text),
            "Relator: ConselheiroEmenta: contas"
        );
    }

    #[test]
    fn rejoins_hyphenated_line_wraps() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("presta- ção de contas"),
            "prestação de contas"
        );
    }

    #[test]
    fn collapses_whitespace_and_strips_newlines() {
        let normalizer = TextNormalizer::new();
        let text = "Município:   Belém\n\n\n\nÓrgão: Prefeitura";
        assert_eq!(
            normalizer.normalize(text),
            "Município: BelémÓrgão: Prefeitura"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let normalizer = TextNormalizer::new();
        let once = normalizer.normalize("Assunto:  Recurso- so de\nReconsideração");
        let twice = normalizer.normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_stays_empty() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize(""), "");
    }
}
