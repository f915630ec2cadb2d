//! The evolving vocabulary of accepted field labels.
//!
//! Starts from a fixed seed of labels observed across gazette issues
//! and grows append-only: a plausible label the extractor has never
//! seen is still accepted (dropping real data silently is worse than a
//! spurious field) but is logged for human review and added to the set
//! for future runs. Labels are never removed.
//!
//! Membership is tested on a canonical form — uppercased with
//! whitespace collapsed — so `Município:` and `MUNICÍPIO:` are the
//! same label.

use std::collections::BTreeSet;
use std::path::Path;

/// Labels accepted without further validation, as published by the
/// gazette.
pub const SEED_LABELS: [&str; 19] = [
    "MUNICÍPIO",
    "ÓRGÃO",
    "EXERCÍCIO",
    "ASSUNTO",
    "ORDENADOR",
    "ORDENADORES",
    "CONTADORA",
    "MPC",
    "RELATOR",
    "EMENTA",
    "DECISÃO",
    "PROCESSO",
    "UNIDADE GESTORA",
    "RESPONSÁVEL",
    "REPRESENTANTE LEGAL",
    "INTERESSADO",
    "PROCURADOR",
    "RECORRENTE",
    "INSTRUÇÃO",
];

/// Errors loading or saving the label store.
#[derive(Debug, thiserror::Error)]
pub enum LabelStoreError {
    /// Reading or writing the store file failed.
    #[error("label store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file is not a JSON list of strings.
    #[error("label store format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// The process-wide set of known field labels.
///
/// Injected into extraction rather than reconstructed per run; the
/// caller loads it at startup and saves it after processing so growth
/// persists across runs.
#[derive(Debug, Clone)]
pub struct KnownLabelSet {
    labels: BTreeSet<String>,
    newly_observed: Vec<String>,
}

impl Default for KnownLabelSet {
    fn default() -> Self {
        Self::seeded()
    }
}

impl KnownLabelSet {
    /// Creates a set containing only the seed labels.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            labels: SEED_LABELS.iter().map(|l| Self::canonical(l)).collect(),
            newly_observed: Vec::new(),
        }
    }

    /// Loads a persisted label set, merged over the seed labels.
    ///
    /// A missing file yields the plain seed set, so first runs need no
    /// setup.
    ///
    /// # Errors
    ///
    /// Returns [`LabelStoreError`] if the file exists but cannot be
    /// read or parsed.
    pub fn load(path: &Path) -> Result<Self, LabelStoreError> {
        let mut set = Self::seeded();

        if !path.exists() {
            log::debug!("No label store at {}, using seed labels", path.display());
            return Ok(set);
        }

        let raw = std::fs::read_to_string(path)?;
        let stored: Vec<String> = serde_json::from_str(&raw)?;
        for label in stored {
            set.labels.insert(Self::canonical(&label));
        }

        log::debug!(
            "Loaded {} known labels from {}",
            set.labels.len(),
            path.display()
        );
        Ok(set)
    }

    /// Persists the full set (seed included) as a sorted JSON list.
    ///
    /// # Errors
    ///
    /// Returns [`LabelStoreError`] on write failure.
    pub fn save(&self, path: &Path) -> Result<(), LabelStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let list: Vec<&String> = self.labels.iter().collect();
        std::fs::write(path, serde_json::to_string_pretty(&list)?)?;
        Ok(())
    }

    /// The canonical membership form of a label: uppercased, internal
    /// whitespace collapsed to single spaces, trimmed.
    #[must_use]
    pub fn canonical(label: &str) -> String {
        label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    }

    /// Whether a label (in any capitalization) is already known.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(&Self::canonical(label))
    }

    /// Records an observed label. Returns `true` if it was new; new
    /// labels are flagged for human review and kept for future runs.
    pub fn observe(&mut self, label: &str) -> bool {
        let canonical = Self::canonical(label);
        if self.labels.insert(canonical.clone()) {
            log::warn!("Unrecognized field label '{label}' accepted, flagged for review");
            self.newly_observed.push(canonical);
            true
        } else {
            false
        }
    }

    /// Labels first observed during this run, in observation order.
    #[must_use]
    pub fn newly_observed(&self) -> &[String] {
        &self.newly_observed
    }

    /// Number of known labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the set is empty (never true for a seeded set).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_labels_are_known_in_any_capitalization() {
        let set = KnownLabelSet::seeded();
        assert!(set.contains("MUNICÍPIO"));
        assert!(set.contains("Município"));
        assert!(set.contains("unidade  gestora"));
    }

    #[test]
    fn observing_a_new_label_grows_the_set() {
        let mut set = KnownLabelSet::seeded();
        let before = set.len();

        assert!(set.observe("Votação"));
        assert!(set.contains("VOTAÇÃO"));
        assert_eq!(set.len(), before + 1);
        assert_eq!(set.newly_observed(), &["VOTAÇÃO".to_owned()]);
    }

    #[test]
    fn observing_a_known_label_is_a_no_op() {
        let mut set = KnownLabelSet::seeded();
        let before = set.len();

        assert!(!set.observe("Relator"));
        assert_eq!(set.len(), before);
        assert!(set.newly_observed().is_empty());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = std::env::temp_dir().join("gazette_labels_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("known_labels.json");

        let mut set = KnownLabelSet::seeded();
        set.observe("Votação");
        set.save(&path).unwrap();

        let reloaded = KnownLabelSet::load(&path).unwrap();
        assert!(reloaded.contains("VOTAÇÃO"));
        assert!(reloaded.contains("MUNICÍPIO"));
        // Reloaded growth is part of the base set, not "new" again.
        assert!(reloaded.newly_observed().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_store_file_falls_back_to_seed() {
        let path = std::env::temp_dir().join("gazette_labels_test_missing/none.json");
        let set = KnownLabelSet::load(&path).unwrap();
        assert_eq!(set.len(), KnownLabelSet::seeded().len());
    }
}
