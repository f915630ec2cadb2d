#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Structured extraction of legal acts from gazette text.
//!
//! The gazette publishes acts with no fixed schema: each act announces
//! its fields as uppercase-led labels followed by a colon
//! (`MUNICÍPIO: ALTAMIRA`), and the label set varies per document.
//! This crate segments an issue's text into per-act sections
//! ([`SectionSegmenter`]), discovers each section's labels and
//! partitions the content between them ([`KeyValueExtractor`] backed by
//! the evolving [`KnownLabelSet`] vocabulary), and assembles redacted
//! structured records ([`RecordBuilder`]).

pub mod keys;
pub mod labels;
pub mod record;
pub mod redact;
pub mod segment;
pub mod validate;

pub use keys::KeyValueExtractor;
pub use labels::KnownLabelSet;
pub use record::RecordBuilder;
pub use redact::{REDACTION_MARKER, Redactor};
pub use segment::SectionSegmenter;
