#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! PDF text extraction and normalization for gazette issues.
//!
//! The gazette is published as a dated PDF whose first page is a fixed
//! cover. [`TextExtractor`] pulls per-page text with [`pdf_extract`],
//! skips the cover, captures the issue's serial number, and runs each
//! page through the [`TextNormalizer`] boilerplate/whitespace pipeline.
//!
//! Extraction fails softly: a parse error logs and yields an empty
//! string, so downstream stages see "nothing to extract" rather than an
//! error to propagate.

pub mod extract;
pub mod normalize;

pub use extract::TextExtractor;
pub use normalize::TextNormalizer;
