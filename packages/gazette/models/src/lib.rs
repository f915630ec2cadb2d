#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Core domain types for the gazette extraction pipeline.
//!
//! This crate defines the types shared across the pipeline: the validated
//! [`IssueDate`], the [`ActKind`] taxonomy of legal acts published in the
//! TCM-PA official gazette, the per-run [`GazetteIssue`] state, and the
//! [`ExtractedRecord`] produced for each act.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The kinds of legal acts the pipeline knows how to segment and parse.
///
/// Each kind selects an opening-marker pattern, the delimiters that can
/// terminate the last section of an issue, and the fields that carry
/// personal data and must be redacted in structured output.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ActKind {
    /// A court decision ("ACÓRDÃO Nº n.nnn").
    Acordao,
    /// A resolution ("RESOLUÇÃO Nº n.nnn").
    Resolucao,
}

impl ActKind {
    /// All kinds the pipeline processes, in gazette order.
    pub const ALL: [Self; 2] = [Self::Acordao, Self::Resolucao];

    /// The category string used in record files and index keys.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Acordao => "acordao",
            Self::Resolucao => "resolucao",
        }
    }

    /// Regex pattern matching this kind's opening marker.
    ///
    /// Capture group 1 is the act's identifying number (dotted form,
    /// e.g. `46.073`).
    #[must_use]
    pub const fn opening_pattern(self) -> &'static str {
        match self {
            Self::Acordao => r"ACÓRDÃO Nº (\d+\.\d+)",
            Self::Resolucao => r"RESOLUÇÃO Nº (\d+\.\d+)",
        }
    }

    /// Literals that terminate the final section of an issue, in
    /// priority order. Everything before the earliest match belongs to
    /// the section.
    #[must_use]
    pub const fn ending_delimiters(self) -> &'static [&'static str] {
        match self {
            Self::Acordao | Self::Resolucao => {
                &["Sessão do Pleno", "Download Anexo", "Protocolo:"]
            }
        }
    }

    /// Structured field names that carry personal identifiers and are
    /// redacted before a record leaves the pipeline.
    #[must_use]
    pub const fn redacted_fields(self) -> &'static [&'static str] {
        match self {
            Self::Acordao => &[
                "ordenador",
                "ordenadores",
                "responsavel",
                "representante_legal",
                "interessado",
            ],
            Self::Resolucao => &["recorrente"],
        }
    }
}

/// Error returned when an [`IssueDate`] cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidDateError {
    /// The day/month/year triple does not form a real calendar date.
    NotACalendarDate {
        /// Day component as given.
        day: u32,
        /// Month component as given.
        month: u32,
        /// Year component as given.
        year: i32,
    },
    /// The date is strictly after today — no issue can exist for it.
    FutureDate {
        /// Day component as given.
        day: u32,
        /// Month component as given.
        month: u32,
        /// Year component as given.
        year: i32,
    },
    /// A date string could not be parsed as `dd/mm/yyyy`.
    Unparseable {
        /// The input that failed to parse.
        input: String,
    },
}

impl std::fmt::Display for InvalidDateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotACalendarDate { day, month, year } => {
                write!(f, "invalid calendar date: {day}/{month}/{year}")
            }
            Self::FutureDate { day, month, year } => {
                write!(f, "date {day}/{month}/{year} is in the future")
            }
            Self::Unparseable { input } => {
                write!(f, "cannot parse '{input}' as dd/mm/yyyy")
            }
        }
    }
}

impl std::error::Error for InvalidDateError {}

/// A validated publication date for a gazette issue.
///
/// Construction guarantees the triple forms a real Gregorian date no
/// later than today. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueDate {
    day: u32,
    month: u32,
    year: i32,
}

impl IssueDate {
    /// Creates an `IssueDate`, validating the calendar and rejecting
    /// future dates.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDateError::NotACalendarDate`] for impossible
    /// dates and [`InvalidDateError::FutureDate`] for dates after today.
    pub fn new(day: u32, month: u32, year: i32) -> Result<Self, InvalidDateError> {
        let date = chrono::NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(InvalidDateError::NotACalendarDate { day, month, year })?;

        if date > chrono::Local::now().date_naive() {
            return Err(InvalidDateError::FutureDate { day, month, year });
        }

        Ok(Self { day, month, year })
    }

    /// Today's date per the local clock.
    #[must_use]
    pub fn today() -> Self {
        use chrono::Datelike as _;

        let today = chrono::Local::now().date_naive();
        Self {
            day: today.day(),
            month: today.month(),
            year: today.year(),
        }
    }

    /// Day of month.
    #[must_use]
    pub const fn day(self) -> u32 {
        self.day
    }

    /// Month of year (1-12).
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// The unpadded `d/m/yyyy` form the upstream search portal expects
    /// in its `dts` query parameter.
    #[must_use]
    pub fn query_string(self) -> String {
        format!("{}/{}/{}", self.day, self.month, self.year)
    }

    /// Number of days in this date's month.
    #[must_use]
    pub fn days_in_month(year: i32, month: u32) -> u32 {
        // The day before the first of the next month.
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .map_or(31, |d| {
                use chrono::Datelike as _;
                d.day()
            })
    }
}

impl std::fmt::Display for IssueDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.day, self.month, self.year)
    }
}

impl std::str::FromStr for IssueDate {
    type Err = InvalidDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparseable = || InvalidDateError::Unparseable {
            input: s.to_owned(),
        };

        let mut parts = s.trim().splitn(3, '/');
        let day = parts
            .next()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .ok_or_else(unparseable)?;
        let month = parts
            .next()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .ok_or_else(unparseable)?;
        let year = parts
            .next()
            .and_then(|p| p.trim().parse::<i32>().ok())
            .ok_or_else(unparseable)?;

        Self::new(day, month, year)
    }
}

/// Per-run state for one dated gazette issue.
///
/// Constructed once the locator has resolved the issue's PDF address.
/// `raw_text` is a memo slot: extraction populates it at most once and
/// later calls reuse the cached value.
#[derive(Debug, Clone)]
pub struct GazetteIssue {
    /// The issue's publication date.
    pub date: IssueDate,
    /// Absolute address of the issue's PDF, resolved by the locator.
    pub remote_url: String,
    /// The issue's internal serial number (e.g. `1.234`), captured
    /// during text extraction.
    pub serial_number: String,
    /// Local path of the cached PDF, set once the download is confirmed.
    pub local_path: Option<PathBuf>,
    raw_text: Option<String>,
}

impl GazetteIssue {
    /// Creates an issue for a resolved PDF address.
    #[must_use]
    pub const fn new(date: IssueDate, remote_url: String) -> Self {
        Self {
            date,
            remote_url,
            serial_number: String::new(),
            local_path: None,
            raw_text: None,
        }
    }

    /// The basename of the remote PDF address, used as the cache file
    /// name.
    #[must_use]
    pub fn pdf_file_name(&self) -> String {
        self.remote_url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("diario.pdf")
            .to_owned()
    }

    /// The memoized extracted text, if extraction has already run.
    #[must_use]
    pub fn cached_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    /// Stores the extracted text. The slot is written at most once;
    /// later calls keep the first value and return it.
    pub fn cache_text(&mut self, text: String) -> &str {
        if self.raw_text.is_none() {
            self.raw_text = Some(text);
        }
        self.raw_text.as_deref().unwrap_or_default()
    }
}

/// A contiguous span of issue text belonging to one legal act.
///
/// Ephemeral: produced by segmentation and consumed by record building
/// within a single extraction pass.
#[derive(Debug, Clone)]
pub struct Section {
    /// The act kind whose opening marker starts this span.
    pub kind: ActKind,
    /// The span text, beginning exactly at the opening marker.
    pub text: String,
}

/// A structured record extracted from one act section.
///
/// `numero` is mandatory: sections without an identifying number never
/// become records. Dynamic fields discovered by the key/value extractor
/// live in `fields`, in document order; serialization flattens them to
/// the top level of the JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Act category (`acordao`, `resolucao`).
    pub category: String,
    /// The act's identifying number, dotted form (e.g. `46.073`).
    pub numero: String,
    /// Session date in Portuguese long form, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_date: Option<String>,
    /// Serial number of the issue this record came from.
    pub issue_serial: String,
    /// Publication date of the issue, `d/m/yyyy`.
    pub publication_date: String,
    /// Discovered label → value pairs, in document order.
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
    /// The unmodified section text, retained for audit and
    /// reprocessing. Never redacted.
    pub original_text: String,
}

impl ExtractedRecord {
    /// Looks up a dynamic field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// File stem for the persisted record:
    /// `<issue_serial>_<category>_<numero>` with dots stripped from the
    /// numeric components.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}",
            self.issue_serial.replace('.', ""),
            self.category,
            self.numero.replace('.', "")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_past_date_constructs() {
        let date = IssueDate::new(19, 3, 2025).unwrap();
        assert_eq!(date.day(), 19);
        assert_eq!(date.month(), 3);
        assert_eq!(date.year(), 2025);
    }

    #[test]
    fn impossible_date_rejected() {
        assert!(matches!(
            IssueDate::new(31, 2, 2024),
            Err(InvalidDateError::NotACalendarDate { .. })
        ));
        assert!(matches!(
            IssueDate::new(0, 1, 2024),
            Err(InvalidDateError::NotACalendarDate { .. })
        ));
    }

    #[test]
    fn future_date_rejected() {
        use chrono::Datelike as _;

        let tomorrow = chrono::Local::now().date_naive() + chrono::Duration::days(1);
        let result = IssueDate::new(tomorrow.day(), tomorrow.month(), tomorrow.year());
        assert!(matches!(result, Err(InvalidDateError::FutureDate { .. })));
    }

    #[test]
    fn today_constructs() {
        let today = IssueDate::today();
        assert!(IssueDate::new(today.day(), today.month(), today.year()).is_ok());
    }

    #[test]
    fn parses_slash_separated_date() {
        let date: IssueDate = "15/05/2024".parse().unwrap();
        assert_eq!(date.query_string(), "15/5/2024");
    }

    #[test]
    fn rejects_garbage_date_string() {
        assert!(matches!(
            "not-a-date".parse::<IssueDate>(),
            Err(InvalidDateError::Unparseable { .. })
        ));
    }

    #[test]
    fn query_string_is_unpadded() {
        let date = IssueDate::new(3, 3, 2025).unwrap();
        assert_eq!(date.query_string(), "3/3/2025");
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(IssueDate::days_in_month(2024, 2), 29);
        assert_eq!(IssueDate::days_in_month(2025, 2), 28);
        assert_eq!(IssueDate::days_in_month(2025, 12), 31);
    }

    #[test]
    fn raw_text_slot_is_write_once() {
        let date = IssueDate::new(19, 3, 2025).unwrap();
        let mut issue = GazetteIssue::new(date, "https://example.com/d.pdf".to_owned());

        assert!(issue.cached_text().is_none());
        issue.cache_text("first".to_owned());
        issue.cache_text("second".to_owned());
        assert_eq!(issue.cached_text(), Some("first"));
    }

    #[test]
    fn pdf_file_name_from_url() {
        let date = IssueDate::new(19, 3, 2025).unwrap();
        let issue = GazetteIssue::new(
            date,
            "https://tcm.ioepa.com.br/arquivos/2025/diario-1234.pdf".to_owned(),
        );
        assert_eq!(issue.pdf_file_name(), "diario-1234.pdf");
    }

    #[test]
    fn act_kind_round_trips_through_strings() {
        assert_eq!(ActKind::Acordao.to_string(), "acordao");
        assert_eq!("resolucao".parse::<ActKind>().unwrap(), ActKind::Resolucao);
    }

    #[test]
    fn file_stem_strips_dots() {
        let record = ExtractedRecord {
            category: "acordao".to_owned(),
            numero: "46.073".to_owned(),
            session_date: None,
            issue_serial: "1.234".to_owned(),
            publication_date: "19/3/2025".to_owned(),
            fields: IndexMap::new(),
            original_text: String::new(),
        };
        assert_eq!(record.file_stem(), "1234_acordao_46073");
    }
}
