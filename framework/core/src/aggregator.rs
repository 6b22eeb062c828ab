mod record;

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead as _;
use std::path::Path;

use serde::Serialize;

pub use self::record::ResultRecord;

/// Error counts summed by category across a whole result stream.
///
/// An empty map means the run saw no errors.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregatedErrors(BTreeMap<String, f64>);

impl AggregatedErrors {
    /// Add `count` to the running total for `category`.
    pub fn add(&mut self, category: &str, count: f64) {
        *self.0.entry(category.to_string()).or_default() += count;
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.0.get(category).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0
            .iter()
            .map(|(category, count)| (category.as_str(), *count))
    }

    /// Sum of all the error counts.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for AggregatedErrors {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut errors = Self::default();
        for (category, count) in iter {
            errors.add(&category.into(), count);
        }
        errors
    }
}

impl fmt::Display for AggregatedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (category, count)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{category:?}: {count}")?;
        }
        write!(f, "}}")
    }
}

/// The result of aggregating a complete result stream.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AggregateReport {
    pub errors: AggregatedErrors,
    /// Number of records decoded from the stream.
    pub records: usize,
}

/// Folds the artillery result stream into [`AggregatedErrors`].
pub struct ScenarioResultAggregator;

impl ScenarioResultAggregator {
    /// Aggregate newline-delimited [`ResultRecord`]s from `reader` until it is exhausted.
    ///
    /// Blank lines are skipped. The first line which cannot be decoded stops aggregation; the
    /// counts collected up to that line are kept in the returned [`AggregateError`].
    pub fn aggregate<R>(reader: R) -> Result<AggregateReport, AggregateError>
    where
        R: std::io::Read,
    {
        let mut report = AggregateReport::default();

        for (index, line) in std::io::BufReader::new(reader).lines().enumerate() {
            let line_number = index + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Err(AggregateError::new(line_number, report, e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }

            let record: ResultRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => return Err(AggregateError::new(line_number, report, e.into())),
            };
            if let Some((category, count)) = record.error_counts().find(|(_, c)| *c < 0.0) {
                let cause = DecodeError::NegativeCount {
                    category: category.to_string(),
                    count,
                };
                return Err(AggregateError::new(line_number, report, cause));
            }

            for (category, count) in record.error_counts() {
                report.errors.add(category, count);
            }
            report.records += 1;
        }

        log::debug!(
            "Aggregated {} records into {} error categories",
            report.records,
            report.errors.len()
        );

        Ok(report)
    }

    /// Aggregate the result stream stored at `path`.
    pub fn aggregate_file<P>(path: P) -> Result<AggregateReport, AggregateError>
    where
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path)
            .map_err(|e| AggregateError::new(0, AggregateReport::default(), e.into()))?;
        Self::aggregate(file)
    }
}

/// Why a line of the result stream could not be used.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("negative count {count} for error category {category:?}")]
    NegativeCount { category: String, count: f64 },
}

/// The result stream could not be decoded.
///
/// The statistics are incomplete and must not be used for a pass/fail decision, but the counts
/// seen before the failure are available through [`AggregateError::partial`].
#[derive(Debug, thiserror::Error)]
#[error("failed to decode result record at line {line}: {source}")]
pub struct AggregateError {
    line: usize,
    partial: AggregateReport,
    #[source]
    source: DecodeError,
}

impl AggregateError {
    fn new(line: usize, partial: AggregateReport, source: DecodeError) -> Self {
        Self {
            line,
            partial,
            source,
        }
    }

    /// The line which failed to decode, starting at 1. Zero if the stream could not be opened.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn cause(&self) -> &DecodeError {
        &self.source
    }

    /// Error counts from the records before the failing line.
    pub fn partial(&self) -> &AggregatedErrors {
        &self.partial.errors
    }

    pub fn into_partial(self) -> AggregatedErrors {
        self.partial.errors
    }
}
