use std::collections::BTreeMap;

use serde::Deserialize;

/// One reporting interval from the artillery `save-stats` stream.
///
/// Only `errors` is read. The other fields (latency, codes, rps, ...) are kept as they are so a
/// record always has to be a JSON object to decode.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultRecord {
    /// Error category to count for this interval.
    #[serde(default)]
    pub errors: Option<BTreeMap<String, f64>>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl ResultRecord {
    /// Iterate over the error counts of this record, empty if it carries none.
    pub fn error_counts(&self) -> impl Iterator<Item = (&str, f64)> {
        self.errors
            .iter()
            .flatten()
            .map(|(category, count)| (category.as_str(), *count))
    }
}
