//! Signal traces
//!
//! A trace is an ordered sequence of [`SignalRecord`]s, stored either as a
//! JSON array or as NDJSON (one record per line).

use crate::error::{EngineError, SignalValidationError};
use crate::signal::record::SignalRecord;
use serde::Serialize;

/// Ordered raw signal records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalTrace {
    records: Vec<SignalRecord>,
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub index: usize,
    pub signal: &'static str,
    pub message: String,
    #[serde(skip)]
    pub error: SignalValidationError,
}

impl SignalTrace {
    pub fn new(records: Vec<SignalRecord>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of records
    pub fn parse_array(json: &str) -> Result<Self, EngineError> {
        let records: Vec<SignalRecord> = serde_json::from_str(json)?;
        Ok(Self { records })
    }

    /// Parse NDJSON, skipping blank lines
    pub fn parse_ndjson(ndjson: &str) -> Result<Self, EngineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SignalRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(EngineError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(Self { records })
    }

    /// Parse either format; a leading `[` selects the array form
    pub fn parse(input: &str) -> Result<Self, EngineError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    pub fn records(&self) -> &[SignalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<SignalRecord> {
        self.records
    }

    /// Every record that cannot be replayed, in trace order
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut previous: Option<&SignalRecord> = None;

        for (index, record) in self.records.iter().enumerate() {
            let mut result = record.signal.validate();
            if result.is_ok() {
                if let Some(prev) = previous {
                    if record.at < prev.at {
                        result = Err(SignalValidationError::OutOfOrder {
                            previous: prev.at.to_rfc3339(),
                            actual: record.at.to_rfc3339(),
                        });
                    }
                }
            }

            match result {
                Ok(()) => previous = Some(record),
                Err(error) => issues.push(ValidationIssue {
                    index,
                    signal: record.signal.name(),
                    message: error.to_string(),
                    error,
                }),
            }
        }

        issues
    }

    /// Fail on the first invalid record
    pub fn ensure_valid(&self) -> Result<(), EngineError> {
        match self.validate().into_iter().next() {
            Some(issue) => Err(issue.error.into()),
            None => Ok(()),
        }
    }
}
