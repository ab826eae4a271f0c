use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const SERIAL_COLUMN: &str = "sno";
pub const SUB_SERIAL_COLUMN: &str = "subsno";
pub const VALID_COLUMN: &str = "valid";
pub const MESSAGE_COLUMN: &str = "message";

pub const MSG_SERIAL_MISSING: &str = "Serial number is missing.";
pub const MSG_NO_DATA: &str = "No data returned from API.";
pub const MSG_AUTH_MISSING: &str = "API credentials are missing.";
pub const MSG_FAILED_TO_INITIATE: &str = "Failed to initiate verification.";
pub const MSG_TIMED_OUT: &str = "Search did not complete in time.";
pub const MSG_ASYNC_ERRORED: &str = "An error occurred during verification.";
pub const MSG_VERIFIED: &str = "Verification completed.";

/// One row of the uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    pub index: usize,
    pub serial: String,
    pub fields: HashMap<String, String>,
}

impl InputRecord {
    pub fn value(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Parsed upload; `columns` keeps the header order of the file.
#[derive(Debug, Clone, Default)]
pub struct InputBatch {
    pub columns: Vec<String>,
    pub records: Vec<InputRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub values: Vec<(String, String)>,
}

impl LookupKey {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Human readable form for logs, e.g. `pan=ABCDE1234F`.
    pub fn describe(&self) -> String {
        self.values
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InputMissing,
    AuthMissing,
    TransportFailure,
    NoDataReturned,
    SubmissionFailed,
    AsyncTimedOut,
    AsyncErrored,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputMissing => "input_missing",
            Self::AuthMissing => "auth_missing",
            Self::TransportFailure => "transport_failure",
            Self::NoDataReturned => "no_data_returned",
            Self::SubmissionFailed => "submission_failed",
            Self::AsyncTimedOut => "async_timed_out",
            Self::AsyncErrored => "async_errored",
        }
    }
}

/// Outcome of one external verification. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub success: bool,
    pub payload: serde_json::Value,
    pub message: String,
    pub failure: Option<FailureKind>,
}

impl VerificationResult {
    pub fn succeeded(payload: serde_json::Value) -> Self {
        Self {
            success: true,
            payload,
            message: MSG_VERIFIED.to_string(),
            failure: None,
        }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: serde_json::Value::Null,
            message: message.into(),
            failure: Some(kind),
        }
    }

    pub fn is_failure(&self, kind: FailureKind) -> bool {
        self.failure == Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Completed,
    Errored,
    TimedOut,
}

impl JobStatus {
    /// Maps the remote `status` field; anything unrecognised is still pending.
    pub fn from_remote(status: Option<&str>) -> Self {
        match status {
            Some("COMPLETED") => Self::Completed,
            Some("ERRORED") => Self::Errored,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A submitted verification waiting on the remote side.
#[derive(Debug, Clone, Serialize)]
pub struct AsyncJob {
    pub job_id: String,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
    pub attempts: u32,
}

impl AsyncJob {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            submitted_at: Utc::now(),
            status: JobStatus::Pending,
            attempts: 0,
        }
    }

    /// Records one status poll. Terminal jobs ignore further transitions.
    pub fn record_poll(&mut self, observed: JobStatus) -> JobStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        self.attempts += 1;
        self.status = observed;
        self.status
    }

    pub fn time_out(&mut self) {
        if !self.status.is_terminal() {
            self.status = JobStatus::TimedOut;
        }
    }
}

/// Path → rendered scalar, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedRow {
    entries: Vec<(String, String)>,
}

impl FlattenedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later inserts for an existing key overwrite the value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One element of a list-valued field, linked back to its parent row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRow {
    pub serial: String,
    pub join_values: Vec<String>,
    pub sub_serial: usize,
    pub fields: FlattenedRow,
}

/// Verification outcome for one input row.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub index: usize,
    pub serial: String,
    pub result: VerificationResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OutputTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub endpoint: String,
    pub total_rows: usize,
    pub verified_rows: usize,
    pub failed_rows: usize,
    pub expanded_rows: usize,
    pub failures: BTreeMap<String, usize>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub duration_ms: u64,
}

/// Everything the load stage needs to write a run's results.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub table: OutputTable,
    pub outcomes: Vec<RowOutcome>,
    pub expanded: Vec<ExpandedRow>,
    pub summary: RunSummary,
}
