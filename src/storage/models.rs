use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded file as recorded in the file index, keyed by its generated id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Name supplied by the uploader (not unique)
    pub original_filename: String,
    /// `<id><extension>`, the name of the backing object
    pub stored_filename: String,
    pub upload_time: DateTime<Utc>,
    pub uploader: String,
    pub file_size_bytes: u64,
    /// Client-supplied MIME type (untrusted)
    pub file_type: String,
    #[serde(default)]
    pub in_vector_db: bool,
    /// Absolute location of the backing bytes
    pub path: String,
}

/// An admin account as recorded in the credential file, keyed by username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Lowercase hex SHA-256 of `password || salt`
    pub password_hash: String,
    pub salt: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account, never carrying the hash or salt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl UserSummary {
    pub fn from_record(username: &str, record: &UserRecord) -> Self {
        Self {
            username: username.to_string(),
            created_by: record.created_by.clone(),
            created_at: record.created_at,
        }
    }
}

/// Metrics an evaluation run can be asked to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Precision,
    Recall,
    F1,
    #[serde(rename = "MRR")]
    Mrr,
    #[serde(rename = "NDCG")]
    Ndcg,
    Latency,
}

impl MetricKind {
    pub fn defaults() -> Vec<MetricKind> {
        vec![
            MetricKind::Precision,
            MetricKind::Recall,
            MetricKind::F1,
            MetricKind::Mrr,
        ]
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Precision => "Precision",
            MetricKind::Recall => "Recall",
            MetricKind::F1 => "F1",
            MetricKind::Mrr => "MRR",
            MetricKind::Ndcg => "NDCG",
            MetricKind::Latency => "Latency",
        };
        f.write_str(name)
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "precision" => Ok(MetricKind::Precision),
            "recall" => Ok(MetricKind::Recall),
            "f1" | "f1_score" => Ok(MetricKind::F1),
            "mrr" => Ok(MetricKind::Mrr),
            "ndcg" => Ok(MetricKind::Ndcg),
            "latency" => Ok(MetricKind::Latency),
            other => Err(format!("unknown metric '{other}'")),
        }
    }
}

/// Knobs recorded alongside an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationParameters {
    pub relevance_threshold: f64,
    pub top_k: u32,
    pub metrics: Vec<MetricKind>,
}

impl Default for EvaluationParameters {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.7,
            top_k: 5,
            metrics: MetricKind::defaults(),
        }
    }
}

/// Aggregate scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub mrr: f64,
    pub ndcg: f64,
}

impl Metrics {
    pub fn is_normalized(&self) -> bool {
        [
            self.precision,
            self.recall,
            self.f1_score,
            self.mrr,
            self.ndcg,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub expected: String,
    pub actual: String,
    pub score: f64,
    pub latency_ms: u64,
}

/// Full result of one evaluation run, stored in its own detail file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: EvaluationParameters,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: Metrics,
    pub queries: Vec<QueryResult>,
}

/// Evaluation index entry, keyed by evaluation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: Metrics,
    pub num_queries: usize,
    /// Location of the detail file
    pub file_path: String,
}
