use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use super::RegistryError;
use crate::storage::models::{
    EvaluationParameters, EvaluationRecord, EvaluationSummary, Metrics, QueryResult,
};
use crate::storage::JsonIndex;

/// Output of a scorer for one query set.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub metrics: Metrics,
    pub results: Vec<QueryResult>,
}

/// Computes retrieval metrics for a query set.
pub trait Scorer: Send + Sync {
    fn score(&self, queries: &[String], parameters: &EvaluationParameters) -> ScoreReport;
}

/// Stand-in scorer that reports the same fixed numbers for every run.
/// No retrieval happens; swap in a real `Scorer` to get meaningful metrics.
#[derive(Debug, Default)]
pub struct PlaceholderScorer;

impl Scorer for PlaceholderScorer {
    fn score(&self, queries: &[String], _parameters: &EvaluationParameters) -> ScoreReport {
        ScoreReport {
            metrics: Metrics {
                precision: 0.85,
                recall: 0.78,
                f1_score: 0.81,
                mrr: 0.92,
                ndcg: 0.88,
            },
            results: queries
                .iter()
                .map(|query| QueryResult {
                    query: query.clone(),
                    expected: "Expected result".to_string(),
                    actual: "Actual result".to_string(),
                    score: 0.9,
                    latency_ms: 150,
                })
                .collect(),
        }
    }
}

/// Evaluation runs: one detail file per run plus a summary index.
pub struct EvaluationRegistry {
    index: JsonIndex<EvaluationSummary>,
    detail_dir: PathBuf,
    scorer: Arc<dyn Scorer>,
}

impl EvaluationRegistry {
    pub fn new<P: AsRef<Path>>(
        index: JsonIndex<EvaluationSummary>,
        detail_dir: P,
        scorer: Arc<dyn Scorer>,
    ) -> Result<Self, RegistryError> {
        std::fs::create_dir_all(detail_dir.as_ref())?;
        Ok(Self {
            index,
            detail_dir: detail_dir.as_ref().to_path_buf(),
            scorer,
        })
    }

    /// Score `queries`, persist the run and return its id with the full record.
    pub fn run(
        &self,
        name: &str,
        description: &str,
        queries: &[String],
        parameters: EvaluationParameters,
    ) -> Result<(String, EvaluationRecord), RegistryError> {
        if queries.is_empty() {
            return Err(RegistryError::Invalid(
                "at least one query is required".to_string(),
            ));
        }

        let report = self.scorer.score(queries, &parameters);
        debug_assert!(
            report.metrics.is_normalized(),
            "scorer metrics must be in [0, 1]"
        );

        let timestamp = Utc::now();
        let record = EvaluationRecord {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            timestamp,
            metrics: report.metrics,
            queries: report.results,
        };

        let base_id = format!("eval_{}", timestamp.format("%Y%m%d_%H%M%S"));
        let data = serde_json::to_vec_pretty(&record)
            .map_err(|e| RegistryError::Internal(e.to_string()))?;

        // Ids have one-second resolution; later runs in the same second get a suffix.
        let mut attempt = 1u32;
        let id = loop {
            let candidate = if attempt == 1 {
                base_id.clone()
            } else {
                format!("{base_id}_{attempt}")
            };
            attempt += 1;

            let detail_path = self.detail_path(&candidate);
            if detail_path.exists() || self.index.contains(&candidate)? {
                continue;
            }

            std::fs::write(&detail_path, &data)?;

            let summary = EvaluationSummary {
                name: record.name.clone(),
                timestamp,
                metrics: record.metrics,
                num_queries: record.queries.len(),
                file_path: detail_path.to_string_lossy().to_string(),
            };
            if self.index.insert_new(&candidate, summary)? {
                break candidate;
            }
        };

        tracing::info!(eval_id = %id, queries = record.queries.len(), "Saved evaluation");
        Ok((id, record))
    }

    pub fn list(&self) -> Result<BTreeMap<String, EvaluationSummary>, RegistryError> {
        Ok(self.index.load()?)
    }

    /// Full record of one run. A summary whose detail file is gone counts as not found.
    pub fn get(&self, id: &str) -> Result<EvaluationRecord, RegistryError> {
        let summary = self
            .index
            .get(id)?
            .ok_or_else(|| RegistryError::NotFound(format!("Evaluation not found: {id}")))?;

        let data = match std::fs::read(&summary.file_path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::NotFound(format!(
                    "Evaluation details not found: {id}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data).map_err(|e| RegistryError::Storage(e.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let summary = self
            .index
            .get(id)?
            .ok_or_else(|| RegistryError::NotFound(format!("Evaluation not found: {id}")))?;

        match std::fs::remove_file(&summary.file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.index.remove(id)?;

        tracing::info!(eval_id = %id, "Deleted evaluation");
        Ok(())
    }

    fn detail_path(&self, id: &str) -> PathBuf {
        self.detail_dir.join(format!("{id}.json"))
    }
}
