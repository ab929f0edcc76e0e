use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use super::RegistryError;

const PREFIX: &str = "testset_";
const EXTENSION: &str = ".csv";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const HEADER: [&str; 4] = ["index", "question", "reference", "retrieved_context"];

/// A generated testset CSV on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestsetFile {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Directory of generated testset CSV files named `testset_YYYYMMDD_HHMMSS.csv`.
pub struct TestsetStore {
    dir: PathBuf,
}

impl TestsetStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, RegistryError> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// Write a testset with `count` placeholder rows. Rows carry their index in every
    /// column; no question generation happens here.
    pub fn generate(&self, count: usize) -> Result<TestsetFile, RegistryError> {
        let now = Utc::now();
        let stamp = now.format(TIMESTAMP_FORMAT).to_string();

        let mut attempt = 1u32;
        let (name, path) = loop {
            let name = if attempt == 1 {
                format!("{PREFIX}{stamp}{EXTENSION}")
            } else {
                format!("{PREFIX}{stamp}_{attempt}{EXTENSION}")
            };
            let path = self.dir.join(&name);
            if !path.exists() {
                break (name, path);
            }
            attempt += 1;
        };

        let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
        writer.write_record(HEADER).map_err(csv_error)?;
        for i in 0..count {
            let cell = i.to_string();
            writer
                .write_record([&cell, &cell, &cell, &cell])
                .map_err(csv_error)?;
        }
        writer.flush()?;

        let size_bytes = std::fs::metadata(&path)?.len();
        tracing::info!(testset = %name, rows = count, "Generated testset");

        Ok(TestsetFile {
            name,
            created_at: now,
            size_bytes,
        })
    }

    /// All testset files, newest first.
    pub fn list(&self) -> Result<Vec<TestsetFile>, RegistryError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(created_at) = parse_testset_name(&name) else {
                continue;
            };
            files.push(TestsetFile {
                name,
                created_at,
                size_bytes: entry.metadata()?.len(),
            });
        }

        files.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(files)
    }

    /// Contents of one testset. Names that are not testset filenames are never opened.
    pub fn read(&self, name: &str) -> Result<Bytes, RegistryError> {
        if parse_testset_name(name).is_none() {
            return Err(RegistryError::NotFound(format!("Testset not found: {name}")));
        }

        match std::fs::read(self.dir.join(name)) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RegistryError::NotFound(format!("Testset not found: {name}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Creation time encoded in a testset filename, or `None` if `name` is not one.
fn parse_testset_name(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_prefix(PREFIX)?.strip_suffix(EXTENSION)?;
    if stem.len() < 15 || !stem.is_char_boundary(15) {
        return None;
    }
    let (stamp, suffix) = stem.split_at(15);

    if !suffix.is_empty() {
        let digits = suffix.strip_prefix('_')?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn csv_error(e: csv::Error) -> RegistryError {
    RegistryError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_testset_name() {
        let parsed = parse_testset_name("testset_20250301_142530.csv").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-01T14:25:30+00:00");

        assert!(parse_testset_name("testset_20250301_142530_2.csv").is_some());
        assert!(parse_testset_name("testset_20250301_142530_.csv").is_none());
        assert!(parse_testset_name("testset_2025.csv").is_none());
        assert!(parse_testset_name("report.csv").is_none());
        assert!(parse_testset_name("../testset_20250301_142530.csv").is_none());
        assert!(parse_testset_name("testset_20251301_142530.csv").is_none());
    }
}
