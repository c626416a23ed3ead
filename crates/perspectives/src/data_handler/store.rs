// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::data_handler::common::{DatasetMetadata, Result};
use crate::data_handler::dataframe::DataFrame;
use crate::data_handler::io::CsvReader;
use crate::data_handler::transformation::DatasetSource;
use crate::error::DataError;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{debug, info};
/// Length, modification time and content digest of a file on disk. A table
/// is reread only when this changes; the digest catches same-length rewrites
/// that land within the filesystem's mtime granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFingerprint {
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub digest: [u8; 32],
}
impl FileFingerprint {
    pub fn of(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|_| DataError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let contents = std::fs::read(path)?;
        Ok(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
            digest: *blake3::hash(&contents).as_bytes(),
        })
    }
}
#[derive(Debug, Clone)]
struct StoredDataset {
    frame: Arc<DataFrame>,
    fingerprint: Option<FileFingerprint>,
}
/// Named, shared, read-only tables for one session.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    datasets: Arc<RwLock<HashMap<String, StoredDataset>>>,
    csv_reader: CsvReader,
}
impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_reader(mut self, csv_reader: CsvReader) -> Self {
        self.csv_reader = csv_reader;
        self
    }
    /// Returns the cached table for `name` while the file is unchanged,
    /// otherwise reads it again and applies the column renames.
    pub fn load_file(
        &self,
        name: &str,
        path: &Path,
        renames: &BTreeMap<String, String>,
    ) -> Result<Arc<DataFrame>> {
        let fingerprint = FileFingerprint::of(path)?;
        {
            let datasets = self
                .datasets
                .read()
                .map_err(|_| DataError::ThreadSafety("Failed to acquire read lock".to_string()))?;
            if let Some(stored) = datasets.get(name) {
                if stored.fingerprint == Some(fingerprint) {
                    debug!(dataset = name, "Dataset unchanged on disk");
                    return Ok(Arc::clone(&stored.frame));
                }
            }
        }
        let mut frame = self.csv_reader.read_file(path, name)?;
        for (from, to) in renames {
            if frame.has_column(from) {
                frame = frame.rename_column(from, to)?;
            }
        }
        frame.metadata.name = name.to_string();
        frame.metadata.source_path = Some(path.to_path_buf());
        let frame = Arc::new(frame);
        info!(
            dataset = name,
            path = %path.display(),
            rows = frame.row_count(),
            columns = frame.column_count(),
            "Loaded dataset"
        );
        let mut datasets = self
            .datasets
            .write()
            .map_err(|_| DataError::ThreadSafety("Failed to acquire write lock".to_string()))?;
        datasets.insert(
            name.to_string(),
            StoredDataset {
                frame: Arc::clone(&frame),
                fingerprint: Some(fingerprint),
            },
        );
        Ok(frame)
    }
    /// Registers an in-memory table; it is never reloaded.
    pub fn insert(&self, name: &str, frame: DataFrame) -> Result<Arc<DataFrame>> {
        let frame = Arc::new(frame);
        let mut datasets = self
            .datasets
            .write()
            .map_err(|_| DataError::ThreadSafety("Failed to acquire write lock".to_string()))?;
        datasets.insert(
            name.to_string(),
            StoredDataset {
                frame: Arc::clone(&frame),
                fingerprint: None,
            },
        );
        Ok(frame)
    }
    pub fn get(&self, name: &str) -> Result<Option<Arc<DataFrame>>> {
        let datasets = self
            .datasets
            .read()
            .map_err(|_| DataError::ThreadSafety("Failed to acquire read lock".to_string()))?;
        Ok(datasets.get(name).map(|stored| Arc::clone(&stored.frame)))
    }
    pub fn list(&self) -> Result<Vec<DatasetMetadata>> {
        let datasets = self
            .datasets
            .read()
            .map_err(|_| DataError::ThreadSafety("Failed to acquire read lock".to_string()))?;
        let mut listed: Vec<DatasetMetadata> = datasets
            .values()
            .map(|stored| stored.frame.metadata.clone())
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }
    pub fn clear(&self) -> Result<()> {
        let mut datasets = self
            .datasets
            .write()
            .map_err(|_| DataError::ThreadSafety("Failed to acquire write lock".to_string()))?;
        datasets.clear();
        Ok(())
    }
}
impl DatasetSource for DatasetStore {
    fn dataset(&self, name: &str) -> Result<Arc<DataFrame>> {
        self.get(name)?.ok_or_else(|| DataError::UnknownDataset {
            name: name.to_string(),
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handler::column::ColumnData;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn unchanged_file_is_served_from_cache() {
        let file = csv_file("Country,pop\nA,1\n");
        let store = DatasetStore::new();
        let renames = BTreeMap::from([("Country".to_string(), "country".to_string())]);
        let first = store.load_file("world_population", file.path(), &renames).unwrap();
        let second = store.load_file("world_population", file.path(), &renames).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.column_names(), ["country", "pop"]);
        assert_eq!(first.name(), "world_population");
    }

    #[test]
    fn rename_on_load_never_overwrites_a_column() {
        let file = csv_file("Country,country,pop\nBrazil,brazil-lower,1\n");
        let store = DatasetStore::new();
        let renames = BTreeMap::from([("Country".to_string(), "country".to_string())]);
        let err = store.load_file("world_population", file.path(), &renames).unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn { column } if column == "country"));
        assert!(store.get("world_population").unwrap().is_none());
    }

    #[test]
    fn changed_file_is_reloaded() {
        let mut file = csv_file("country,kg\nA,5\n");
        let store = DatasetStore::new();
        let first = store.load_file("coffee", file.path(), &BTreeMap::new()).unwrap();
        file.write_all(b"B,9\n").unwrap();
        file.flush().unwrap();
        let second = store.load_file("coffee", file.path(), &BTreeMap::new()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.row_count(), 2);
    }

    #[test]
    fn same_length_rewrite_with_same_mtime_is_reloaded() {
        let file = csv_file("country,kg\nA,5\n");
        let store = DatasetStore::new();
        let first = store.load_file("coffee", file.path(), &BTreeMap::new()).unwrap();
        let modified = std::fs::metadata(file.path()).unwrap().modified().unwrap();
        std::fs::write(file.path(), "country,kg\nB,9\n").unwrap();
        std::fs::File::options()
            .write(true)
            .open(file.path())
            .unwrap()
            .set_modified(modified)
            .unwrap();
        let second = store.load_file("coffee", file.path(), &BTreeMap::new()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.column("country").unwrap().get_string(0).as_deref(), Some("B"));
    }

    #[test]
    fn unknown_dataset_is_an_error() {
        let store = DatasetStore::new();
        assert!(matches!(
            store.dataset("nope"),
            Err(DataError::UnknownDataset { .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let store = DatasetStore::new();
        let err = store
            .load_file("gone", Path::new("no/such/file.csv"), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, DataError::FileNotFound { .. }));
    }
}
