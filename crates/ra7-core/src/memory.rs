//! Action memory: every evaluated action, kept as a JSON array on disk.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::types::ActionRecord;

pub struct ActionMemory {
    pub path: PathBuf,
    pub records: Vec<ActionRecord>,
}

fn read_records(path: &Path) -> Result<Vec<ActionRecord>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read memory: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse memory: {}", path.display()))
}

impl ActionMemory {
    /// Open the memory file, loading existing records if present.
    /// An unreadable file leaves the in-memory view empty; it is never
    /// overwritten by a later `append`.
    pub fn open(path: &Path) -> Self {
        let records = match read_records(path) {
            Ok(records) => {
                info!("Loaded {} action records", records.len());
                records
            }
            Err(e) => {
                error!("{:#}", e);
                Vec::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            records,
        }
    }

    /// Re-read the file, append a record and rewrite it. Fails without
    /// touching the file if the current contents cannot be parsed.
    pub fn append(&mut self, record: ActionRecord) -> Result<()> {
        let mut records = read_records(&self.path)?;
        records.push(record);
        self.save(&records)?;
        self.records = records;
        Ok(())
    }

    fn save(&self, records: &[ActionRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write memory: {}", self.path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn recent(&self, n: usize) -> &[ActionRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(action: &str, score: f64) -> ActionRecord {
        ActionRecord {
            action: action.into(),
            score,
            geohash: "0.0000,0.0000".into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_append_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let mut mem = ActionMemory::open(&path);
        assert!(mem.is_empty());
        mem.append(record("first", 0.9)).unwrap();
        mem.append(record("second", 0.99)).unwrap();

        let reopened = ActionMemory::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.records[1].action, "second");
    }

    #[test]
    fn test_file_is_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        ActionMemory::open(&path).append(record("x", 1.0)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["geohash"], "0.0000,0.0000");
    }

    #[test]
    fn test_corrupt_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let damaged = r#"[{"action":"old","score":0.9,"geohash":"0.0000,0.0000","timestamp":"t"}, oops"#;
        std::fs::write(&path, damaged).unwrap();

        let mut mem = ActionMemory::open(&path);
        assert!(mem.is_empty());
        assert!(mem.append(record("new", 1.0)).is_err());
        assert!(mem.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), damaged);
    }

    #[test]
    fn test_append_keeps_records_written_by_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let mut first = ActionMemory::open(&path);
        let mut second = ActionMemory::open(&path);
        first.append(record("from first", 0.9)).unwrap();
        second.append(record("from second", 0.8)).unwrap();

        let actions: Vec<String> = ActionMemory::open(&path)
            .records
            .into_iter()
            .map(|r| r.action)
            .collect();
        assert_eq!(actions, vec!["from first", "from second"]);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_recent() {
        let dir = tempfile::tempdir().unwrap();
        let mut mem = ActionMemory::open(&dir.path().join("m.json"));
        for i in 0..5 {
            mem.append(record(&format!("a{}", i), 0.5)).unwrap();
        }
        let recent: Vec<&str> = mem.recent(2).iter().map(|r| r.action.as_str()).collect();
        assert_eq!(recent, vec!["a3", "a4"]);
        assert_eq!(mem.recent(10).len(), 5);
    }
}
