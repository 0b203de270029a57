//! Utilities for the deploy scripts.

use std::{fs, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::ExportError;

/// Writes `contents` to `path`, creating parent directories as needed and
/// replacing any existing file
pub fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    let write_err = |e: std::io::Error| ExportError::Write { path: path.to_path_buf(), reason: e.to_string() };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    fs::write(path, contents).map_err(write_err)
}

/// Reads the file at `path` into a string
pub fn read_file(path: &Path) -> Result<String, ExportError> {
    fs::read_to_string(path).map_err(|e| ExportError::Read { path: path.to_path_buf(), reason: e.to_string() })
}

/// Serializes `value` as pretty-printed JSON into `path`
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ExportError::Serde(e.to_string()))?;
    write_file(path, &json)
}

/// Deserializes the JSON file at `path`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ExportError> {
    let contents = read_file(path)?;
    serde_json::from_str(&contents).map_err(|e| ExportError::Serde(format!("{}: {e}", path.display())))
}

/// The current time as milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    // Clamp pre-epoch clocks to zero rather than wrapping
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{read_json, write_json};

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write_json(&path, &vec![1u64, 2, 3]).unwrap();
        let back: Vec<u64> = read_json(&path).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
