use crate::error::AppError;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub const BADGES_KEY: &str = "skill_badges";
pub const POINTS_KEY: &str = "points_history";

pub fn attempts_key(skill_id: &str) -> String {
    format!("assessment_attempts_{}", skill_id)
}

/// JSON documents stored under string keys.
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when nothing has been stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, AppError>;
    fn write(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// One file per key in `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_file_stem(key)))
    }
}

/// Maps a key to a file stem. Bytes outside `[A-Za-z0-9_-]` are written as
/// `%XX`, so distinct keys never share a file.
fn encode_file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir)?;
        // Write to a sibling file, then rename over the target.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Lives only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::IoError(std::io::Error::other("memory store poisoned")))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::IoError(std::io::Error::other("memory store poisoned")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("data"));

        assert!(store.read(BADGES_KEY).unwrap().is_none());
        store.write(BADGES_KEY, "[]").unwrap();
        assert_eq!(store.read(BADGES_KEY).unwrap().as_deref(), Some("[]"));

        store.write(BADGES_KEY, "[1]").unwrap();
        assert_eq!(store.read(BADGES_KEY).unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());

        let key = attempts_key("../etc/passwd");
        store.write(&key, "[]").unwrap();
        let expected = temp_dir
            .path()
            .join("assessment_attempts_%2E%2E%2Fetc%2Fpasswd.json");
        assert!(expected.exists());
        assert_eq!(store.read(&key).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_similar_keys_get_separate_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());

        let keys = ["c.sharp", "c_sharp", "c%2Esharp", "c sharp", "c#"].map(attempts_key);
        for (i, key) in keys.iter().enumerate() {
            store.write(key, &i.to_string()).unwrap();
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(store.read(key).unwrap(), Some(i.to_string()));
        }
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), keys.len());
    }

    #[test]
    fn test_encode_file_stem() {
        assert_eq!(encode_file_stem("skill_badges"), "skill_badges");
        assert_eq!(encode_file_stem("a-b_c9"), "a-b_c9");
        assert_eq!(encode_file_stem("c++"), "c%2B%2B");
        assert_eq!(encode_file_stem("%"), "%25");
        assert_eq!(encode_file_stem("é"), "%C3%A9");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.read("k").unwrap().is_none());
        store.write("k", "v").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_attempts_key_is_skill_scoped() {
        assert_eq!(attempts_key("sql"), "assessment_attempts_sql");
        assert_ne!(attempts_key("a"), attempts_key("b"));
    }
}
