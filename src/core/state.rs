//! Synthesis-lock management — load, save (atomic), path derivation.

use super::types::SynthLock;
use std::path::{Path, PathBuf};

/// Derive the lock file path for a site within the state directory.
pub fn lock_file_path(state_dir: &Path, site: &str) -> PathBuf {
    state_dir.join(site).join("synth.lock.yaml")
}

/// Load a lock file for a site. Returns None if the file doesn't exist.
pub fn load_lock(state_dir: &Path, site: &str) -> Result<Option<SynthLock>, String> {
    let path = lock_file_path(state_dir, site);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let lock: SynthLock = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("invalid lock file {}: {}", path.display(), e))?;
    Ok(Some(lock))
}

/// Save a lock file atomically (write to temp, then rename).
pub fn save_lock(state_dir: &Path, lock: &SynthLock) -> Result<(), String> {
    let path = lock_file_path(state_dir, &lock.site);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create dir {}: {}", parent.display(), e))?;
    }

    let yaml =
        serde_yaml_ng::to_string(lock).map_err(|e| format!("serialize error: {}", e))?;

    // Atomic write: temp file + rename
    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml)
        .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| {
        format!(
            "cannot rename {} -> {}: {}",
            tmp_path.display(),
            path.display(),
            e
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Environment, ResourceEntry, StackLock};
    use indexmap::IndexMap;

    fn make_lock() -> SynthLock {
        let mut resources = IndexMap::new();
        resources.insert(
            "ContentTable".to_string(),
            ResourceEntry {
                resource_type: "AWS::DynamoDB::Table".to_string(),
                hash: "blake3:abc123".to_string(),
            },
        );
        let mut stacks = IndexMap::new();
        stacks.insert(
            "core".to_string(),
            StackLock {
                template_hash: "blake3:def456".to_string(),
                resources,
            },
        );
        SynthLock {
            schema: "1.0".to_string(),
            site: "jane-doe".to_string(),
            environment: Environment::Production,
            generated_at: "2026-08-01T12:00:00Z".to_string(),
            generator: "portico 0.4.2".to_string(),
            stacks,
        }
    }

    #[test]
    fn test_lock_file_path() {
        let p = lock_file_path(Path::new("/state"), "jane-doe");
        assert_eq!(p, PathBuf::from("/state/jane-doe/synth.lock.yaml"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let lock = make_lock();
        save_lock(dir.path(), &lock).unwrap();

        let loaded = load_lock(dir.path(), "jane-doe").unwrap().unwrap();
        assert_eq!(loaded.site, "jane-doe");
        assert_eq!(loaded.stacks.len(), 1);
        assert_eq!(
            loaded.stacks["core"].resources["ContentTable"].hash,
            "blake3:abc123"
        );
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_lock(dir.path(), "ghost").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_atomic_write_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let lock = make_lock();
        save_lock(dir.path(), &lock).unwrap();

        let tmp = dir.path().join("jane-doe").join("synth.lock.yaml.tmp");
        assert!(!tmp.exists());
        assert!(lock_file_path(dir.path(), "jane-doe").exists());
    }

    #[test]
    fn test_roundtrip_preserves_stack_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = make_lock();
        lock.stacks.insert(
            "aaa-later".to_string(),
            StackLock {
                template_hash: "blake3:xyz".to_string(),
                resources: IndexMap::new(),
            },
        );
        save_lock(dir.path(), &lock).unwrap();
        let loaded = load_lock(dir.path(), "jane-doe").unwrap().unwrap();
        let keys: Vec<_> = loaded.stacks.keys().collect();
        assert_eq!(keys, vec!["core", "aaa-later"]);
    }
}
