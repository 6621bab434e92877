//! Local model discovery.

use proto::{DiscoveryError, LaunchTarget};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extensions treated as model files, compared case-insensitively.
pub const MODEL_EXTENSIONS: [&str; 4] = ["gguf", "ggml", "bin", "model"];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A model file found in the models directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalModel {
    pub name: String,
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

impl LocalModel {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / BYTES_PER_MB
    }

    pub fn launch_target(&self) -> LaunchTarget {
        LaunchTarget::Local {
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }
}

/// Lists model files directly inside `dir`, sorted by name.
pub fn discover_models(dir: &Path) -> Result<Vec<LocalModel>, DiscoveryError> {
    info!(directory = %dir.display(), "Discovering models");
    let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut models = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read directory entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !is_model_file(&path) {
            continue;
        }
        // Follows symlinks so linked model files are listed with the target's size.
        let metadata = match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                warn!(file = %path.display(), "Failed to get file info: {e}");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        debug!(name = %name, size = metadata.len(), "Found model");
        models.push(LocalModel {
            name,
            path,
            size: metadata.len(),
        });
    }

    models.sort_by(|a, b| a.name.cmp(&b.name));
    info!(count = models.len(), "Discovered models");
    Ok(models)
}

fn is_model_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MODEL_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, bytes: usize) {
        std::fs::write(dir.join(name), vec![0u8; bytes]).expect("write fixture");
    }

    #[test]
    fn keeps_only_model_extensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "a.gguf", 1);
        touch(dir.path(), "b.ggml", 1);
        touch(dir.path(), "c.bin", 1);
        touch(dir.path(), "d.txt", 1);

        let models = discover_models(dir.path()).expect("discover");
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a.gguf", "b.ggml", "c.bin"]);
    }

    #[test]
    fn extension_match_ignores_case_and_skips_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "Big.GGUF", 2048);
        touch(dir.path(), "tokenizer.Model", 1);
        std::fs::create_dir(dir.path().join("nested.gguf")).expect("mkdir");
        touch(dir.path(), "README", 1);

        let models = discover_models(dir.path()).expect("discover");
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "Big.GGUF");
        assert_eq!(models[0].size, 2048);
        assert_eq!(models[0].path, dir.path().join("Big.GGUF"));
        assert_eq!(models[1].name, "tokenizer.Model");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_model_files_are_listed() {
        let store = tempfile::tempdir().expect("tempdir");
        touch(store.path(), "real.gguf", 4096);
        let dir = tempfile::tempdir().expect("tempdir");
        std::os::unix::fs::symlink(store.path().join("real.gguf"), dir.path().join("link.gguf"))
            .expect("symlink");
        std::os::unix::fs::symlink(store.path().join("gone.gguf"), dir.path().join("dangling.gguf"))
            .expect("symlink");

        let models = discover_models(dir.path()).expect("discover");
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "link.gguf");
        assert_eq!(models[0].size, 4096);
        assert_eq!(models[0].path, dir.path().join("link.gguf"));
    }

    #[test]
    fn empty_directory_yields_empty_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(discover_models(dir.path()).expect("discover").is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let err = discover_models(&missing).expect_err("missing dir");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn local_model_reports_megabytes_and_target() {
        let model = LocalModel {
            name: "m.gguf".to_string(),
            path: PathBuf::from("/models/m.gguf"),
            size: 3 * 1024 * 1024,
        };
        assert!((model.size_mb() - 3.0).abs() < f64::EPSILON);
        assert_eq!(model.launch_target().label(), "m.gguf");
    }
}
