use std::path::{Path, PathBuf};

use crate::error::{GalleryError, Result};

/// The ordered list of selected image paths, kept as a JSON array of strings.
pub struct PathStore {
    path: PathBuf,
}

impl PathStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted list. A missing or malformed store yields an empty list.
    pub fn load(&self) -> Vec<PathBuf> {
        match self.try_load() {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!("{}; starting with an empty gallery", e);
                Vec::new()
            }
        }
    }

    pub fn try_load(&self) -> Result<Vec<PathBuf>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(GalleryError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let paths: Vec<String> =
            serde_json::from_slice(&data).map_err(|source| GalleryError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(paths.into_iter().map(PathBuf::from).collect())
    }

    /// Overwrite the store with `paths`. Writes a sibling temp file and renames it
    /// into place so a crash never leaves a half-written list behind.
    pub fn save(&self, paths: &[PathBuf]) -> Result<()> {
        let io_err = |source| GalleryError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let list: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let json = serde_json::to_vec(&list).map_err(|source| GalleryError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        log::debug!("Saved {} paths to {}", paths.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fresh, empty directory under the system temp dir, unique per call.
    pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "picgrid-{}-{}-{}",
            tag,
            std::process::id(),
            n
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_store_loads_empty() {
        let store = PathStore::new(scratch_dir("missing").join("image_paths.json"));
        assert!(store.try_load().unwrap().is_empty());
        assert!(store.load().is_empty());
    }

    #[test]
    fn round_trip_is_stable() {
        let dir = scratch_dir("roundtrip");
        let store = PathStore::new(dir.join("image_paths.json"));
        let paths = vec![
            PathBuf::from("/photos/a.png"),
            PathBuf::from("relative/b.jpg"),
            PathBuf::from("/photos/a.png"),
        ];
        store.save(&paths).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        store.save(&store.load()).unwrap();
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        assert_eq!(store.load(), paths);
    }

    #[test]
    fn empty_list_round_trips() {
        let store = PathStore::new(scratch_dir("empty").join("image_paths.json"));
        store.save(&[]).unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
        store.save(&store.load()).unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test]
    fn writes_plain_json_array() {
        let store = PathStore::new(scratch_dir("format").join("image_paths.json"));
        store
            .save(&[PathBuf::from("path1"), PathBuf::from("path2")])
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            r#"["path1","path2"]"#
        );
    }

    #[test]
    fn malformed_store_defaults_to_empty() {
        let store = PathStore::new(scratch_dir("malformed").join("image_paths.json"));
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.try_load(), Err(GalleryError::Parse { .. })));
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_creates_parent_directory() {
        let store = PathStore::new(scratch_dir("nested").join("a").join("b").join("list.json"));
        store.save(&[PathBuf::from("x.png")]).unwrap();
        assert_eq!(store.load(), vec![PathBuf::from("x.png")]);
    }
}
