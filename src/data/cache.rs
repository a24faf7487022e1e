use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Identity of a source file at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStamp {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl SourceStamp {
    /// `None` when the file cannot be inspected (e.g. it does not exist).
    pub fn of(path: &Path) -> Option<SourceStamp> {
        let meta = std::fs::metadata(path).ok()?;
        Some(SourceStamp {
            path: path.to_path_buf(),
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// Memoizes the result of loading one file, keyed by its [`SourceStamp`].
#[derive(Debug)]
pub struct Memo<T> {
    entry: Option<(SourceStamp, Arc<T>)>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<T> Memo<T> {
    /// Return the cached value if `path` is unchanged since it was loaded,
    /// otherwise run `load` and cache its result. Errors are not cached.
    pub fn get_or_load<E, F>(&mut self, path: &Path, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(&Path) -> Result<T, E>,
    {
        let stamp = SourceStamp::of(path);
        if let (Some(stamp), Some((cached, value))) = (&stamp, &self.entry) {
            if stamp == cached {
                log::debug!("Cache hit for {}", path.display());
                return Ok(Arc::clone(value));
            }
        }

        let value = Arc::new(load(path)?);
        self.entry = stamp.map(|s| (s, Arc::clone(&value)));
        Ok(value)
    }

    /// Drop the cached value so the next call reloads.
    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }
}
