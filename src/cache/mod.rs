//! Point cache owned by the host process.
//!
//! Loaded point sets are shared as `Arc<[Point]>` so concurrent
//! aggregations can read them without copying. Entries live until they are
//! explicitly invalidated or the cache is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::models::Point;

/// Cache of loaded point sets keyed by source path.
#[derive(Debug, Default)]
pub struct PointCache {
    entries: HashMap<PathBuf, Arc<[Point]>>,
}

impl PointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached points for `path`, running `loader` on a miss.
    ///
    /// A failed load leaves the cache untouched.
    pub fn get_or_load<F, E>(&mut self, path: &Path, loader: F) -> Result<Arc<[Point]>, E>
    where
        F: FnOnce(&Path) -> Result<Vec<Point>, E>,
    {
        if let Some(points) = self.entries.get(path) {
            debug!("Point cache hit: {}", path.display());
            return Ok(Arc::clone(points));
        }

        debug!("Point cache miss: {}", path.display());
        let points: Arc<[Point]> = loader(path)?.into();
        self.entries.insert(path.to_path_buf(), Arc::clone(&points));
        Ok(points)
    }

    /// Cached points for `path`, if any.
    pub fn get(&self, path: &Path) -> Option<Arc<[Point]>> {
        self.entries.get(path).cloned()
    }

    /// Drop the entry for `path`. Returns whether one was present.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn two_points(_: &Path) -> Result<Vec<Point>, String> {
        Ok(vec![Point::new(1, 0.0, 0.0), Point::new(2, 1.0, 1.0)])
    }

    #[test]
    fn test_loader_runs_once_per_path() {
        let mut cache = PointCache::new();
        let calls = Cell::new(0);
        let path = Path::new("points.json");

        for _ in 0..3 {
            let points = cache
                .get_or_load(path, |p| {
                    calls.set(calls.get() + 1);
                    two_points(p)
                })
                .unwrap();
            assert_eq!(points.len(), 2);
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hits_share_the_same_allocation() {
        let mut cache = PointCache::new();
        let path = Path::new("points.json");

        let first = cache.get_or_load(path, two_points).unwrap();
        let second = cache.get_or_load(path, two_points).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let mut cache = PointCache::new();
        let path = Path::new("points.json");
        cache.get_or_load(path, two_points).unwrap();

        assert!(cache.invalidate(path));
        assert!(!cache.invalidate(path));
        assert!(!cache.contains(path));

        let reloaded = cache
            .get_or_load(path, |_| Ok::<_, String>(vec![Point::new(9, 5.0, 5.0)]))
            .unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let mut cache = PointCache::new();
        let path = Path::new("broken.json");

        let err = cache
            .get_or_load(path, |_| Err::<Vec<Point>, _>("boom".to_string()))
            .unwrap_err();

        assert_eq!(err, "boom");
        assert!(cache.is_empty());
        assert!(cache.get(path).is_none());
    }

    #[test]
    fn test_clear() {
        let mut cache = PointCache::new();
        cache.get_or_load(Path::new("a.json"), two_points).unwrap();
        cache.get_or_load(Path::new("b.json"), two_points).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
