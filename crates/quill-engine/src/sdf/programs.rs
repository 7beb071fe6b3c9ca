use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::SdfError;

/// Identity of a compiled stage program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKey {
    SeedCompute,
    SeedFragment,
    FloodCompute,
    FloodFragment,
    EncodeCompute,
    EncodeFragment,
    Polygon,
    /// Unit quad shared by the fragment-backend passes.
    Quad,
}

impl StageKey {
    pub fn name(self) -> &'static str {
        match self {
            Self::SeedCompute => "seed/compute",
            Self::SeedFragment => "seed/fragment",
            Self::FloodCompute => "flood/compute",
            Self::FloodFragment => "flood/fragment",
            Self::EncodeCompute => "encode/compute",
            Self::EncodeFragment => "encode/fragment",
            Self::Polygon => "polygon",
            Self::Quad => "quad",
        }
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Lazily-built stage programs, keyed by stage.
///
/// The first caller for a key builds the program while holding the lock, so a
/// program is compiled at most once even with concurrent strokes.
#[derive(Default)]
pub struct ProgramCache {
    entries: Mutex<HashMap<StageKey, Entry>>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the program for `key`, building it with `build` on first use.
    pub fn get_or_try_init<T, F>(&self, key: StageKey, build: F) -> Result<Arc<T>, SdfError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, SdfError>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(entry) = entries.get(&key) {
            return Arc::clone(entry)
                .downcast::<T>()
                .map_err(|_| SdfError::pipeline(format!("program {} has an unexpected type", key.name())));
        }

        log::debug!("building stage program {}", key.name());
        let program = Arc::new(build()?);
        entries.insert(key, Arc::clone(&program) as Entry);
        Ok(program)
    }

    pub fn contains(&self, key: StageKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached program.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_once_per_key() {
        let cache = ProgramCache::new();
        let mut builds = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_try_init(StageKey::SeedCompute, || {
                    builds += 1;
                    Ok(42u32)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(builds, 1);
        assert!(cache.contains(StageKey::SeedCompute));
        assert!(!cache.contains(StageKey::Polygon));
    }

    #[test]
    fn failed_build_is_not_cached() {
        let cache = ProgramCache::new();
        let err = cache.get_or_try_init::<u32, _>(StageKey::Polygon, || Err(SdfError::pipeline("boom")));
        assert!(err.is_err());
        assert!(cache.is_empty());
        assert!(cache.get_or_try_init(StageKey::Polygon, || Ok(1u8)).is_ok());
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let cache = ProgramCache::new();
        cache.get_or_try_init(StageKey::Quad, || Ok(1u8)).unwrap();
        assert!(cache.get_or_try_init(StageKey::Quad, || Ok(1u16)).is_err());
    }

    #[test]
    fn clear_forgets_programs() {
        let cache = ProgramCache::new();
        cache.get_or_try_init(StageKey::FloodCompute, || Ok(())).unwrap();
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
