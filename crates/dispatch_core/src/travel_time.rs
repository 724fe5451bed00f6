//! Travel-time oracle consumed by schedules.
//!
//! The road network and its shortest paths live outside this crate; the host
//! simulation plugs in its own [TravelTime]. Two stock implementations are provided:
//!
//! - **StraightLineTravelTime**: Euclidean distance at constant speed
//! - **CachedTravelTime**: LRU memoization in front of any other oracle

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::model::{Vertex, VertexId};

/// Duration in seconds of the fastest drive between two vertices.
///
/// Called for every leg of every evaluated insertion, so implementations should be
/// an in-memory lookup or cheap computation.
pub trait TravelTime: Send + Sync {
    fn duration(&self, from: &Vertex, to: &Vertex) -> u64;
}

/// Straight-line distance divided by a constant speed, rounded up to whole seconds.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineTravelTime {
    speed_mps: f64,
}

impl StraightLineTravelTime {
    pub fn new(speed_mps: f64) -> Self {
        debug_assert!(speed_mps > 0.0, "speed must be positive");
        Self { speed_mps }
    }

    /// 30 km/h, a typical urban average.
    pub fn urban() -> Self {
        Self::new(30.0 / 3.6)
    }
}

impl TravelTime for StraightLineTravelTime {
    fn duration(&self, from: &Vertex, to: &Vertex) -> u64 {
        if from.same_place(to) {
            return 0;
        }
        (from.point.distance(&to.point) / self.speed_mps).ceil() as u64
    }
}

/// Memoizes another oracle by vertex-id pair.
///
/// Only worth it when the inner oracle is expensive (e.g. a network router).
pub struct CachedTravelTime<T> {
    inner: T,
    cache: Mutex<LruCache<(VertexId, VertexId), u64>>,
}

impl<T: TravelTime> CachedTravelTime<T> {
    pub fn new(inner: T, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().map_or(0, |cache| cache.len())
    }
}

impl<T: TravelTime> TravelTime for CachedTravelTime<T> {
    fn duration(&self, from: &Vertex, to: &Vertex) -> u64 {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(_) => return self.inner.duration(from, to), // poisoned: skip the cache
        };
        *cache.get_or_insert((from.id, to.id), || self.inner.duration(from, to))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting {
        calls: AtomicUsize,
    }

    impl TravelTime for Counting {
        fn duration(&self, from: &Vertex, to: &Vertex) -> u64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            from.point.distance(&to.point) as u64
        }
    }

    #[test]
    fn straight_line_rounds_up() {
        let oracle = StraightLineTravelTime::new(10.0);
        let a = Vertex::new(1, 0.0, 0.0);
        let b = Vertex::new(2, 0.0, 101.0);
        assert_eq!(oracle.duration(&a, &b), 11);
        assert_eq!(oracle.duration(&a, &a), 0);
    }

    #[test]
    fn cache_hits_skip_inner_oracle() {
        let cache = CachedTravelTime::new(
            Counting {
                calls: AtomicUsize::new(0),
            },
            NonZeroUsize::new(8).expect("non-zero"),
        );
        let a = Vertex::new(1, 0.0, 0.0);
        let b = Vertex::new(2, 30.0, 40.0);
        assert_eq!(cache.duration(&a, &b), 50);
        assert_eq!(cache.duration(&a, &b), 50);
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached_entries(), 1);
    }
}
