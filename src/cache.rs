//! Time-bounded memoization of unwrap results.
//!
//! [`ResultCache`] maps a fingerprint of (geometry, parameters) to the UVs and
//! metrics an unwrap produced. Entries expire once they have not been read
//! for the cache's time-to-live. Expired entries are purged lazily on every
//! [`get`](ResultCache::get); there is no background thread.
//!
//! Time comes from a [`Clock`], so tests can drive expiry with a
//! [`ManualClock`] instead of sleeping.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use uvwrap::cache::{GeometrySignature, ManualClock, ResultCache};
//! # use uvwrap::algo::metrics::MetricResult;
//! # use uvwrap::engine::UnwrapParameters;
//! # use uvwrap::mesh::{Mesh, UVMap};
//! # use nalgebra::{Point2, Point3};
//! # let mesh = Mesh::new(
//! #     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
//! #     vec![[0, 1, 2]],
//! # ).unwrap();
//! # let uvs = UVMap::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)]);
//! # let metrics = MetricResult { stretch: 1.0, coverage: 0.5, angle_distortion: 0.0, num_islands: 1 };
//!
//! let clock = Arc::new(ManualClock::new());
//! let cache = ResultCache::with_clock(Duration::from_secs(300), clock.clone());
//! let signature = GeometrySignature::from_mesh(&mesh);
//! let params = UnwrapParameters::default();
//!
//! cache.put(&signature, &params, uvs, metrics);
//! assert!(cache.get(&signature, &params).is_some());
//!
//! clock.advance(Duration::from_secs(301));
//! assert!(cache.get(&signature, &params).is_none());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::algo::metrics::MetricResult;
use crate::engine::UnwrapParameters;
use crate::mesh::{Mesh, UVMap};

/// Default time-to-live for cache entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Source of monotonic time for cache expiry.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Summary of a mesh used in cache fingerprints.
///
/// Two meshes with the same vertex count but different triangles or
/// different seams produce different signatures. [`from_mesh`](Self::from_mesh)
/// also hashes vertex positions, so moving vertices changes the signature;
/// [`with_seams`](Self::with_seams) alone is topology-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeometrySignature {
    pub num_vertices: usize,
    pub num_triangles: usize,
    pub num_edges: usize,
    pub num_seams: usize,
    /// Hex SHA-256 of the triangle index buffer.
    pub topology_digest: String,
    /// Hex SHA-256 of the sorted, normalized seam edge set.
    pub seam_digest: String,
    /// Hex SHA-256 of the position bit patterns, if positions are keyed.
    pub position_digest: Option<String>,
}

impl GeometrySignature {
    /// Signature over the mesh's positions, with the mesh boundary (edges
    /// used by one triangle) as the seam set.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let mut uses: HashMap<[usize; 2], usize> = HashMap::new();
        for t in mesh.triangles() {
            for k in 0..3 {
                *uses.entry(normalize_edge([t[k], t[(k + 1) % 3]])).or_default() += 1;
            }
        }
        let boundary: Vec<[usize; 2]> = uses
            .into_iter()
            .filter(|&(_, n)| n == 1)
            .map(|(e, _)| e)
            .collect();
        Self::with_seams(mesh, &boundary).with_positions(mesh)
    }

    /// Signature with an explicit seam set.
    ///
    /// Edge direction and order do not matter; duplicates count once.
    pub fn with_seams(mesh: &Mesh, seams: &[[usize; 2]]) -> Self {
        let mut seam_set: Vec<[usize; 2]> = seams
            .iter()
            .map(|&e| normalize_edge(e))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        seam_set.sort_unstable();

        let mut topology = Sha256::new();
        for t in mesh.triangles() {
            for &v in t {
                topology.update((v as u64).to_le_bytes());
            }
        }

        let mut seam_hash = Sha256::new();
        for [a, b] in &seam_set {
            seam_hash.update((*a as u64).to_le_bytes());
            seam_hash.update((*b as u64).to_le_bytes());
        }

        Self {
            num_vertices: mesh.num_vertices(),
            num_triangles: mesh.num_triangles(),
            num_edges: mesh.unique_edges().len(),
            num_seams: seam_set.len(),
            topology_digest: hex::encode(topology.finalize()),
            seam_digest: hex::encode(seam_hash.finalize()),
            position_digest: None,
        }
    }

    /// Add the exact bits of `mesh`'s vertex positions to the signature.
    pub fn with_positions(mut self, mesh: &Mesh) -> Self {
        let mut hasher = Sha256::new();
        for p in mesh.positions() {
            for c in p.iter() {
                hasher.update(c.to_bits().to_le_bytes());
            }
        }
        self.position_digest = Some(hex::encode(hasher.finalize()));
        self
    }
}

fn normalize_edge([a, b]: [usize; 2]) -> [usize; 2] {
    if a <= b {
        [a, b]
    } else {
        [b, a]
    }
}

/// Cache key for a (geometry, parameters) pair.
///
/// Every parameter field enters by its exact bit pattern, so any change to
/// any field changes the key.
pub(crate) fn fingerprint(signature: &GeometrySignature, params: &UnwrapParameters) -> String {
    let mut hasher = Sha256::new();
    for count in [
        signature.num_vertices,
        signature.num_triangles,
        signature.num_edges,
        signature.num_seams,
    ] {
        hasher.update((count as u64).to_le_bytes());
    }
    hasher.update(signature.topology_digest.as_bytes());
    hasher.update(signature.seam_digest.as_bytes());
    match &signature.position_digest {
        Some(digest) => {
            hasher.update([1u8]);
            hasher.update(digest.as_bytes());
        }
        None => hasher.update([0u8]),
    }

    hasher.update(params.angle_threshold.to_bits().to_le_bytes());
    hasher.update((params.min_island_faces as u64).to_le_bytes());
    hasher.update([params.pack_islands as u8]);
    hasher.update(params.island_margin.to_bits().to_le_bytes());

    hex::encode(hasher.finalize())
}

/// A cached unwrap result. Returned by value; the cache keeps its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedUnwrap {
    pub uvs: UVMap,
    pub metrics: MetricResult,
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedUnwrap,
    last_access: Duration,
}

/// Thread-safe, time-bounded result cache.
pub struct ResultCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    /// Cache with the default TTL on the system clock.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Cache with a custom TTL on the system clock.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock::new())
    }

    /// Cache with a custom TTL and clock.
    pub fn with_clock(ttl: Duration, clock: impl Clock + 'static) -> Self {
        Self {
            ttl,
            clock: Arc::new(clock),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide cache instance.
    pub fn global() -> &'static ResultCache {
        static GLOBAL: OnceLock<ResultCache> = OnceLock::new();
        GLOBAL.get_or_init(ResultCache::new)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a result, purging expired entries first.
    ///
    /// A hit refreshes the entry's last-access time.
    pub fn get(
        &self,
        signature: &GeometrySignature,
        params: &UnwrapParameters,
    ) -> Option<CachedUnwrap> {
        let key = fingerprint(signature, params);
        let now = self.clock.now();

        let mut entries = self.entries.lock();
        Self::purge_locked(&mut entries, now, self.ttl);

        let entry = entries.get_mut(&key)?;
        entry.last_access = now;
        log::debug!("cache hit {}", &key[..12]);
        Some(entry.value.clone())
    }

    /// Store a result, replacing any existing entry for the same key.
    pub fn put(
        &self,
        signature: &GeometrySignature,
        params: &UnwrapParameters,
        uvs: UVMap,
        metrics: MetricResult,
    ) {
        let key = fingerprint(signature, params);
        let entry = CacheEntry {
            value: CachedUnwrap { uvs, metrics },
            last_access: self.clock.now(),
        };
        self.entries.lock().insert(key, entry);
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        Self::purge_locked(&mut self.entries.lock(), now, self.ttl)
    }

    fn purge_locked(entries: &mut HashMap<String, CacheEntry>, now: Duration, ttl: Duration) -> usize {
        let before = entries.len();
        entries.retain(|_, e| now.saturating_sub(e.last_access) <= ttl);
        before - entries.len()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
