//! Per-type snapshot pools.
//!
//! Recording leases one snapshot per recorder per frame and eviction hands
//! it back, so at steady state every lease is served from the free list.
//! A [`PoolRegistry`] owns exactly one [`SnapshotPool`] per snapshot type,
//! created lazily on first use and sized from the clock's capacity
//! prediction at that moment.
//!
//! Leased snapshots keep whatever values they held when they were released.
//! Callers must fully overwrite a leased snapshot before reading it.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// SnapshotPool
// ---------------------------------------------------------------------------

/// A free list of reusable snapshot values of one type.
pub struct SnapshotPool<S> {
    free: Vec<S>,
    factory: fn() -> S,
    /// Total instances ever constructed by this pool.
    created: usize,
}

impl<S: Default> SnapshotPool<S> {
    /// Create a pool that constructs new instances with `S::default`.
    pub fn new(capacity_hint: usize) -> Self {
        Self::with_factory(capacity_hint, S::default)
    }
}

impl<S> SnapshotPool<S> {
    /// Create a pool that constructs new instances with `factory`.
    pub fn with_factory(capacity_hint: usize, factory: fn() -> S) -> Self {
        Self {
            free: Vec::with_capacity(capacity_hint),
            factory,
            created: 0,
        }
    }

    /// Take an instance from the free list, or construct one if it is empty.
    pub fn lease(&mut self) -> S {
        match self.free.pop() {
            Some(snapshot) => snapshot,
            None => {
                self.created += 1;
                (self.factory)()
            }
        }
    }

    /// Return an instance to the free list.
    pub fn release(&mut self, snapshot: S) {
        self.free.push(snapshot);
    }

    /// Instances sitting in the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Instances constructed over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Instances currently held by recorders.
    pub fn outstanding(&self) -> usize {
        self.created.saturating_sub(self.free.len())
    }

    /// Replace the constructor used when the free list is empty.
    pub fn set_factory(&mut self, factory: fn() -> S) {
        self.factory = factory;
    }

    /// Drop every free instance. Outstanding instances are unaffected and
    /// may still be released back later.
    pub fn clear(&mut self) {
        self.created = self.created.saturating_sub(self.free.len());
        self.free.clear();
    }
}

// ---------------------------------------------------------------------------
// PoolStats
// ---------------------------------------------------------------------------

/// Usage counters for one snapshot type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub snapshot_type: &'static str,
    pub created: usize,
    pub available: usize,
}

// ---------------------------------------------------------------------------
// Type erasure
// ---------------------------------------------------------------------------

trait ErasedPool: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn stats(&self) -> PoolStats;
    fn clear(&mut self);
}

impl<S: 'static> ErasedPool for SnapshotPool<S> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            snapshot_type: std::any::type_name::<S>(),
            created: self.created,
            available: self.free.len(),
        }
    }

    fn clear(&mut self) {
        SnapshotPool::clear(self);
    }
}

// ---------------------------------------------------------------------------
// PoolRegistry
// ---------------------------------------------------------------------------

/// Owns one [`SnapshotPool`] per snapshot type.
///
/// Pools are keyed by [`TypeId`] and created on first access. The capacity
/// hint only affects pools created after it is set; existing pools are never
/// resized retroactively.
pub struct PoolRegistry {
    pools: HashMap<TypeId, Box<dyn ErasedPool>>,
    capacity_hint: usize,
}

impl PoolRegistry {
    pub fn new(capacity_hint: usize) -> Self {
        Self {
            pools: HashMap::new(),
            capacity_hint,
        }
    }

    /// The pool for `S`, creating it with `S::default` as factory if needed.
    pub fn pool_mut<S: Default + 'static>(&mut self) -> &mut SnapshotPool<S> {
        let hint = self.capacity_hint;
        self.pools
            .entry(TypeId::of::<S>())
            .or_insert_with(|| Box::new(SnapshotPool::<S>::new(hint)))
            .as_any_mut()
            .downcast_mut::<SnapshotPool<S>>()
            .expect("pool registry entry keyed by TypeId holds a pool of that type")
    }

    /// The pool for `S`, if one has been created.
    pub fn pool<S: 'static>(&self) -> Option<&SnapshotPool<S>> {
        self.pools
            .get(&TypeId::of::<S>())
            .and_then(|pool| pool.as_any().downcast_ref::<SnapshotPool<S>>())
    }

    /// Register a custom constructor for `S`.
    pub fn register_factory<S: Default + 'static>(&mut self, factory: fn() -> S) {
        self.pool_mut::<S>().set_factory(factory);
    }

    /// Lease a snapshot of type `S`.
    pub fn lease<S: Default + 'static>(&mut self) -> S {
        self.pool_mut::<S>().lease()
    }

    /// Return a snapshot of type `S` to its pool.
    pub fn release<S: Default + 'static>(&mut self, snapshot: S) {
        self.pool_mut::<S>().release(snapshot);
    }

    /// Free instances of `S`, zero if no pool exists yet.
    pub fn available<S: 'static>(&self) -> usize {
        self.pool::<S>().map_or(0, SnapshotPool::available)
    }

    pub fn capacity_hint(&self) -> usize {
        self.capacity_hint
    }

    /// Set the sizing hint used for pools created from now on.
    pub fn set_capacity_hint(&mut self, hint: usize) {
        self.capacity_hint = hint;
    }

    /// Counters for every pool, sorted by snapshot type name.
    pub fn stats(&self) -> Vec<PoolStats> {
        let mut stats: Vec<PoolStats> = self.pools.values().map(|pool| pool.stats()).collect();
        stats.sort_by(|a, b| a.snapshot_type.cmp(b.snapshot_type));
        stats
    }

    /// Drop all free instances in every pool.
    pub fn clear(&mut self) {
        for pool in self.pools.values_mut() {
            pool.clear();
        }
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn lease_constructs_when_empty_and_reuses_after_release() {
        let mut pool = SnapshotPool::<Sample>::new(4);
        let mut a = pool.lease();
        assert_eq!(pool.created(), 1);
        a.value = 9;
        pool.release(a);
        assert_eq!(pool.available(), 1);

        let b = pool.lease();
        assert_eq!(pool.created(), 1, "second lease must reuse the instance");
        // Released content is not cleared.
        assert_eq!(b.value, 9);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn custom_factory_is_used_for_new_instances() {
        let mut pool = SnapshotPool::with_factory(0, || Sample { value: 42 });
        assert_eq!(pool.lease().value, 42);
    }

    #[test]
    fn registry_keeps_one_pool_per_type() {
        let mut pools = PoolRegistry::new(8);
        let s: Sample = pools.lease();
        let flag: bool = pools.lease();
        pools.release(s);
        pools.release(flag);
        assert_eq!(pools.available::<Sample>(), 1);
        assert_eq!(pools.available::<bool>(), 1);
        assert_eq!(pools.stats().len(), 2);
    }

    #[test]
    fn registry_factory_applies_to_lazily_created_pool() {
        let mut pools = PoolRegistry::default();
        pools.register_factory(|| Sample { value: 7 });
        assert_eq!(pools.lease::<Sample>().value, 7);
    }

    #[test]
    fn capacity_hint_does_not_resize_existing_pools() {
        let mut pools = PoolRegistry::new(2);
        pools.pool_mut::<Sample>();
        pools.set_capacity_hint(1000);
        assert_eq!(pools.capacity_hint(), 1000);
        assert!(pools.pool::<Sample>().unwrap().free.capacity() < 1000);
    }

    #[test]
    fn clear_drops_free_instances_only() {
        let mut pools = PoolRegistry::default();
        let a: Sample = pools.lease();
        let b: Sample = pools.lease();
        pools.release(a);
        pools.clear();
        assert_eq!(pools.available::<Sample>(), 0);
        pools.release(b);
        assert_eq!(pools.available::<Sample>(), 1);
    }
}
