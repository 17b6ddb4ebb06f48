//! Declaration-keyed caches shared by one analysis run.
//!
//! The caches are plain values owned by the caller. Dropping or [clearing](Memo::clear) them
//! between independent runs is the caller's responsibility.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    jvm::{
        declaration::{Declaration, MethodDeclaration},
        references::{ClassRef, MemberRef, MethodRef, PackageRef},
    },
    nullness::resolution::Resolution,
};

use super::parameter_types::ParameterTypeResolver;

/// A memoizing map that computes the value of each key at most once.
///
/// Computation happens while holding the write lock, so concurrent requests for a missing key
/// wait for the first one instead of computing the value again.
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Memo<K, V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // The operations on `self.entries` do not panic while holding the lock, except for the
    // user-provided computation, which runs before the map is modified.
    // Therefore, it is safe to take the lock even if it is poisoned.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V>> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Checks whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes all the entries.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Removes the entries for which `keep` returns `false`.
    pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) {
        self.write().retain(|key, value| keep(key, value));
    }
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Returns the cached value of `key`, computing it with `compute` if absent.
    pub fn get_or_compute(&self, key: &K, compute: impl FnOnce() -> V) -> V {
        self.get_or_refresh(key, |_| true, compute)
    }

    /// Returns the cached value of `key` if `is_fresh` accepts it.
    /// Otherwise, computes a new value with `compute` and caches it.
    pub fn get_or_refresh(
        &self,
        key: &K,
        is_fresh: impl Fn(&V) -> bool,
        compute: impl FnOnce() -> V,
    ) -> V {
        if let Some(value) = self.read().get(key).filter(|it| is_fresh(it)) {
            return value.clone();
        }
        let mut entries = self.write();
        // Another thread may have computed the value before we get the write lock.
        if let Some(value) = entries.get(key).filter(|it| is_fresh(it)) {
            return value.clone();
        }
        let value = compute();
        entries.insert(key.clone(), value.clone());
        value
    }

    /// Removes the entry of `key`. Returns whether there was one.
    pub fn invalidate(&self, key: &K) -> bool {
        self.write().remove(key).is_some()
    }
}

/// A resolver together with the signature it was built from.
#[derive(Debug, Clone)]
struct CachedResolver {
    signature: Option<String>,
    resolver: Arc<ParameterTypeResolver>,
}

/// Caches the [`ParameterTypeResolver`] of each method.
///
/// An entry is rebuilt when the signature of its method changes. The descriptor is part of
/// the method identity.
#[derive(Debug, Default)]
pub struct ParameterTypeCache {
    memo: Memo<MethodRef, CachedResolver>,
}

impl ParameterTypeCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resolver for the method, building it on first use.
    /// A signature that cannot be used is ignored in favor of the erased descriptor, see
    /// [`ParameterTypeResolver::for_declaration_or_erased`].
    pub fn resolver_of(&self, declaration: &MethodDeclaration) -> Arc<ParameterTypeResolver> {
        let cached = self.memo.get_or_refresh(
            &declaration.method,
            |cached| cached.signature == declaration.signature,
            || CachedResolver {
                signature: declaration.signature.clone(),
                resolver: Arc::new(ParameterTypeResolver::for_declaration_or_erased(
                    declaration,
                )),
            },
        );
        cached.resolver
    }

    /// Drops the entry of `method`. Returns whether there was one.
    pub fn invalidate(&self, method: &MethodRef) -> bool {
        self.memo.invalidate(method)
    }

    /// Removes all the entries.
    pub fn clear(&self) {
        self.memo.clear();
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    /// Checks whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

/// A resolved nullness together with the declaration it was computed from.
#[derive(Debug, Clone)]
struct CachedResolution {
    declaration: Arc<Declaration>,
    resolution: Arc<Resolution>,
}

/// Caches the [`Resolution`] of each member.
///
/// An entry is recomputed when the metadata of its declaration changes.
/// Changes to class or package annotations must be announced with
/// [`NullnessCache::invalidate_class`] or [`NullnessCache::invalidate_package`].
#[derive(Debug, Default)]
pub struct NullnessCache {
    memo: Memo<MemberRef, CachedResolution>,
}

impl NullnessCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached resolution of `declaration`, computing it with `compute` if absent
    /// or computed from different metadata.
    pub fn get_or_resolve(
        &self,
        declaration: &Declaration,
        compute: impl FnOnce() -> Resolution,
    ) -> Arc<Resolution> {
        let cached = self.memo.get_or_refresh(
            &declaration.make_ref(),
            |cached| cached.declaration.as_ref() == declaration,
            || CachedResolution {
                declaration: Arc::new(declaration.clone()),
                resolution: Arc::new(compute()),
            },
        );
        cached.resolution
    }

    /// Drops the entries of the members of `class`.
    pub fn invalidate_class(&self, class: &ClassRef) {
        self.memo.retain(|member, _| member.owner() != class);
    }

    /// Drops the entries of the members of the classes in `package`.
    pub fn invalidate_package(&self, package: &PackageRef) {
        self.memo
            .retain(|member, _| &member.owner().package() != package);
    }

    /// Drops the entry of `member`.
    pub fn invalidate(&self, member: &MemberRef) -> bool {
        self.memo.invalidate(member)
    }

    /// Removes all the entries.
    pub fn clear(&self) {
        self.memo.clear();
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    /// Checks whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rayon::prelude::*;

    use super::*;
    use crate::types::{
        field_type::{FieldType, PrimitiveType},
        signatures::Wildcard,
    };

    #[test]
    fn computes_once() {
        let memo = Memo::new();
        let counter = AtomicUsize::new(0);
        for _ in 0..10 {
            let value = memo.get_or_compute(&"key", || {
                counter.fetch_add(1, Ordering::SeqCst);
                42
            });
            assert_eq!(value, 42);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn computes_once_under_contention() {
        let memo = Memo::new();
        let counter = AtomicUsize::new(0);
        (0..256).into_par_iter().for_each(|i| {
            let value = memo.get_or_compute(&(i % 4), || {
                counter.fetch_add(1, Ordering::SeqCst);
                i % 4
            });
            assert_eq!(value, i % 4);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn refreshes_stale_values() {
        let memo = Memo::new();
        assert_eq!(memo.get_or_compute(&1, || "old"), "old");
        assert_eq!(memo.get_or_refresh(&1, |it| *it == "new", || "new"), "new");
        assert_eq!(memo.get_or_compute(&1, || "newer"), "new");
    }

    #[test]
    fn invalidation() {
        let memo = Memo::new();
        memo.get_or_compute(&"a", || 1);
        memo.get_or_compute(&"b", || 2);
        assert!(memo.invalidate(&"a"));
        assert!(!memo.invalidate(&"a"));
        memo.retain(|_, value| *value != 2);
        assert!(memo.is_empty());
    }

    #[test]
    fn parameter_type_cache_builds_once() {
        let cache = ParameterTypeCache::new();
        let declaration = MethodDeclaration::new("Foo", "bar", "(Ljava/util/Set;)V")
            .unwrap()
            .with_signature("(Ljava/util/Set<TT;>;)V");
        let first = cache.resolver_of(&declaration);
        let second = cache.resolver_of(&declaration);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.resolve(0).unwrap().type_arguments.len(), 1);
    }

    #[test]
    fn parameter_type_cache_follows_signature_changes() {
        let cache = ParameterTypeCache::new();
        let exact = MethodDeclaration::new("Foo", "bar", "(Ljava/util/Set;)V")
            .unwrap()
            .with_signature("(Ljava/util/Set<Ljava/lang/String;>;)V");
        let before = cache.resolver_of(&exact);
        assert_eq!(
            before.resolve(0).unwrap().type_arguments[0].wildcard(),
            Wildcard::Exact
        );

        let unbounded = exact.clone().with_signature("(Ljava/util/Set<*>;)V");
        let after = cache.resolver_of(&unbounded);
        assert_eq!(
            after.resolve(0).unwrap().type_arguments[0].wildcard(),
            Wildcard::Unbounded
        );
        assert_eq!(cache.len(), 1);

        let erased = MethodDeclaration {
            signature: None,
            ..unbounded
        };
        assert!(cache.resolver_of(&erased).signature().is_none());
        assert!(cache.invalidate(&erased.method));
        assert!(cache.is_empty());
    }

    #[test]
    fn parameter_type_cache_falls_back_to_descriptor() {
        let cache = ParameterTypeCache::new();
        let declaration = MethodDeclaration::new("Foo", "bar", "(Ljava/util/Set;I)V")
            .unwrap()
            .with_signature("(Ljava/util/Set<Ljava/lang/Object;)V");
        let resolver = cache.resolver_of(&declaration);
        assert!(resolver.signature().is_none());
        assert_eq!(resolver.parameter_count(), 2);
        assert_eq!(
            resolver.resolve(1).unwrap().base_type,
            FieldType::Base(PrimitiveType::Int)
        );
        assert!(Arc::ptr_eq(&resolver, &cache.resolver_of(&declaration)));
    }
}
