//! Session-scoped mapping between internal ids and OIDs.
//!
//! OIDs are derived by hashing the encoded id, so the same id usually gets the
//! same OID across restarts, but that's not guaranteed: collisions are
//! resolved by whichever id was seen first. OIDs must never be persisted.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::errors::Result;
use crate::internal::InternalId;
use crate::registry::{Operation, OperationArgs};
use crate::section::Section;
use crate::typed::parse_raw_oid;

/// Highest OID reserved for builtins. Dynamically assigned OIDs are always
/// above this.
pub const BUILTIN_OID_CEILING: u32 = 65535;

/// Number of salted hash attempts (salts `0..SALT_ATTEMPTS`) before falling
/// back to a linear scan.
pub const SALT_ATTEMPTS: u8 = 255;

/// Hash used to derive candidate OIDs.
pub trait OidHasher: Sync + Send {
    fn hash(&self, data: &[u8]) -> u32;
}

/// CRC-32C (Castagnoli).
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32c;

impl OidHasher for Crc32c {
    fn hash(&self, data: &[u8]) -> u32 {
        crc32c::crc32c(data)
    }
}

type IdMap<K, V> = HashMap<K, V, ahash::RandomState>;

#[derive(Debug, Default)]
struct CacheState {
    oids: IdMap<InternalId, u32>,
    ids: IdMap<u32, InternalId>,
}

impl CacheState {
    fn is_free(&self, oid: u32) -> bool {
        oid > BUILTIN_OID_CEILING && !self.ids.contains_key(&oid)
    }
}

/// Bidirectional id <-> OID map.
///
/// Entries are never removed. A fresh cache should be constructed per process,
/// with builtins inserted before it's shared.
pub struct IdentityCache<H = Crc32c> {
    hasher: H,
    state: RwLock<CacheState>,
}

impl IdentityCache<Crc32c> {
    pub fn new() -> Self {
        Self::with_hasher(Crc32c)
    }

    /// Create a cache with the given builtins registered.
    pub fn with_builtins(entries: impl IntoIterator<Item = (InternalId, u32)>) -> Self {
        let cache = Self::new();
        for (id, oid) in entries {
            cache.register_builtin(id, oid);
        }
        cache
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let entries = config.builtin_entries()?;
        debug!(builtins = entries.len(), "creating identity cache");
        Ok(Self::with_builtins(entries))
    }
}

impl Default for IdentityCache<Crc32c> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: OidHasher> IdentityCache<H> {
    pub fn with_hasher(hasher: H) -> Self {
        IdentityCache {
            hasher,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Insert an id with a fixed OID.
    ///
    /// Only for use during initialization.
    ///
    /// # Panics
    ///
    /// Panics if the OID is above the builtin ceiling, or if either the id or
    /// the OID is already registered to something else.
    pub fn register_builtin(&self, id: InternalId, oid: u32) {
        if oid > BUILTIN_OID_CEILING {
            panic!("builtin {id} has oid {oid} above the builtin ceiling");
        }

        let mut state = self.state.write();
        if let Some(existing) = state.ids.get(&oid) {
            if existing != &id {
                panic!("builtin oid {oid} already assigned to {existing}, cannot assign to {id}");
            }
        }
        if let Some(existing) = state.oids.get(&id) {
            if *existing != oid {
                panic!("builtin {id} already has oid {existing}, cannot assign {oid}");
            }
        }

        state.oids.insert(id.clone(), oid);
        state.ids.insert(oid, id);
    }

    /// Get the OID for an id, assigning one if needed.
    ///
    /// Raw OID ids return their embedded value and aren't cached. The null id
    /// returns 0.
    pub fn to_oid(&self, id: &InternalId) -> u32 {
        if let Some(&oid) = self.state.read().oids.get(id) {
            return oid;
        }

        match id.section() {
            Section::Null => return 0,
            Section::Oid => {
                return match parse_raw_oid(id) {
                    Some(oid) => oid,
                    None => {
                        warn!(%id, "raw oid id does not contain a valid oid");
                        0
                    }
                };
            }
            _ => (),
        }

        let mut state = self.state.write();
        // May have been assigned between releasing the read lock and taking
        // the write lock.
        if let Some(&oid) = state.oids.get(id) {
            return oid;
        }

        let oid = self.next_free_oid(&state, id.as_bytes());
        trace!(%id, %oid, "assigned oid");

        state.oids.insert(id.clone(), oid);
        state.ids.insert(oid, id.clone());

        oid
    }

    /// Find an unused OID for the given id bytes.
    ///
    /// Tries the plain hash, then the hash of the data prefixed with each salt
    /// byte, then scans down from `u32::MAX`.
    fn next_free_oid(&self, state: &CacheState, data: &[u8]) -> u32 {
        let candidate = self.hasher.hash(data);
        if state.is_free(candidate) {
            return candidate;
        }

        let mut salted = Vec::with_capacity(data.len() + 1);
        salted.push(0);
        salted.extend_from_slice(data);

        for salt in 0..SALT_ATTEMPTS {
            salted[0] = salt;
            let candidate = self.hasher.hash(&salted);
            if state.is_free(candidate) {
                debug!(%salt, %candidate, "resolved oid collision using salt");
                return candidate;
            }
        }

        warn!("exhausted salted oid candidates, scanning for a free oid");

        match (BUILTIN_OID_CEILING + 1..=u32::MAX)
            .rev()
            .find(|&oid| state.is_free(oid))
        {
            Some(oid) => oid,
            None => panic!("oid space exhausted"),
        }
    }

    /// Get the id for an OID, or the null id if it was never assigned.
    pub fn to_internal(&self, oid: u32) -> InternalId {
        self.state
            .read()
            .ids
            .get(&oid)
            .cloned()
            .unwrap_or(InternalId::NULL)
    }

    /// Whether this id has been assigned an OID, or is a builtin.
    ///
    /// This only checks the cache. It says nothing about whether the object
    /// exists in the catalog.
    pub fn exists(&self, id: &InternalId) -> bool {
        self.state.read().oids.contains_key(id)
    }

    /// Move the OID assigned to `old` over to `new`.
    ///
    /// Used when an object's id changes but it's still the same object (a
    /// rename), so clients holding the OID keep pointing at it. No-op if `old`
    /// isn't cached or is a builtin, or if `new` is null or a raw OID id.
    pub fn update(&self, old: &InternalId, new: InternalId) {
        if old == &new {
            return;
        }
        if !new.is_valid() || new.section() == Section::Oid {
            debug!(%old, %new, "not repointing oid onto an uncacheable id");
            return;
        }

        let mut state = self.state.write();
        let Some(&oid) = state.oids.get(old) else {
            return;
        };
        if oid <= BUILTIN_OID_CEILING {
            debug!(%old, %new, "not repointing builtin oid");
            return;
        }
        if let Some(&existing) = state.oids.get(&new) {
            if existing <= BUILTIN_OID_CEILING {
                warn!(%old, %new, "cannot repoint oid onto a builtin id");
                return;
            }
            // Drop the stale reverse entry so the maps stay one-to-one.
            state.ids.remove(&existing);
        }

        debug!(%old, %new, %oid, "repointing oid");

        state.oids.remove(old);
        state.oids.insert(new.clone(), oid);
        state.ids.insert(oid, new);
    }

    /// Number of cached entries, builtins included.
    pub fn len(&self) -> usize {
        self.state.read().oids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H> fmt::Debug for IdentityCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCache")
            .field("entries", &self.state.read().oids.len())
            .finish_non_exhaustive()
    }
}

/// Performer that keeps OIDs stable across renames.
///
/// Register for every section whose objects may be renamed.
pub fn repoint_on_rename<H>(
    cache: Arc<IdentityCache<H>>,
) -> impl Fn(&OperationArgs<'_>) -> Result<()> + Sync + Send + 'static
where
    H: OidHasher + 'static,
{
    move |args: &OperationArgs<'_>| {
        if args.operation == Operation::Rename {
            cache.update(args.original, args.new.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::builtin::builtin_entries;
    use crate::typed::{NamespaceId, OidId, TableId, TypeId};

    /// Every input hashes to the same value.
    struct ConstantHasher(u32);

    impl OidHasher for ConstantHasher {
        fn hash(&self, _data: &[u8]) -> u32 {
            self.0
        }
    }

    /// Unsalted input (exactly `unsalted_len` bytes) collides with a builtin.
    /// Salted input maps to `0x1_0000 + salt`, using only the leading salt byte.
    struct SaltOnlyHasher {
        unsalted_len: usize,
    }

    impl OidHasher for SaltOnlyHasher {
        fn hash(&self, data: &[u8]) -> u32 {
            if data.len() == self.unsalted_len {
                return 11;
            }
            0x1_0000 + data[0] as u32
        }
    }

    fn table(name: &str) -> InternalId {
        TableId::new("public", name).into_internal()
    }

    #[test]
    fn idempotent() {
        logutil::init_test();

        let cache = IdentityCache::new();
        let id = table("orders");

        let oid = cache.to_oid(&id);
        assert!(oid > BUILTIN_OID_CEILING);
        assert_eq!(oid, cache.to_oid(&id));
        assert_eq!(id, cache.to_internal(oid));
        assert!(cache.exists(&id));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn uses_crc32c_of_encoded_bytes() {
        let cache = IdentityCache::new();
        let id = table("orders");

        let expected = crc32c::crc32c(id.as_bytes());
        // Holds as long as the hash doesn't land in the builtin range.
        assert!(expected > BUILTIN_OID_CEILING);
        assert_eq!(expected, cache.to_oid(&id));
    }

    #[test]
    fn unknown_oid_is_null() {
        let cache = IdentityCache::new();
        assert_eq!(InternalId::NULL, cache.to_internal(123456));
        assert!(!cache.exists(&table("missing")));
    }

    #[test]
    fn null_id_is_zero() {
        let cache = IdentityCache::new();
        assert_eq!(0, cache.to_oid(&InternalId::NULL));
        assert!(cache.is_empty());
    }

    #[test]
    fn raw_oid_passthrough() {
        let cache = IdentityCache::new();
        let id = OidId::new(42).into_internal();

        assert_eq!(42, cache.to_oid(&id));
        assert!(!cache.exists(&id));
        assert!(cache.is_empty());

        // Large values pass through too, even above the ceiling.
        assert_eq!(4_000_000_000, cache.to_oid(&OidId::new(4_000_000_000).into_internal()));
        assert!(cache.is_empty());

        let bad = InternalId::new(Section::Oid, &["forty-two"]);
        assert_eq!(0, cache.to_oid(&bad));
    }

    #[test]
    fn builtins() {
        let cache = IdentityCache::with_builtins(builtin_entries());
        let pg_catalog = NamespaceId::new("pg_catalog").into_internal();
        let int4 = TypeId::new("pg_catalog", "int4").into_internal();

        assert_eq!(11, cache.to_oid(&pg_catalog));
        assert_eq!(23, cache.to_oid(&int4));
        assert_eq!(int4, cache.to_internal(23));
        assert!(cache.exists(&pg_catalog));
    }

    #[test]
    #[should_panic(expected = "above the builtin ceiling")]
    fn builtin_above_ceiling_panics() {
        let cache = IdentityCache::new();
        cache.register_builtin(table("nope"), BUILTIN_OID_CEILING + 1);
    }

    #[test]
    #[should_panic(expected = "already assigned")]
    fn builtin_duplicate_oid_panics() {
        let cache = IdentityCache::new();
        cache.register_builtin(table("a"), 100);
        cache.register_builtin(table("b"), 100);
    }

    #[test]
    fn forced_collisions_scan_down() {
        logutil::init_test();

        // Every hash lands inside the builtin range, so salted attempts fail
        // and the linear scan takes over.
        let cache = IdentityCache::with_hasher(ConstantHasher(7));
        let mut seen = HashSet::new();

        for idx in 0..300 {
            let id = table(&format!("t{idx}"));
            let oid = cache.to_oid(&id);
            assert!(oid > BUILTIN_OID_CEILING);
            assert!(seen.insert(oid), "duplicate oid {oid}");
            assert_eq!(u32::MAX - idx, oid);
        }

        for idx in 0..300 {
            let id = table(&format!("t{idx}"));
            assert_eq!(u32::MAX - idx, cache.to_oid(&id));
            assert_eq!(id, cache.to_internal(u32::MAX - idx));
        }
    }

    #[test]
    fn forced_collisions_above_ceiling() {
        // Constant hash above the ceiling: first id takes it, everyone else
        // falls through to the scan.
        let cache = IdentityCache::with_hasher(ConstantHasher(100_000));
        let first = cache.to_oid(&table("a"));
        let second = cache.to_oid(&table("b"));
        let third = cache.to_oid(&table("c"));

        assert_eq!(100_000, first);
        assert_eq!(u32::MAX, second);
        assert_eq!(u32::MAX - 1, third);
    }

    #[test]
    fn salt_is_part_of_hash_input() {
        let cache = IdentityCache::with_hasher(SaltOnlyHasher {
            unsalted_len: table("a").len(),
        });
        // Unsalted hash is 11 (builtin range), salt 0 gives 0x1_0000.
        assert_eq!(0x1_0000, cache.to_oid(&table("a")));
        // Salt 0 now taken, salt 1 is next.
        assert_eq!(0x1_0001, cache.to_oid(&table("b")));
        assert_eq!(0x1_0002, cache.to_oid(&table("c")));
    }

    #[test]
    fn update_preserves_oid() {
        let cache = IdentityCache::new();
        let old = table("orders");
        let new = table("orders_v2");

        let oid = cache.to_oid(&old);
        cache.update(&old, new.clone());

        assert_eq!(oid, cache.to_oid(&new));
        assert_eq!(new, cache.to_internal(oid));
        assert!(!cache.exists(&old));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn update_uncached_is_noop() {
        let cache = IdentityCache::new();
        cache.update(&table("a"), table("b"));
        assert!(cache.is_empty());
    }

    #[test]
    fn update_replaces_existing_target() {
        let cache = IdentityCache::new();
        let a = table("a");
        let b = table("b");
        let oid_a = cache.to_oid(&a);
        let oid_b = cache.to_oid(&b);

        cache.update(&a, b.clone());

        assert_eq!(oid_a, cache.to_oid(&b));
        assert_eq!(InternalId::NULL, cache.to_internal(oid_b));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn update_skips_builtins() {
        let cache = IdentityCache::with_builtins(builtin_entries());
        let public = NamespaceId::new("public").into_internal();
        let renamed = NamespaceId::new("public2").into_internal();

        cache.update(&public, renamed.clone());
        assert_eq!(2200, cache.to_oid(&public));
        assert!(!cache.exists(&renamed));
    }

    #[test]
    fn update_onto_uncacheable_is_noop() {
        let cache = IdentityCache::new();
        let id = table("orders");
        let oid = cache.to_oid(&id);

        cache.update(&id, InternalId::NULL);
        assert_eq!(0, cache.to_oid(&InternalId::NULL));
        assert_eq!(id, cache.to_internal(oid));

        let raw = OidId::new(70000).into_internal();
        cache.update(&id, raw.clone());
        assert_eq!(70000, cache.to_oid(&raw));
        assert_eq!(oid, cache.to_oid(&id));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn from_config_registers_builtins() {
        let cache = IdentityCache::from_config(&CacheConfig::default()).unwrap();
        assert_eq!(builtin_entries().count(), cache.len());

        let empty = CacheConfig {
            system_builtins: false,
            extra_builtins: Vec::new(),
        };
        assert!(IdentityCache::from_config(&empty).unwrap().is_empty());
    }
}
