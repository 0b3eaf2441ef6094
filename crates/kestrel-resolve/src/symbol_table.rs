//! Flat symbol table with O(1) scope rollback.
//!
//! Declarations are appended to one contiguous list of entries; an
//! open-addressing index maps each key to the entry currently visible for
//! it. Every entry remembers the entry it shadowed (`prev`), so closing a
//! scope walks the entries it appended in reverse, restores the shadowed
//! bindings and truncates the list. Nothing here knows about access
//! specifiers or duplicates: `declare` always succeeds and always shadows.
//!
//! Keys are interned [`Name`] handles; the table never owns identifier
//! bytes. The interner and the node arena must outlive every entry, and a
//! file's nodes may only be dropped after its entries were rolled back.

use fxhash::hash64;
use kestrel_syntax::{Name, NodeId};

use crate::config::ResolverConfig;

const DEFAULT_CAPACITY: usize = 128;
const DEFAULT_LOAD_FACTOR: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
struct SymbolEntry {
    key: Name,
    hash: u64,
    /// The entry this one shadows for the same key.
    prev: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    /// Once claimed, a bucket keeps its key until the next rehash, even when
    /// no binding for the key is visible anymore.
    key: Option<Name>,
    hash: u64,
    /// The visible entry for `key`.
    index: Option<u32>,
    /// Cached node of the visible entry.
    active: Option<NodeId>,
}

/// Where a scope opened by [`SymbolTable::scope_start_indexed`] begins:
/// the entry count and the number of scopes that enclose it.
///
/// Scopes opened back to back without declaring anything share `index`,
/// so only `depth` tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableMarker {
    pub index: usize,
    pub depth: usize,
}

/// A binding of a key: the node and the entry that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shadowed {
    pub node: NodeId,
    /// Position of the shadowed entry; compare with scope markers to tell
    /// which scope it was declared in.
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    /// Parallel to `entries`; kept apart so truncation stays a plain resize.
    nodes: Vec<NodeId>,
    buckets: Vec<Bucket>,
    claimed: usize,
    max_load_factor: f64,
    scopes: Vec<usize>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR)
    }

    /// Create a table with at least `capacity` buckets.
    ///
    /// # Panics
    ///
    /// When `max_load_factor` is not strictly between 0 and 1.
    pub fn with_capacity(capacity: usize, max_load_factor: f64) -> Self {
        assert!(
            max_load_factor > 0.0 && max_load_factor < 1.0,
            "symbol table load factor must be in (0, 1), got {max_load_factor}"
        );
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            entries: Vec::new(),
            nodes: Vec::new(),
            buckets: vec![Bucket::default(); capacity],
            claimed: 0,
            max_load_factor,
            scopes: Vec::new(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::with_capacity(config.bucket_capacity(), config.max_load_factor)
    }

    /// Number of entries, i.e. the marker a scope opened now would capture.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of buckets; always a power of two.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Number of open scopes, of any kind.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    fn mask(&self) -> usize {
        self.buckets.len() - 1
    }

    /// Find the bucket claimed by `key`, or the first unclaimed bucket on its
    /// probe sequence.
    fn probe(&self, key: Name, hash: u64) -> Result<usize, usize> {
        let mask = self.mask();
        let mut slot = hash as usize & mask;
        loop {
            let bucket = &self.buckets[slot];
            match bucket.key {
                None => return Err(slot),
                Some(claimed) if bucket.hash == hash && claimed == key => return Ok(slot),
                Some(_) => slot = (slot + 1) & mask,
            }
        }
    }

    fn exceeds_load(&self, claimed: usize) -> bool {
        claimed as f64 > self.buckets.len() as f64 * self.max_load_factor
    }

    /// Rehash, dropping buckets with no visible binding. The bucket count
    /// stays put while the live keys fill at most half of what the load
    /// factor allows, and doubles otherwise. Stored hashes are reused as-is.
    fn grow(&mut self) {
        let live = self.buckets.iter().filter(|b| b.key.is_some() && b.index.is_some()).count();
        let mut capacity = self.buckets.len();
        if (live + 1) as f64 > capacity as f64 * self.max_load_factor / 2.0 {
            capacity *= 2;
        }
        let old = std::mem::take(&mut self.buckets);
        self.buckets = vec![Bucket::default(); capacity];
        self.claimed = 0;
        let mask = self.mask();
        for bucket in old.into_iter().filter(|b| b.key.is_some() && b.index.is_some()) {
            let mut slot = bucket.hash as usize & mask;
            while self.buckets[slot].key.is_some() {
                slot = (slot + 1) & mask;
            }
            self.buckets[slot] = bucket;
            self.claimed += 1;
        }
        log::trace!(
            "symbol table rehashed to {} buckets ({} live keys, {} entries)",
            self.buckets.len(),
            self.claimed,
            self.entries.len()
        );
    }

    /// Bind `key` to `node`, shadowing whatever was visible for `key`.
    pub fn declare(&mut self, key: Name, node: NodeId) {
        self.declare_quiet(key, node);
    }

    /// Like [`SymbolTable::declare`], returning the binding that got shadowed.
    pub fn declare_quiet(&mut self, key: Name, node: NodeId) -> Option<Shadowed> {
        let hash = hash64(&key);
        let slot = match self.probe(key, hash) {
            Ok(slot) => slot,
            Err(mut slot) => {
                if self.exceeds_load(self.claimed + 1) {
                    self.grow();
                    slot = match self.probe(key, hash) {
                        Ok(slot) | Err(slot) => slot,
                    };
                }
                let bucket = &mut self.buckets[slot];
                bucket.key = Some(key);
                bucket.hash = hash;
                self.claimed += 1;
                slot
            }
        };

        let index = self.entries.len() as u32;
        let bucket = &mut self.buckets[slot];
        let shadowed = bucket
            .index
            .zip(bucket.active)
            .map(|(index, node)| Shadowed { node, index: index as usize });
        self.entries.push(SymbolEntry { key, hash, prev: bucket.index });
        self.nodes.push(node);
        bucket.index = Some(index);
        bucket.active = Some(node);
        shadowed
    }

    /// The node visible for `key`, if any.
    pub fn resolve(&self, key: Name) -> Option<NodeId> {
        match self.probe(key, hash64(&key)) {
            Ok(slot) => self.buckets[slot].active,
            Err(_) => None,
        }
    }

    /// Every live binding of `key`, newest first.
    pub fn resolve_all(&self, key: Name) -> impl Iterator<Item = NodeId> + '_ {
        self.bindings(key).map(|binding| binding.node)
    }

    /// Like [`SymbolTable::resolve_all`], with the entry index of each binding.
    pub fn bindings(&self, key: Name) -> ShadowChain<'_> {
        let next = match self.probe(key, hash64(&key)) {
            Ok(slot) => self.buckets[slot].index,
            Err(_) => None,
        };
        ShadowChain { table: self, next }
    }

    /// Open a scope.
    pub fn scope_start(&mut self) {
        self.scopes.push(self.entries.len());
    }

    /// Open a scope and return its marker for a later
    /// [`SymbolTable::drop_all_scopes_from`].
    pub fn scope_start_indexed(&mut self) -> TableMarker {
        let marker = TableMarker { index: self.entries.len(), depth: self.scopes.len() };
        self.scopes.push(marker.index);
        marker
    }

    /// Close the innermost scope, restoring every binding it shadowed.
    ///
    /// # Panics
    ///
    /// When no scope is open: that is a bug in the caller, never a user error.
    pub fn scope_end(&mut self) {
        let Some(marker) = self.scopes.pop() else {
            panic!("symbol table scope_end called without a matching scope_start");
        };
        self.rollback(marker);
    }

    /// Close the scope opened as `marker` together with every scope nested
    /// in it, and remove every entry declared since, whether or not nested
    /// scopes were closed in between. Enclosing scopes stay open even when
    /// they begin at the same entry.
    ///
    /// # Panics
    ///
    /// When `marker` lies beyond the current entry count.
    pub fn drop_all_scopes_from(&mut self, marker: TableMarker) {
        let TableMarker { index, depth } = marker;
        assert!(
            index <= self.entries.len(),
            "scope marker {index} is past the end of the symbol table ({} entries)",
            self.entries.len()
        );
        debug_assert!(
            self.scopes.get(depth).map_or(true, |&start| start == index),
            "scope marker {index} does not match the scope open at depth {depth}"
        );
        self.scopes.truncate(depth);
        self.rollback(index);
    }

    fn rollback(&mut self, marker: usize) {
        debug_assert!(marker <= self.entries.len());
        for i in (marker..self.entries.len()).rev() {
            let entry = self.entries[i];
            let Ok(slot) = self.probe(entry.key, entry.hash) else {
                panic!("symbol table entry {i} has no bucket: index corrupted");
            };
            let bucket = &mut self.buckets[slot];
            if bucket.index == Some(i as u32) {
                bucket.index = entry.prev;
                bucket.active = entry.prev.map(|prev| self.nodes[prev as usize]);
            }
        }
        if marker < self.entries.len() {
            log::trace!("rolled back {} symbol entries", self.entries.len() - marker);
        }
        self.entries.truncate(marker);
        self.nodes.truncate(marker);
    }

    /// Forget every entry and scope.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.nodes.clear();
        self.buckets.iter_mut().for_each(|bucket| *bucket = Bucket::default());
        self.claimed = 0;
        self.scopes.clear();
    }
}

/// Iterator over the bindings of one key, newest first.
#[derive(Debug, Clone)]
pub struct ShadowChain<'t> {
    table: &'t SymbolTable,
    next: Option<u32>,
}

impl Iterator for ShadowChain<'_> {
    type Item = Shadowed;

    fn next(&mut self) -> Option<Shadowed> {
        let index = self.next? as usize;
        self.next = self.table.entries[index].prev;
        Some(Shadowed { node: self.table.nodes[index], index })
    }
}
