//! The historical-marking registry: the single source of truth mapping a structural change
//! (a `(from, to)` node path) to the innovation number all genomes must agree to use for it.
//!
//! Accessed single-threaded only (see the concurrency design notes) — a generation's worth of
//! structural mutations share one registry so that two genomes independently growing the same
//! edge this generation end up with the same innovation id and can later be aligned in
//! crossover.

use fxhash::FxHashMap;

/// Process-wide (per evolutionary run) registry of node-path -> innovation id.
pub struct InnovationRegistry {
    next: usize,
    seen: FxHashMap<(u16, u16), usize>,
}

impl InnovationRegistry {
    pub fn new(next: usize) -> Self {
        Self {
            next,
            seen: FxHashMap::default(),
        }
    }

    pub fn head(&self) -> usize {
        self.next
    }

    /// Assign a fresh innovation id to `path` the first time it's seen this registry's
    /// lifetime, otherwise return the id already assigned to it.
    pub fn lookup_or_assign(&mut self, path: (u16, u16)) -> usize {
        match self.seen.get(&path) {
            Some(id) => *id,
            None => {
                let id = self.next;
                self.next += 1;
                self.seen.insert(path, id);
                id
            }
        }
    }

    /// Look up without assigning; `None` if this path hasn't occurred in this registry yet.
    pub fn lookup(&self, path: (u16, u16)) -> Option<usize> {
        self.seen.get(&path).copied()
    }
}
