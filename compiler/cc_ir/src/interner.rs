//! Sharded string interner for identifiers, labels and callee names.
//!
//! Functions of one translation unit may be lowered on separate worker
//! threads, so the interner is shared behind per-shard locks. Interned
//! strings are leaked and live for the rest of the process.

use std::hash::{BuildHasher, Hash, Hasher};

use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::Name;

/// A shard ran out of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternError {
    pub shard: usize,
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "interner shard {} is full ({} names)",
            self.shard,
            u64::from(Name::MAX_SLOT) + 1
        )
    }
}

impl std::error::Error for InternError {}

#[derive(Default)]
struct Shard {
    slots: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Thread-safe interner. Share it by reference or wrap it in an `Arc`.
pub struct StringInterner {
    shards: [RwLock<Shard>; Name::NUM_SHARDS],
}

impl StringInterner {
    pub fn new() -> Self {
        let interner = Self {
            shards: std::array::from_fn(|_| RwLock::new(Shard::default())),
        };
        // Slot 0 of every shard is the empty string, so `Name::EMPTY`
        // resolves whichever shard it lands in.
        for shard in &interner.shards {
            let mut shard = shard.write();
            shard.slots.insert("", 0);
            shard.strings.push("");
        }
        interner
    }

    fn shard_of(s: &str) -> usize {
        if s.is_empty() {
            return 0;
        }
        let mut hasher = FxBuildHasher.build_hasher();
        s.hash(&mut hasher);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "masked to fewer than NUM_SHARDS values"
        )]
        let shard = (hasher.finish() as usize) & (Name::NUM_SHARDS - 1);
        shard
    }

    /// Intern `s`, failing only when its shard is full.
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        let shard = Self::shard_of(s);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "shard < NUM_SHARDS"
        )]
        let shard_tag = shard as u32;

        if let Some(&slot) = self.shards[shard].read().slots.get(s) {
            return Ok(Name::from_parts(shard_tag, slot));
        }

        let mut guard = self.shards[shard].write();
        // Another thread may have won the race between the two locks.
        if let Some(&slot) = guard.slots.get(s) {
            return Ok(Name::from_parts(shard_tag, slot));
        }
        let slot = u32::try_from(guard.strings.len())
            .ok()
            .filter(|&slot| slot <= Name::MAX_SLOT)
            .ok_or(InternError { shard })?;
        let stored: &'static str = Box::leak(s.into());
        guard.strings.push(stored);
        guard.slots.insert(stored, slot);
        Ok(Name::from_parts(shard_tag, slot))
    }

    /// Intern `s`.
    ///
    /// # Panics
    /// If the shard is full; see [`try_intern`](Self::try_intern).
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// The string behind `name`. Names from another interner may resolve
    /// to `""`.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.shards[name.shard()]
            .read()
            .strings
            .get(name.slot())
            .copied()
            .unwrap_or("")
    }

    /// Number of distinct non-empty strings interned.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().strings.len() - 1).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn same_string_same_name() {
        let interner = StringInterner::new();
        let first = interner.intern("loop_end");
        assert_eq!(interner.intern("loop_end"), first);
        assert_eq!(interner.lookup(first), "loop_end");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn distinct_strings_distinct_names() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let y = interner.intern("y");
        assert_ne!(x, y);
        assert_eq!(interner.lookup(y), "y");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn empty_string() {
        let interner = StringInterner::new();
        assert!(interner.is_empty());
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
        assert!(interner.is_empty());
    }

    #[test]
    fn concurrent_interning_agrees() {
        let interner = Arc::new(StringInterner::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let interner = Arc::clone(&interner);
                std::thread::spawn(move || interner.intern(&format!("label_{}", i % 2)))
            })
            .collect();
        let names: Vec<Name> = handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| panic!("interning thread panicked")))
            .collect();
        assert!(names.iter().step_by(2).all(|&n| n == names[0]));
        assert!(names.iter().skip(1).step_by(2).all(|&n| n == names[1]));
        assert_eq!(interner.len(), 2);
    }
}
