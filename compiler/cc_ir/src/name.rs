//! Interned identifiers.

use std::fmt;

/// Handle to a string held by a [`StringInterner`](crate::StringInterner).
///
/// The low [`Name::SHARD_BITS`] bits select the interner shard; the rest
/// index into that shard. `Name::EMPTY` is the empty string in every
/// interner.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    pub const EMPTY: Name = Name(0);

    pub const SHARD_BITS: u32 = 4;
    pub const NUM_SHARDS: usize = 1 << Self::SHARD_BITS;
    /// Largest slot index a shard can hand out.
    pub const MAX_SLOT: u32 = u32::MAX >> Self::SHARD_BITS;

    #[inline]
    pub(crate) const fn from_parts(shard: u32, slot: u32) -> Self {
        debug_assert!(shard < Self::NUM_SHARDS as u32);
        debug_assert!(slot <= Self::MAX_SLOT);
        Name((slot << Self::SHARD_BITS) | shard)
    }

    #[inline]
    pub(crate) const fn shard(self) -> usize {
        (self.0 & (Self::NUM_SHARDS as u32 - 1)) as usize
    }

    #[inline]
    pub(crate) const fn slot(self) -> usize {
        (self.0 >> Self::SHARD_BITS) as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Rebuild a name from [`raw`](Self::raw). Only meaningful against the
    /// interner that produced it.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({}#{})", self.shard(), self.slot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_round_trip() {
        let name = Name::from_parts(9, 77);
        assert_eq!((name.shard(), name.slot()), (9, 77));
        assert_eq!(Name::from_raw(name.raw()), name);
        assert_eq!(format!("{name:?}"), "Name(9#77)");
    }

    #[test]
    fn empty_is_slot_zero_of_shard_zero() {
        assert_eq!(Name::from_parts(0, 0), Name::EMPTY);
        assert_eq!(Name::default(), Name::EMPTY);
    }
}
