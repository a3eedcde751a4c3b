use std::io;
use std::io::Write;

use crate::config::Geometry;
use crate::error::ResourceError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: u64,
    pub valid: bool,
    pub dirty: bool,
}

impl CacheLine {
    /// A freshly filled line, clean until a store touches it.
    pub fn new(tag: u64) -> CacheLine {
        CacheLine {
            tag,
            valid: true,
            dirty: false,
        }
    }

    pub fn print(&self) -> String {
        if self.valid {
            format!("tag: {:x}, dirty: {}", self.tag, self.dirty)
        } else {
            "empty".to_string()
        }
    }
}

/// One set, kept in recency order: position 0 is MRU, the last position is LRU.
///
/// A set is a view over a run of lines owned by [`Cache`] (or by any other
/// line storage), so it is generic over how the lines are held.
#[derive(Debug, Clone)]
pub struct CacheSet<L> {
    lines: L,
}

impl<L: AsRef<[CacheLine]>> CacheSet<L> {
    pub fn new(lines: L) -> CacheSet<L> {
        CacheSet { lines }
    }

    pub fn lines(&self) -> &[CacheLine] {
        self.lines.as_ref()
    }

    /// Position of the valid line holding `tag`, if any.
    pub fn find(&self, tag: u64) -> Option<usize> {
        self.lines()
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    /// The line that a miss in this set would replace. May be an empty slot.
    pub fn eviction_victim(&self) -> &CacheLine {
        // sets are never empty, associativity is at least 1
        &self.lines()[self.lines().len() - 1]
    }

    pub fn valid_lines(&self) -> impl Iterator<Item = &CacheLine> + '_ {
        self.lines().iter().filter(|line| line.valid)
    }
}

impl<L: AsRef<[CacheLine]> + AsMut<[CacheLine]>> CacheSet<L> {
    /// Shift lines `[0, position)` one slot toward the LRU end. Slot 0 is left for the caller.
    pub fn promote(&mut self, position: usize) {
        self.lines.as_mut()[..=position].rotate_right(1);
    }

    /// Move the line at `position` to MRU, replacing it with `line`.
    pub fn refresh(&mut self, position: usize, line: CacheLine) {
        self.promote(position);
        self.lines.as_mut()[0] = line;
    }

    /// Drop the LRU slot and place `line` at MRU.
    pub fn insert_at_front(&mut self, line: CacheLine) {
        self.refresh(self.lines().len() - 1, line);
    }
}

/// All sets of the simulated cache, stored as one flat array of
/// `num_sets * ways` lines. Allocated once, never resized.
#[derive(Debug, Clone)]
pub struct Cache {
    lines: Vec<CacheLine>,
    ways: usize,
}

impl Cache {
    pub fn new(geometry: &Geometry) -> Result<Cache, ResourceError> {
        let ways = geometry.associativity();
        let alloc_error = ResourceError::Allocation {
            set_index_bits: geometry.set_index_bits(),
            ways,
        };
        let num_sets = geometry.num_sets().ok_or(alloc_error)?;
        let total = num_sets.checked_mul(ways).ok_or(alloc_error)?;

        let mut lines: Vec<CacheLine> = Vec::new();
        lines.try_reserve_exact(total).map_err(|_| alloc_error)?;
        lines.resize(total, CacheLine::default());
        Ok(Cache { lines, ways })
    }

    pub fn num_sets(&self) -> usize {
        self.lines.len() / self.ways
    }

    pub fn set(&self, index: usize) -> CacheSet<&[CacheLine]> {
        let start = index * self.ways;
        CacheSet::new(&self.lines[start..start + self.ways])
    }

    pub fn set_mut(&mut self, index: usize) -> CacheSet<&mut [CacheLine]> {
        let start = index * self.ways;
        CacheSet::new(&mut self.lines[start..start + self.ways])
    }

    pub fn sets(&self) -> impl Iterator<Item = CacheSet<&[CacheLine]>> + '_ {
        self.lines.chunks_exact(self.ways).map(CacheSet::new)
    }

    /// Write the state of every non-empty set, MRU first.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let total = self.lines.iter().filter(|line| line.valid).count();
        writeln!(
            out,
            "----The cache status: sets: {}, valid lines: {}",
            self.num_sets(),
            total
        )?;

        for (index, set) in self
            .sets()
            .enumerate()
            .filter(|(_, set)| set.valid_lines().next().is_some())
        {
            writeln!(out, "*CacheSet index: {}", index)?;
            for (position, line) in set.lines().iter().enumerate() {
                writeln!(out, "  [{}] {}", position, line.print())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(tags: &[u64]) -> CacheSet<Vec<CacheLine>> {
        CacheSet::new(tags.iter().map(|&tag| CacheLine::new(tag)).collect())
    }

    fn tags(set: &CacheSet<Vec<CacheLine>>) -> Vec<u64> {
        set.lines().iter().map(|line| line.tag).collect()
    }

    #[test]
    fn find_ignores_invalid_lines() {
        let mut set = set_of(&[1, 2, 3]);
        assert_eq!(set.find(2), Some(1));
        set.lines[1].valid = false;
        assert_eq!(set.find(2), None);
        assert_eq!(set.find(9), None);
    }

    #[test]
    fn refresh_moves_line_to_front() {
        let mut set = set_of(&[1, 2, 3, 4]);
        set.refresh(2, CacheLine::new(3));
        assert_eq!(tags(&set), vec![3, 1, 2, 4]);

        set.refresh(0, CacheLine::new(3));
        assert_eq!(tags(&set), vec![3, 1, 2, 4]);
    }

    #[test]
    fn insert_at_front_drops_lru() {
        let mut set = set_of(&[1, 2, 3]);
        assert_eq!(set.eviction_victim().tag, 3);
        set.insert_at_front(CacheLine::new(7));
        assert_eq!(tags(&set), vec![7, 1, 2]);
        assert_eq!(set.eviction_victim().tag, 2);
    }

    #[test]
    fn new_cache_is_empty() {
        let geometry = Geometry::new(3, 2, 4).unwrap();
        let cache = Cache::new(&geometry).unwrap();
        assert_eq!(cache.num_sets(), 8);
        for set in cache.sets() {
            assert_eq!(set.lines().len(), 2);
            assert_eq!(set.valid_lines().count(), 0);
            assert!(!set.eviction_victim().valid);
        }
    }

    #[test]
    fn oversized_geometry_is_a_resource_error() {
        let geometry = Geometry::new(62, 4, 0).unwrap();
        assert_eq!(
            Cache::new(&geometry).unwrap_err(),
            ResourceError::Allocation {
                set_index_bits: 62,
                ways: 4
            }
        );
    }

    #[test]
    fn line_count_past_address_space_is_a_resource_error() {
        // 2^60 lines of 16 bytes cannot even be sized
        let geometry = Geometry::new(60, 1, 0).unwrap();
        assert_eq!(
            Cache::new(&geometry).unwrap_err(),
            ResourceError::Allocation {
                set_index_bits: 60,
                ways: 1
            }
        );
    }

    #[test]
    fn sets_are_disjoint_slices() {
        let geometry = Geometry::new(2, 3, 0).unwrap();
        let mut cache = Cache::new(&geometry).unwrap();
        cache.set_mut(2).insert_at_front(CacheLine::new(9));

        assert_eq!(cache.sets().count(), 4);
        for (index, set) in cache.sets().enumerate() {
            assert_eq!(set.lines().len(), 3);
            assert_eq!(set.valid_lines().count(), usize::from(index == 2));
        }
        assert_eq!(cache.set(2).find(9), Some(0));
    }

    #[test]
    fn dump_lists_only_touched_sets() {
        let geometry = Geometry::new(1, 2, 0).unwrap();
        let mut cache = Cache::new(&geometry).unwrap();
        cache.set_mut(1).insert_at_front(CacheLine {
            tag: 0xab,
            valid: true,
            dirty: true,
        });

        let mut out = Vec::new();
        cache.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "----The cache status: sets: 2, valid lines: 1\n\
             *CacheSet index: 1\n  [0] tag: ab, dirty: true\n  [1] empty\n"
        );
    }
}
