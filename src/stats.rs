//! Run-scoped counters and the summary derived from them.

use std::fmt;
use std::io;

/// Counters accumulated while a trace is replayed. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub dirty_evicted_bytes: u64,
    /// Clean-to-dirty transitions, scaled to bytes only when summarising.
    pub dirty_event_count: u64,
    pub double_references: u64,
}

impl Statistics {
    pub fn new() -> Statistics {
        Statistics::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_double_reference(&mut self) {
        self.double_references += 1;
    }

    pub fn record_dirty_event(&mut self) {
        self.dirty_event_count += 1;
    }

    pub fn record_eviction(&mut self, dirty: bool, block_size: u64) {
        self.evictions += 1;
        if dirty {
            self.dirty_evicted_bytes = self.dirty_evicted_bytes.saturating_add(block_size);
        }
    }

    /// Bytes ever dirtied minus bytes written back by eviction.
    ///
    /// This is an approximation of resident dirty data: it is derived from the
    /// event count rather than summed over the lines currently in the cache.
    pub fn active_dirty_bytes(&self, block_size: u64) -> u64 {
        self.dirty_event_count
            .saturating_mul(block_size)
            .saturating_sub(self.dirty_evicted_bytes)
    }

    pub fn summary(&self, block_size: u64) -> Summary {
        Summary {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            dirty_evicted_bytes: self.dirty_evicted_bytes,
            active_dirty_bytes: self.active_dirty_bytes(block_size),
            double_references: self.double_references,
        }
    }
}

/// The six numbers a finished run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub dirty_evicted_bytes: u64,
    pub active_dirty_bytes: u64,
    pub double_references: u64,
}

impl Summary {
    const HEADER: [&'static str; 6] = [
        "hits",
        "misses",
        "evictions",
        "dirty_bytes_evicted",
        "dirty_bytes_active",
        "double_refs",
    ];

    fn values(&self) -> [u64; 6] {
        [
            self.hits,
            self.misses,
            self.evictions,
            self.dirty_evicted_bytes,
            self.active_dirty_bytes,
            self.double_references,
        ]
    }

    /// Header row followed by one row of values.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);
        wtr.write_record(Self::HEADER)?;
        wtr.write_record(self.values().iter().map(|value| value.to_string()))?;
        wtr.flush()?;
        Ok(())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in Self::HEADER.iter().zip(self.values()).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}:{}", name, value)?;
        }
        Ok(())
    }
}
