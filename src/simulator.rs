//! Replays accesses against the cache and keeps the books.

use std::fmt;
use std::io::BufRead;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::address;
use crate::cache::{Cache, CacheLine};
use crate::config::Geometry;
use crate::error::{ResourceError, TraceError};
use crate::stats::{Statistics, Summary};
use crate::trace::{Access, AccessKind, TraceReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub dirty: bool,
}

/// What a single access did to the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessOutcome {
    /// Instruction fetches leave the cache untouched.
    pub skipped: bool,
    /// Whether the lookup found the line resident.
    pub hit: bool,
    pub hits_added: u64,
    pub double_references_added: u64,
    pub evicted: Option<Eviction>,
}

impl AccessOutcome {
    fn skipped() -> AccessOutcome {
        AccessOutcome {
            skipped: true,
            ..AccessOutcome::default()
        }
    }
}

/// Verbose-mode suffix, e.g. `miss eviction hit` for a modify that replaced a line.
impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            return write!(f, "skipped");
        }
        let mut words = Vec::new();
        if !self.hit {
            words.push("miss");
            if self.evicted.is_some() {
                words.push("eviction");
            }
        }
        for _ in 0..self.hits_added {
            words.push("hit");
        }
        write!(f, "{}", words.join(" "))
    }
}

/// Result of replaying a trace.
#[derive(Debug)]
pub struct RunReport {
    pub summary: Summary,
    /// Load, store and modify records processed.
    pub accesses: u64,
    pub skipped_fetches: u64,
    /// Set when the trace stopped early on a bad record.
    pub truncated: Option<TraceError>,
}

pub struct Simulator {
    geometry: Geometry,
    cache: Cache,
    stats: Statistics,
    accesses: u64,
    skipped_fetches: u64,
}

impl Simulator {
    pub fn new(geometry: Geometry) -> Result<Simulator, ResourceError> {
        let cache = Cache::new(&geometry)?;
        Ok(Simulator {
            geometry,
            cache,
            stats: Statistics::new(),
            accesses: 0,
            skipped_fetches: 0,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn summary(&self) -> Summary {
        self.stats.summary(self.geometry.block_size())
    }

    /// Apply one access: look up its line, update recency and dirtiness, count.
    pub fn access(&mut self, access: &Access) -> AccessOutcome {
        if access.kind == AccessKind::InstructionFetch {
            self.skipped_fetches += 1;
            return AccessOutcome::skipped();
        }
        self.accesses += 1;
        if let AccessKind::Unknown(code) = access.kind {
            warn!("unknown operation code `{}` replayed as a load", code);
        }

        let decoded = address::decode(access.address, &self.geometry);
        let block_size = self.geometry.block_size();
        let mut set = self.cache.set_mut(decoded.set_index as usize);
        let stats = &mut self.stats;

        let mut outcome = AccessOutcome::default();
        let mut line = CacheLine::new(decoded.tag);

        match set.find(decoded.tag) {
            Some(position) => {
                outcome.hit = true;
                stats.record_hit();
                outcome.hits_added += 1;
                line.dirty = set.lines()[position].dirty;

                // back-to-back reference to the MRU line
                if position == 0 {
                    stats.record_double_reference();
                    outcome.double_references_added += 1;
                }

                match access.kind {
                    AccessKind::Modify => {
                        stats.record_hit();
                        outcome.hits_added += 1;
                        stats.record_double_reference();
                        outcome.double_references_added += 1;
                        mark_dirty(&mut line, stats);
                    }
                    AccessKind::Store => mark_dirty(&mut line, stats),
                    _ => {}
                }

                set.refresh(position, line);
            }
            None => {
                stats.record_miss();

                match access.kind {
                    AccessKind::Modify => {
                        stats.record_hit();
                        outcome.hits_added += 1;
                        stats.record_double_reference();
                        outcome.double_references_added += 1;
                        mark_dirty(&mut line, stats);
                    }
                    AccessKind::Store => mark_dirty(&mut line, stats),
                    _ => {}
                }

                let victim = *set.eviction_victim();
                if victim.valid {
                    stats.record_eviction(victim.dirty, block_size);
                    outcome.evicted = Some(Eviction {
                        dirty: victim.dirty,
                    });
                }

                set.insert_at_front(line);
            }
        }

        debug!("{} {}", access.to_string().trim_start(), outcome);
        outcome
    }

    /// Consume `trace` until it ends or yields an error.
    ///
    /// Counters are cumulative over the simulator's lifetime, so the report
    /// covers every access this simulator has seen.
    pub fn run<I>(&mut self, trace: I) -> RunReport
    where
        I: IntoIterator<Item = Result<Access, TraceError>>,
    {
        let mut truncated = None;
        for item in trace {
            match item {
                Ok(access) => {
                    self.access(&access);
                }
                Err(err) => {
                    warn!("trace truncated: {}", err);
                    truncated = Some(err);
                    break;
                }
            }
        }

        RunReport {
            summary: self.summary(),
            accesses: self.accesses,
            skipped_fetches: self.skipped_fetches,
            truncated,
        }
    }
}

fn mark_dirty(line: &mut CacheLine, stats: &mut Statistics) {
    if !line.dirty {
        stats.record_dirty_event();
    }
    line.dirty = true;
}

/// Replay a whole trace against a fresh cache of the given geometry.
///
/// The simulator is handed back alongside the report so callers can inspect
/// the final cache state.
pub fn replay<R: BufRead>(
    geometry: Geometry,
    trace: TraceReader<R>,
) -> Result<(Simulator, RunReport), ResourceError> {
    info!("simulating cache {}", geometry);
    let mut simulator = Simulator::new(geometry)?;

    let start = Instant::now();
    let report = simulator.run(trace);
    info!(
        accesses = report.accesses,
        skipped_fetches = report.skipped_fetches,
        "Time elapsed is: {:?}",
        start.elapsed()
    );
    Ok((simulator, report))
}

/// [`replay`] when only the numbers matter.
pub fn run_trace<R: BufRead>(
    geometry: Geometry,
    trace: TraceReader<R>,
) -> Result<RunReport, ResourceError> {
    replay(geometry, trace).map(|(_, report)| report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(address: u64) -> Access {
        Access::new(AccessKind::Load, address, 1)
    }

    fn store(address: u64) -> Access {
        Access::new(AccessKind::Store, address, 1)
    }

    fn modify(address: u64) -> Access {
        Access::new(AccessKind::Modify, address, 1)
    }

    fn simulator(s: u32, e: usize, b: u32) -> Simulator {
        Simulator::new(Geometry::new(s, e, b).unwrap()).unwrap()
    }

    #[test]
    fn instruction_fetch_is_ignored() {
        let mut sim = simulator(0, 1, 0);
        let outcome = sim.access(&Access::new(AccessKind::InstructionFetch, 0, 4));
        assert!(outcome.skipped);
        assert_eq!(*sim.statistics(), Statistics::default());
        assert_eq!(sim.cache().set(0).valid_lines().count(), 0);
    }

    #[test]
    fn load_miss_then_hit_at_mru() {
        let mut sim = simulator(0, 1, 0);
        let first = sim.access(&load(0));
        assert!(!first.hit);
        assert_eq!(first.to_string(), "miss");

        let second = sim.access(&load(0));
        assert!(second.hit);
        assert_eq!(second.double_references_added, 1);
        assert_eq!(second.to_string(), "hit");

        let stats = sim.statistics();
        assert_eq!((stats.hits, stats.misses, stats.double_references), (1, 1, 1));
    }

    #[test]
    fn hit_below_mru_is_not_a_double_reference() {
        let mut sim = simulator(0, 2, 0);
        sim.access(&load(1));
        sim.access(&load(2));
        let outcome = sim.access(&load(1));
        assert!(outcome.hit);
        assert_eq!(outcome.double_references_added, 0);

        let tags: Vec<u64> = sim.cache().set(0).lines().iter().map(|l| l.tag).collect();
        assert_eq!(tags, vec![1, 2]);
    }

    #[test]
    fn lru_line_is_the_one_evicted() {
        let mut sim = simulator(0, 2, 0);
        sim.access(&load(1));
        sim.access(&load(2));
        sim.access(&load(1));
        let outcome = sim.access(&load(3));
        assert_eq!(outcome.evicted, Some(Eviction { dirty: false }));
        assert_eq!(outcome.to_string(), "miss eviction");

        assert!(sim.cache().set(0).find(1).is_some());
        assert!(sim.cache().set(0).find(2).is_none());
    }

    #[test]
    fn dirty_eviction_counts_block_bytes() {
        let mut sim = simulator(0, 1, 4);
        sim.access(&store(0x00));
        let outcome = sim.access(&load(0x10));
        assert_eq!(outcome.evicted, Some(Eviction { dirty: true }));

        let stats = sim.statistics();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.dirty_evicted_bytes, 16);
        assert_eq!(sim.summary().active_dirty_bytes, 0);
    }

    #[test]
    fn store_hit_dirties_once() {
        let mut sim = simulator(0, 1, 0);
        sim.access(&load(0));
        sim.access(&store(0));
        sim.access(&store(0));
        assert_eq!(sim.statistics().dirty_event_count, 1);
        assert!(sim.cache().set(0).lines()[0].dirty);
    }

    #[test]
    fn load_hit_keeps_dirtiness() {
        let mut sim = simulator(0, 2, 0);
        sim.access(&store(5));
        sim.access(&load(6));
        sim.access(&load(5));
        let line = sim.cache().set(0).lines()[0];
        assert_eq!(line.tag, 5);
        assert!(line.dirty);
    }

    #[test]
    fn modify_miss_counts_a_hit_and_a_double_reference() {
        let mut sim = simulator(2, 1, 2);
        let outcome = sim.access(&modify(0x40));
        assert_eq!(outcome.to_string(), "miss hit");

        let stats = sim.statistics();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.double_references, 1);
        assert_eq!(stats.dirty_event_count, 1);
    }

    #[test]
    fn modify_hit_on_dirty_mru_line() {
        let mut sim = simulator(0, 1, 0);
        sim.access(&store(0));
        let outcome = sim.access(&modify(0));
        assert_eq!(outcome.to_string(), "hit hit");
        assert_eq!(outcome.double_references_added, 2);

        let stats = sim.statistics();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.dirty_event_count, 1);
    }

    #[test]
    fn unknown_operation_replays_as_load() {
        let mut sim = simulator(0, 1, 0);
        let report = sim.run(TraceReader::new(std::io::Cursor::new(
            " L 0,1\n X 0,1\n L 0,1\n",
        )));
        assert!(report.truncated.is_none());
        assert_eq!(report.accesses, 3);
        assert_eq!(report.summary.hits, 2);
        assert_eq!(report.summary.misses, 1);
        assert_eq!(report.summary.double_references, 2);
        assert_eq!(sim.statistics().dirty_event_count, 0);
    }

    #[test]
    fn replay_hands_back_final_state() {
        let geometry = Geometry::new(1, 1, 0).unwrap();
        let trace = TraceReader::new(std::io::Cursor::new(" S 1,1\n"));
        let (sim, report) = replay(geometry, trace).unwrap();
        assert_eq!(report.summary.misses, 1);
        assert!(sim.cache().set(1).lines()[0].dirty);
    }

    #[test]
    fn run_stops_at_first_error_and_keeps_counts() {
        let mut sim = simulator(0, 1, 0);
        let trace = vec![
            Ok(load(0)),
            Ok(Access::new(AccessKind::InstructionFetch, 0, 4)),
            Ok(load(0)),
            Err(TraceError::Malformed {
                line: 4,
                record: "?".to_string(),
                reason: crate::error::MalformedReason::MissingSize,
            }),
            Ok(load(8)),
        ];
        let report = sim.run(trace);
        assert_eq!(report.accesses, 2);
        assert_eq!(report.skipped_fetches, 1);
        assert_eq!(report.summary.hits, 1);
        assert_eq!(report.summary.misses, 1);
        assert_eq!(report.truncated.map(|err| err.line()), Some(4));
    }
}
