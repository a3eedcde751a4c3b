//! Trace-driven simulator of a set-associative, write-back, write-allocate
//! cache with LRU replacement.
//!
//! A run maps a stream of [`Access`] records onto a [`Cache`] of fixed
//! [`Geometry`] and reports hits, misses, evictions, dirty bytes evicted, an
//! estimate of dirty bytes still resident, and back-to-back double references.
//!
//! ```
//! use std::io::Cursor;
//! use csim::{run_trace, Geometry, TraceReader};
//!
//! let geometry = Geometry::new(0, 1, 0).unwrap();
//! let trace = TraceReader::new(Cursor::new(" L 0,1\n L 0,1\n"));
//! let report = run_trace(geometry, trace).unwrap();
//! assert_eq!(report.summary.misses, 1);
//! assert_eq!(report.summary.hits, 1);
//! ```

pub mod address;
pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod simulator;
pub mod stats;
pub mod trace;

pub use address::{decode, DecodedAddress};
pub use cache::{Cache, CacheLine, CacheSet};
pub use config::{Geometry, ADDRESS_BITS};
pub use error::{ConfigError, MalformedReason, ResourceError, SimError, TraceError};
pub use driver::{run_file, RunOptions};
pub use simulator::{replay, run_trace, AccessOutcome, Eviction, RunReport, Simulator};
pub use stats::{Statistics, Summary};
pub use trace::{parse_record, Access, AccessKind, TraceReader};
