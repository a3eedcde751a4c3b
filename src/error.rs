//! Error types for configuring, loading, and driving a simulation.
//!
//! Configuration and resource errors are fatal and happen before any access is
//! processed. Trace errors only truncate a run: the statistics gathered up to the
//! offending record are still reported.

use std::io;

use thiserror::Error;

use crate::config::ADDRESS_BITS;

/// Invalid cache geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A set must hold at least one line.
    #[error("associativity must be at least 1")]
    ZeroAssociativity,

    /// Set-index and block-offset fields do not fit in an address.
    #[error(
        "set index bits ({set_index_bits}) plus block offset bits ({block_offset_bits}) exceed the {}-bit address",
        ADDRESS_BITS
    )]
    AddressTooNarrow {
        /// Requested `s`.
        set_index_bits: u32,
        /// Requested `b`.
        block_offset_bits: u32,
    },
}

/// The cache state for a geometry could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("cannot allocate cache storage for 2^{set_index_bits} sets x {ways} ways")]
    Allocation { set_index_bits: u32, ways: usize },
}

/// Why a single trace record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("record is empty")]
    Empty,
    #[error("missing address")]
    MissingAddress,
    #[error("invalid hexadecimal address")]
    InvalidAddress,
    #[error("missing `,size` field")]
    MissingSize,
    #[error("invalid decimal size")]
    InvalidSize,
}

/// A trace could not be read past a certain line.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: malformed record {record:?}: {reason}")]
    Malformed {
        line: usize,
        record: String,
        reason: MalformedReason,
    },

    #[error("line {line}: failed to read trace")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

impl TraceError {
    /// One-based line number at which the trace stopped.
    pub fn line(&self) -> usize {
        match self {
            TraceError::Malformed { line, .. } | TraceError::Read { line, .. } => *line,
        }
    }
}

/// Top-level failure of the `csim` binary.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("cannot access {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot write csv summary")]
    Csv(#[from] csv::Error),
}
