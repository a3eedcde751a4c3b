//! Valgrind lackey-style memory traces.
//!
//! Each record is `<op> <hex address>,<decimal size>` where `op` is one of
//! `I` (instruction fetch), `L` (load), `S` (store) or `M` (modify). Instruction
//! fetches are written flush left, data accesses are indented by one space.
//!
//! Any other single-character code in an otherwise well-formed record is kept
//! as [`AccessKind::Unknown`] and simulated like a load.

use std::fmt;
use std::io::BufRead;

use crate::error::{MalformedReason, TraceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    InstructionFetch,
    Load,
    Store,
    /// A load immediately followed by a store to the same address.
    Modify,
    /// Unrecognised operation code, replayed as a load.
    Unknown(char),
}

impl AccessKind {
    pub fn from_code(code: char) -> AccessKind {
        match code {
            'I' => AccessKind::InstructionFetch,
            'L' => AccessKind::Load,
            'S' => AccessKind::Store,
            'M' => AccessKind::Modify,
            other => AccessKind::Unknown(other),
        }
    }

    pub fn code(&self) -> char {
        match self {
            AccessKind::InstructionFetch => 'I',
            AccessKind::Load => 'L',
            AccessKind::Store => 'S',
            AccessKind::Modify => 'M',
            AccessKind::Unknown(code) => *code,
        }
    }
}

/// One decoded trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub kind: AccessKind,
    pub address: u64,
    /// Carried through for formatting; the simulation assumes block-aligned accesses.
    pub size: u32,
}

impl Access {
    pub fn new(kind: AccessKind, address: u64, size: u32) -> Access {
        Access {
            kind,
            address,
            size,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind != AccessKind::InstructionFetch {
            write!(f, " ")?;
        }
        write!(f, "{} {:x},{}", self.kind.code(), self.address, self.size)
    }
}

/// Parse a single non-blank record.
pub fn parse_record(record: &str) -> Result<Access, MalformedReason> {
    let record = record.trim();
    let mut chars = record.chars();
    let code = chars.next().ok_or(MalformedReason::Empty)?;
    let kind = AccessKind::from_code(code);

    let rest = chars.as_str().trim_start();
    if rest.is_empty() {
        return Err(MalformedReason::MissingAddress);
    }
    let (address, size) = rest.split_once(',').ok_or(MalformedReason::MissingSize)?;

    let address = address.trim_end();
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    if digits.is_empty() {
        return Err(MalformedReason::MissingAddress);
    }
    let address = u64::from_str_radix(digits, 16).map_err(|_| MalformedReason::InvalidAddress)?;

    let size = size.trim();
    if size.is_empty() {
        return Err(MalformedReason::MissingSize);
    }
    let size = size.parse::<u32>().map_err(|_| MalformedReason::InvalidSize)?;

    Ok(Access::new(kind, address, size))
}

/// Streams accesses out of a trace, one line at a time.
///
/// Blank lines are skipped. The first malformed or unreadable line is yielded as
/// an error, after which the reader is exhausted.
pub struct TraceReader<R> {
    lines: std::io::Lines<R>,
    line: usize,
    done: bool,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> TraceReader<R> {
        TraceReader {
            lines: reader.lines(),
            line: 0,
            done: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<Access, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let text = match self.lines.next() {
                Some(Ok(text)) => text,
                Some(Err(source)) => {
                    self.done = true;
                    return Some(Err(TraceError::Read {
                        line: self.line + 1,
                        source,
                    }));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.line += 1;

            if text.trim().is_empty() {
                continue;
            }

            return match parse_record(&text) {
                Ok(access) => Some(Ok(access)),
                Err(reason) => {
                    self.done = true;
                    Some(Err(TraceError::Malformed {
                        line: self.line,
                        record: text,
                        reason,
                    }))
                }
            };
        }
    }
}
