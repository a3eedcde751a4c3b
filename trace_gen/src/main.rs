use std::fs::File;
use std::io::{self, BufWriter, Write};

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use csim::{Access, AccessKind};

#[derive(Parser)]
#[command(
    name = "trace_gen",
    version = "0.1",
    about = "Generate a random Valgrind lackey-style memory trace"
)]
struct Cli {
    /// Number of records to write
    #[arg(short = 'n', long, default_value = "1000")]
    count: usize,

    /// Seed for the random number generator
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Size in bytes of the address range data accesses fall into
    #[arg(short, long, default_value = "4096")]
    footprint: u64,

    /// Base address of the data region
    #[arg(long, default_value = "0x7ff000000", value_parser = parse_hex)]
    base: u64,

    /// Bytes touched per access
    #[arg(long, default_value = "8")]
    size: u32,

    /// Probability of re-touching one of the recently used addresses
    #[arg(long, default_value = "0.5")]
    reuse: f64,

    /// Fraction of records that are instruction fetches
    #[arg(long, default_value = "0.2")]
    fetch_ratio: f64,

    /// Fraction of data records that are stores
    #[arg(long, default_value = "0.25")]
    store_ratio: f64,

    /// Fraction of data records that are modifies
    #[arg(long, default_value = "0.15")]
    modify_ratio: f64,

    /// Output file, stdout when omitted
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<String>,
}

fn parse_hex(text: &str) -> Result<u64, String> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16).map_err(|err| err.to_string())
}

/// Keeps the last few data addresses so later accesses can reuse them.
struct Generator {
    rng: StdRng,
    recent: Vec<u64>,
    next_pc: u64,
}

const RECENT_WINDOW: usize = 16;
const TEXT_BASE: u64 = 0x0400_0000;

impl Generator {
    fn new(seed: u64) -> Generator {
        Generator {
            rng: StdRng::seed_from_u64(seed),
            recent: Vec::with_capacity(RECENT_WINDOW),
            next_pc: TEXT_BASE,
        }
    }

    fn next_access(&mut self, cli: &Cli) -> Access {
        if self.rng.gen_bool(cli.fetch_ratio) {
            let pc = self.next_pc;
            self.next_pc += u64::from(self.rng.gen_range(2..=8u32));
            return Access::new(AccessKind::InstructionFetch, pc, 4);
        }

        let address = if !self.recent.is_empty() && self.rng.gen_bool(cli.reuse) {
            self.recent[self.rng.gen_range(0..self.recent.len())]
        } else {
            let offset = self.rng.gen_range(0..cli.footprint.max(1));
            let address = cli.base.wrapping_add(offset);
            if self.recent.len() == RECENT_WINDOW {
                self.recent.remove(0);
            }
            self.recent.push(address);
            address
        };

        let roll: f64 = self.rng.gen();
        let kind = if roll < cli.store_ratio {
            AccessKind::Store
        } else if roll < cli.store_ratio + cli.modify_ratio {
            AccessKind::Modify
        } else {
            AccessKind::Load
        };
        Access::new(kind, address, cli.size)
    }
}

fn write_trace<W: Write>(cli: &Cli, out: &mut W) -> io::Result<()> {
    let mut generator = Generator::new(cli.seed);
    for _ in 0..cli.count {
        writeln!(out, "{}", generator.next_access(cli))?;
    }
    out.flush()
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace_gen=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    for (name, value) in [
        ("reuse", cli.reuse),
        ("fetch-ratio", cli.fetch_ratio),
        ("store-ratio", cli.store_ratio),
        ("modify-ratio", cli.modify_ratio),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("--{} must be between 0 and 1, got {}", name, value),
            ));
        }
    }

    info!(count = cli.count, seed = cli.seed, "generating trace");
    match &cli.output {
        Some(path) => write_trace(&cli, &mut BufWriter::new(File::create(path)?)),
        None => write_trace(&cli, &mut io::stdout().lock()),
    }
}
