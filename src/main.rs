use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use csim::driver::{run_file, RunOptions};
use csim::SimError;

#[derive(Parser)]
#[command(
    name = "csim",
    version = "0.1",
    about = "Set-associative LRU write-back cache simulator for Valgrind lackey traces"
)]
struct Cli {
    /// Number of set index bits (the cache has 2^s sets)
    #[arg(short = 's', value_name = "S")]
    set_index_bits: u32,

    /// Associativity (number of lines per set)
    #[arg(short = 'E', value_name = "E")]
    associativity: usize,

    /// Number of block offset bits (blocks are 2^b bytes)
    #[arg(short = 'b', value_name = "B")]
    block_offset_bits: u32,

    /// The path of the trace file to replay
    #[arg(short = 't', long, value_name = "TRACE_FILE")]
    trace: PathBuf,

    /// Log every access with its outcome
    #[arg(short, long)]
    verbose: bool,

    /// Also write the summary as CSV to this path
    #[arg(long, value_name = "CSV_FILE")]
    csv: Option<PathBuf>,

    /// Print the final cache state
    #[arg(long)]
    dump: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "csim=debug" } else { "csim=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), SimError> {
    let options = RunOptions {
        set_index_bits: cli.set_index_bits,
        associativity: cli.associativity,
        block_offset_bits: cli.block_offset_bits,
        trace: cli.trace,
        csv: cli.csv,
    };
    let (simulator, report) = run_file(&options)?;

    if cli.dump {
        simulator
            .cache()
            .dump(&mut io::stdout().lock())
            .map_err(|source| SimError::Io {
                path: "<stdout>".to_string(),
                source,
            })?;
    }

    println!("{}", report.summary);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut source = err.source();
            error!("{}", err);
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
