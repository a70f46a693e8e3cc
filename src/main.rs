//! KMR: sorted k-mer stream toolkit
//!
//! Usage: kmr <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use env_logger::Env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use kmr::checkpoints::{checkpoints, checkpoints_seeded};
use kmr::commands::{
    CountCommand, FilterCommand, HasCommand, KeysCommand, MergeCommand, ViewCommand,
};
use kmr::counts::CountMode;
use kmr::{config, io as kio, KmrError, PayloadKind, Result};

#[derive(Parser)]
#[command(name = "kmr")]
#[command(version)]
#[command(about = "KMR: sorted k-mer stream toolkit - count, filter, view and k-way merge k-mer tuples", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Log progress every N items
    #[arg(long, global = true, default_value_t = config::DEFAULT_PROGRESS_INTERVAL)]
    progress_every: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge sorted tuple files into one sorted file
    Merge {
        /// Payload type: cnt, has, prf or genes
        #[arg(short = 't', long = "type", value_parser = parse_payload)]
        payload: PayloadKind,

        /// Output file (.gz to compress, - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// File listing input files, one per line
        #[arg(short = 'f', long)]
        file_list: Option<PathBuf>,

        /// Input part number (1-based)
        #[arg(long, default_value_t = 1)]
        part: usize,

        /// Number of input parts
        #[arg(long, default_value_t = 1)]
        nparts: usize,

        /// Print merge statistics to stderr
        #[arg(long)]
        stats: bool,

        /// Input tuple files
        inputs: Vec<String>,
    },

    /// Print a tuple file as text
    View {
        /// Payload type: cnt, has, prf or genes
        #[arg(short = 't', long = "type", value_parser = parse_payload)]
        payload: PayloadKind,

        /// Print at most N tuples
        #[arg(short = 'n', long)]
        limit: Option<u64>,

        /// Input tuple file (use - for stdin)
        input: PathBuf,
    },

    /// Build a sorted count file from kmer<TAB>count text
    Count {
        /// Output file (.gz to compress, - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// File listing input files, one per line
        #[arg(short = 'f', long)]
        file_list: Option<PathBuf>,

        /// Count samples containing each k-mer instead of summing counts
        #[arg(long)]
        samples: bool,

        /// Input part number (1-based)
        #[arg(long, default_value_t = 1)]
        part: usize,

        /// Number of input parts
        #[arg(long, default_value_t = 1)]
        nparts: usize,

        /// K-mer part number (1-based)
        #[arg(long, default_value_t = 1)]
        kmer_part: usize,

        /// Number of k-mer parts
        #[arg(long, default_value_t = 1)]
        kmer_parts: usize,

        /// Print counting statistics to stderr
        #[arg(long)]
        stats: bool,

        /// Input text files
        inputs: Vec<String>,
    },

    /// Keep the k-mers of a sorted count file with at least a minimum count
    Filter {
        /// Smallest count kept
        #[arg(short = 'n', long = "min", default_value_t = 0)]
        min_count: u64,

        /// Output file (.gz to compress, - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Delete the input file after a successful run
        #[arg(short = 'd', long)]
        delete_input: bool,

        /// Print filter statistics to stderr
        #[arg(long)]
        stats: bool,

        /// Input count file (use - for stdin)
        input: PathBuf,
    },

    /// Record which samples contain each k-mer of a whitelist
    Has {
        /// Sorted count file whose keys form the whitelist
        #[arg(short, long)]
        whitelist: PathBuf,

        /// Output file (.gz to compress, - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// File listing sample files, one per line
        #[arg(short = 'f', long)]
        file_list: Option<PathBuf>,

        /// Input part number (1-based)
        #[arg(long, default_value_t = 1)]
        part: usize,

        /// Number of input parts
        #[arg(long, default_value_t = 1)]
        nparts: usize,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,

        /// Sample files of kmer<TAB>count text, in sample order
        inputs: Vec<String>,
    },

    /// Write the keys of a tuple file as a condensed key dump
    Keys {
        /// Payload type of the input: cnt, has, prf or genes
        #[arg(short = 't', long = "type", value_parser = parse_payload, required_unless_present = "print")]
        payload: Option<PayloadKind>,

        /// Output file (.gz to compress, - for stdout)
        #[arg(short, long, required_unless_present = "print")]
        output: Option<PathBuf>,

        /// Print an existing key dump as DNA instead
        #[arg(long)]
        print: bool,

        /// Input file (use - for stdin)
        input: PathBuf,
    },

    /// Print checkpoints that split the k-mer space into N buckets
    Checkpoints {
        /// Number of checkpoints
        #[arg(short = 'n', long)]
        count: usize,

        /// Random seed (default: random)
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn parse_payload(s: &str) -> std::result::Result<PayloadKind, String> {
    PayloadKind::from_str(s).ok_or_else(|| {
        format!(
            "unknown payload type '{}' (expected cnt, has, prf or genes)",
            s
        )
    })
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    config::set_progress_interval(cli.progress_every);

    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Merge {
            payload,
            output,
            file_list,
            part,
            nparts,
            stats,
            inputs,
        } => run_merge(payload, output, file_list, part, nparts, stats, inputs),

        Commands::View {
            payload,
            limit,
            input,
        } => run_view(payload, limit, input),

        Commands::Count {
            output,
            file_list,
            samples,
            part,
            nparts,
            kmer_part,
            kmer_parts,
            stats,
            inputs,
        } => run_count(
            output, file_list, samples, part, nparts, kmer_part, kmer_parts, stats, inputs,
        ),

        Commands::Filter {
            min_count,
            output,
            delete_input,
            stats,
            input,
        } => run_filter(min_count, output, delete_input, stats, input),

        Commands::Has {
            whitelist,
            output,
            file_list,
            part,
            nparts,
            stats,
            inputs,
        } => run_has(whitelist, output, file_list, part, nparts, stats, inputs),

        Commands::Keys {
            payload,
            output,
            print,
            input,
        } => run_keys(payload, output, print, input),

        Commands::Checkpoints { count, seed } => run_checkpoints(count, seed),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Convert a 1-based command line part number to 0-based.
fn zero_based(part: usize, nparts: usize) -> Result<usize> {
    if part == 0 || part > nparts {
        return Err(KmrError::InvalidInput(format!(
            "part must be between 1 and {}, got {}",
            nparts, part
        )));
    }
    Ok(part - 1)
}

/// Inputs given as arguments, plus any listed in `file_list`.
fn collect_inputs(mut inputs: Vec<String>, file_list: Option<PathBuf>) -> Result<Vec<String>> {
    if let Some(list) = file_list {
        for line in kio::open(&list)?.lines() {
            let line = line?;
            let line = line.trim();
            if !line.is_empty() {
                inputs.push(line.to_string());
            }
        }
    }
    if inputs.is_empty() {
        return Err(KmrError::InvalidInput("got no input files".to_string()));
    }
    Ok(inputs)
}

fn run_merge(
    payload: PayloadKind,
    output: PathBuf,
    file_list: Option<PathBuf>,
    part: usize,
    nparts: usize,
    stats: bool,
    inputs: Vec<String>,
) -> Result<()> {
    let inputs = collect_inputs(inputs, file_list)?;
    let part = zero_based(part, nparts)?;
    let result = MergeCommand::new(payload)
        .with_part(part, nparts)
        .run(&inputs, &output)?;
    if stats {
        eprintln!("Merge stats: {}", result);
    }
    Ok(())
}

fn run_view(payload: PayloadKind, limit: Option<u64>, input: PathBuf) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let cmd = ViewCommand::new(payload).with_limit(limit);
    match cmd.run(&input, &mut handle) {
        Err(KmrError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.map(|_| ()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_count(
    output: PathBuf,
    file_list: Option<PathBuf>,
    samples: bool,
    part: usize,
    nparts: usize,
    kmer_part: usize,
    kmer_parts: usize,
    stats: bool,
    inputs: Vec<String>,
) -> Result<()> {
    let inputs = collect_inputs(inputs, file_list)?;
    let mode = if samples {
        CountMode::Samples
    } else {
        CountMode::Occurrences
    };
    let result = CountCommand::new()
        .with_mode(mode)
        .with_part(zero_based(part, nparts)?, nparts)
        .with_kmer_part(zero_based(kmer_part, kmer_parts)?, kmer_parts)
        .run(&inputs, &output)?;
    if stats {
        eprintln!("Count stats: {}", result);
    }
    Ok(())
}

fn run_filter(
    min_count: u64,
    output: PathBuf,
    delete_input: bool,
    stats: bool,
    input: PathBuf,
) -> Result<()> {
    let result = FilterCommand::new(min_count)
        .with_delete_input(delete_input)
        .run(&input, &output)?;
    if stats {
        eprintln!("Filter stats: {}", result);
    }
    Ok(())
}

fn run_has(
    whitelist: PathBuf,
    output: PathBuf,
    file_list: Option<PathBuf>,
    part: usize,
    nparts: usize,
    stats: bool,
    inputs: Vec<String>,
) -> Result<()> {
    let inputs = collect_inputs(inputs, file_list)?;
    let result = HasCommand::new()
        .with_part(zero_based(part, nparts)?, nparts)
        .run(&whitelist, &inputs, &output)?;
    if stats {
        eprintln!("Has stats: {}", result);
    }
    Ok(())
}

fn run_keys(
    payload: Option<PayloadKind>,
    output: Option<PathBuf>,
    print: bool,
    input: PathBuf,
) -> Result<()> {
    if print {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        KeysCommand::print(kio::open(&input)?, &mut handle)?;
        return Ok(());
    }
    match (payload, output) {
        (Some(payload), Some(output)) => {
            KeysCommand::new(payload).run(&input, &output)?;
            Ok(())
        }
        _ => Err(KmrError::InvalidInput(
            "--type and --output are required".to_string(),
        )),
    }
}

fn run_checkpoints(n: usize, seed: Option<u64>) -> Result<()> {
    let cps = match seed {
        Some(s) => checkpoints_seeded(n, s),
        None => checkpoints(n),
    };
    let stdout = io::stdout();
    let mut handle = io::BufWriter::new(stdout.lock());
    for cp in &cps {
        writeln!(handle, "{}", cp)?;
    }
    handle.flush()?;
    Ok(())
}
