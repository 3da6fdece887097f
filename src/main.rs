use std::io::Write;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn, Level};

use subsmat_rust::count::{self, CountOpt};
use subsmat_rust::io::{fasta, table};
use subsmat_rust::matrix::{Alphabet, RenderOpt};
use subsmat_rust::pipeline::{self, LogOddsOpt};
use subsmat_rust::report::{MatrixReport, ReportMeta};

#[derive(Parser, Debug)]
#[command(name = "subsmat-rust", author, version, about = "Build log-odds substitution matrices from replacement counts", arg_required_else_help = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count accepted replacements in an aligned FASTA file
    Count {
        /// Aligned FASTA (all rows the same length)
        alignment: String,
        /// Only count these symbols, e.g. ARNDCQEGHILKMFPSTWYV
        #[arg(long)]
        alphabet: Option<String>,
        /// Added to every cell after counting
        #[arg(long, default_value_t = 0.0)]
        pseudocount: f64,
        /// Output path (stdout if omitted)
        #[arg(short, long)]
        out: Option<String>,
        /// Worker threads for column counting (0 = one per core)
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
    },
    /// Build a log-odds matrix from a pair-count table
    Build {
        /// Pair-count table, one `A C count` per line (full or half matrix)
        counts: String,
        /// Background frequency table, one `A freq` per line (derived from counts if omitted)
        #[arg(long)]
        freqs: Option<String>,
        /// The frequency table holds counts and is normalized on load
        #[arg(long, requires = "freqs")]
        freq_counts: bool,
        #[arg(long = "log-base", default_value_t = 10.0)]
        log_base: f64,
        #[arg(long = "scale", default_value_t = 10.0)]
        scale_factor: f64,
        /// Decimal digits kept after rounding (0 = integers)
        #[arg(long = "round", default_value_t = 0, allow_hyphen_values = true)]
        round_digits: i32,
        /// Axis order for the printed matrix
        #[arg(long)]
        order: Option<String>,
        /// Matrix name, e.g. BLOSUM62
        #[arg(long, default_value = "")]
        name: String,
        /// Emit a JSON report instead of a triangular table
        #[arg(long)]
        json: bool,
        #[arg(long = "cell-width", default_value_t = 4)]
        cell_width: usize,
        #[arg(long, default_value_t = 0)]
        precision: usize,
        /// Output path (stdout if omitted)
        #[arg(short, long)]
        out: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Count { alignment, alphabet, pseudocount, out, threads } => {
            configure_threads(threads);
            let alphabet = alphabet
                .map(|s| Alphabet::new(s.trim().as_bytes()))
                .transpose()
                .context("invalid --alphabet")?;
            run_count(&alignment, CountOpt { alphabet, pseudocount }, out.as_deref())
        }
        Commands::Build {
            counts,
            freqs,
            freq_counts,
            log_base,
            scale_factor,
            round_digits,
            order,
            name,
            json,
            cell_width,
            precision,
            out,
        } => {
            let opt = BuildArgs {
                freqs,
                freq_mode: if freq_counts { table::FreqMode::Counts } else { table::FreqMode::Frequencies },
                lo: LogOddsOpt { log_base, scale_factor, round_digits },
                order,
                name,
                json,
                render: RenderOpt { cell_width, precision },
            };
            run_build(&counts, opt, out.as_deref())
        }
    }
}

struct BuildArgs {
    freqs: Option<String>,
    freq_mode: table::FreqMode,
    lo: LogOddsOpt,
    order: Option<String>,
    name: String,
    json: bool,
    render: RenderOpt,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// 按 `-t` 建立全局 rayon 线程池；0 表示由 rayon 自行决定。
/// 全局池已存在时只记录警告并返回 false。
fn configure_threads(threads: usize) -> bool {
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        Ok(()) => true,
        Err(e) => {
            warn!(threads, error = %e, "cannot configure thread pool, using existing pool");
            false
        }
    }
}

fn open_output(out_path: Option<&str>) -> Result<Box<dyn Write>> {
    Ok(if let Some(p) = out_path {
        let fh = std::fs::File::create(p).with_context(|| format!("cannot create output '{}'", p))?;
        Box::new(std::io::BufWriter::new(fh))
    } else {
        Box::new(std::io::BufWriter::new(std::io::stdout()))
    })
}

fn open_input(path: &str, what: &str) -> Result<std::io::BufReader<std::fs::File>> {
    let fh = std::fs::File::open(path).with_context(|| format!("cannot open {} '{}'", what, path))?;
    Ok(std::io::BufReader::new(fh))
}

fn run_count(alignment: &str, opt: CountOpt, out_path: Option<&str>) -> Result<()> {
    let records = fasta::read_alignment(open_input(alignment, "alignment")?)
        .with_context(|| format!("cannot read alignment '{}'", alignment))?;
    info!(sequences = records.len(), "alignment loaded");

    let rows: Vec<Vec<u8>> = records.into_iter().map(|r| r.seq).collect();
    let counts = count::count_replacements(&rows, &opt)?;

    let mut out = open_output(out_path)?;
    table::write_pair_table(&counts, &mut out)?;
    out.flush()?;
    Ok(())
}

fn run_build(counts_path: &str, args: BuildArgs, out_path: Option<&str>) -> Result<()> {
    let counts = table::read_count_matrix(open_input(counts_path, "count table")?, None, args.name.as_str())
        .with_context(|| format!("cannot read count table '{}'", counts_path))?;
    info!(symbols = counts.alphabet().len(), cells = counts.len(), "count table loaded");

    let freq_table = match &args.freqs {
        Some(p) => Some(
            table::read_frequency_table(open_input(p, "frequency table")?, args.freq_mode)
                .with_context(|| format!("cannot read frequency table '{}'", p))?,
        ),
        None => None,
    };

    let lo = pipeline::make_log_odds_matrix(&counts, freq_table.as_ref(), &args.lo)?;
    let obs = pipeline::build_obs_freq_mat(&counts)?;
    let entropy = lo.entropy(&obs)?;
    info!(entropy, "log-odds matrix built");

    let mut out = open_output(out_path)?;
    if args.json {
        let report = MatrixReport::new(&lo, args.lo, Some(entropy), ReportMeta::capture(Some(counts_path)));
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        if !lo.name().is_empty() {
            writeln!(out, "# {}", lo.name())?;
        }
        lo.render(&mut out, args.order.as_deref().map(str::as_bytes), &args.render)?;
        writeln!(out, "# entropy = {:.4} bits", entropy)?;
    }
    out.flush()?;
    Ok(())
}
