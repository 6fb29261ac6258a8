use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use subflac_core::options::DEFAULT_CHUNK_SIZE;
use subflac_core::{ExtractRequest, Options, Subflac};
use subflac_meta::Metadata;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "subflac",
    about = "Cut time-range subclips out of FLAC files without decoding or re-encoding",
    version
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the frames covering [start, end) as a standalone FLAC file
    Extract {
        /// Source FLAC file
        input: PathBuf,
        /// Destination file
        output: PathBuf,
        /// Start time in seconds
        #[arg(short, long)]
        start: f64,
        /// End time in seconds (exclusive)
        #[arg(short, long)]
        end: f64,
        /// Bytes read from the source per chunk (default: 65536 = 64 KB)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Zero the MD5 signature, which no longer matches the cut audio
        #[arg(long)]
        clear_md5: bool,
    },
    /// Print STREAMINFO and the metadata block directory
    Inspect {
        /// FLAC file to inspect
        file: PathBuf,
        /// Print SEEKTABLE points
        #[arg(long)]
        seekpoints: bool,
    },
    /// Find the first valid frame header at or after each byte offset
    Locate {
        file: PathBuf,
        #[arg(short, long = "offset", required = true)]
        offsets: Vec<u64>,
    },
    /// Find the byte address of each frame index
    Seek {
        file: PathBuf,
        #[arg(short, long = "frame", required = true)]
        frames: Vec<u64>,
    },
    /// Resolve a time range to frame-aligned byte addresses
    Interval {
        file: PathBuf,
        #[arg(short, long)]
        start: f64,
        #[arg(short, long)]
        end: f64,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn configure_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn open_session(path: &Path, options: Options) -> anyhow::Result<(Metadata, Subflac<BufReader<File>>)> {
    let meta = subflac_meta::parse_file(path)?;
    let file = File::open(path).with_context(|| format!("opening input file {:?}", path))?;
    let session = Subflac::new(BufReader::new(file), meta.core_info())?
        .with_options(options)
        .with_audio_offset(meta.audio_offset);
    Ok((meta, session))
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_extract(
    input: PathBuf,
    output: PathBuf,
    request: ExtractRequest,
    chunk_size: usize,
) -> anyhow::Result<()> {
    if request.end_seconds < request.start_seconds {
        anyhow::bail!(
            "end time {} precedes start time {}",
            request.end_seconds,
            request.start_seconds
        );
    }
    if output.exists() && output.canonicalize()? == input.canonicalize()? {
        anyhow::bail!("output {:?} is the input file", output);
    }

    let options = Options {
        chunk_size,
        ..Options::default()
    };
    let (_, mut session) = open_session(&input, options)?;
    let block_size = session.stream_info().block_size_max;

    let t0 = Instant::now();
    let mut extraction = session
        .extract(&request)
        .with_context(|| format!("cutting [{}s, {}s) from {:?}", request.start_seconds, request.end_seconds, input))?;

    let file = File::create(&output).with_context(|| format!("creating output file {:?}", output))?;
    let mut dst = BufWriter::new(file);
    let written = io::copy(&mut extraction, &mut dst)?;
    dst.flush()?;
    let elapsed = t0.elapsed();

    let interval = *extraction.interval();
    info!(written, frames = interval.frame_count(), "wrote subclip");

    eprintln!("  frames      : {} .. {} ({})", interval.start_frame, interval.end_frame, interval.frame_count());
    eprintln!("  samples     : {} ({} per block)", extraction.sample_count(), block_size);
    eprintln!("  renumbered  : {}", extraction.frames_renumbered());
    eprintln!("  source span : {} .. {}", interval.start_address, interval.end_address);
    eprintln!("  header      : {}", human_bytes(extraction.header_len() as u64));
    eprintln!("  output size : {}", human_bytes(written));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, show_seekpoints: bool) -> anyhow::Result<()> {
    let meta = subflac_meta::parse_file(&file)?;
    let info = &meta.stream_info;
    let core = meta.core_info();

    println!("=== FLAC File: {:?} ===", file);
    println!();
    println!("  min block size : {}", info.block_size_min);
    println!("  max block size : {}", info.block_size_max);
    println!("  min frame size : {}", info.frame_size_min);
    println!("  max frame size : {}", info.frame_size_max);
    println!("  sample rate    : {} Hz", info.sample_rate);
    println!("  channels       : {}", info.channels);
    println!("  bits/sample    : {}", info.bits_per_sample);
    println!("  total samples  : {}", info.total_samples);
    println!("  duration       : {:.3}s", core.duration());
    println!("  blocking       : {:?}", core.blocking_strategy());
    if info.md5_is_set() {
        println!("  md5            : {}", info.md5_hex());
    } else {
        println!("  md5            : (not set)");
    }
    println!("  audio offset   : {}", meta.audio_offset);
    println!("  file on disk   : {}", human_bytes(meta.file_size));

    println!();
    println!("  {:>6}  {:>14}  {:>10}  {:<16}", "block", "file offset", "length", "type");
    println!("  {}", "-".repeat(52));
    for (i, b) in meta.blocks.iter().enumerate() {
        println!(
            "  {:>6}  {:>14}  {:>10}  {:<16}",
            i,
            b.offset,
            b.header.length,
            b.header.block_type.to_string()
        );
    }

    if show_seekpoints {
        println!();
        println!("  {:>6}  {:>14}  {:>14}  {:>8}", "point", "sample", "offset", "samples");
        println!("  {}", "-".repeat(50));
        for (i, p) in meta.seek_points.iter().enumerate() {
            if p.is_placeholder() {
                println!("  {:>6}  {:>14}", i, "placeholder");
            } else {
                println!(
                    "  {:>6}  {:>14}  {:>14}  {:>8}",
                    i, p.sample_number, p.stream_offset, p.frame_samples
                );
            }
        }
    }

    Ok(())
}

fn run_locate(file: PathBuf, offsets: Vec<u64>) -> anyhow::Result<()> {
    let (_, mut session) = open_session(&file, Options::default())?;
    for offset in offsets {
        println!("from {}:", offset);
        match session.locate(offset) {
            Ok(loc) => {
                println!("  sync code at  : {} (rel {})", loc.address, loc.relative_offset);
                println!("  number        : {}", loc.number);
                println!("  field length  : {}", loc.number_field_length);
                println!("  header length : {}", loc.header_length);
                println!("  crc8          : {:02X}", loc.checksum);
            }
            Err(e) => println!("  error         : {}", e),
        }
    }
    Ok(())
}

fn run_seek(file: PathBuf, frames: Vec<u64>) -> anyhow::Result<()> {
    let (_, mut session) = open_session(&file, Options::default())?;
    for frame in frames {
        let t = Instant::now();
        match session.find_frame_for_sample(frame) {
            Ok(loc) => println!(
                "  frame {:>8} at {:>12}  ({:.3}ms)",
                loc.number,
                loc.address,
                t.elapsed().as_secs_f64() * 1000.0
            ),
            Err(e) => println!("  frame {:>8} : {}", frame, e),
        }
    }
    Ok(())
}

fn run_interval(file: PathBuf, start: f64, end: f64) -> anyhow::Result<()> {
    let (_, mut session) = open_session(&file, Options::default())?;
    let interval = session.resolve_interval(start, end)?;
    println!("  start : frame {} at {}", interval.start_frame, interval.start_address);
    println!("  end   : frame {} at {}", interval.end_frame, interval.end_address);
    println!("  span  : {} frames, {}", interval.frame_count(), human_bytes(interval.byte_len()));
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    configure_logging(cli.verbose);
    match cli.command {
        Commands::Extract {
            input,
            output,
            start,
            end,
            chunk_size,
            clear_md5,
        } => {
            let request = ExtractRequest::new(start, end).with_clear_md5(clear_md5);
            run_extract(input, output, request, chunk_size)
        }
        Commands::Inspect { file, seekpoints } => run_inspect(file, seekpoints),
        Commands::Locate { file, offsets } => run_locate(file, offsets),
        Commands::Seek { file, frames } => run_seek(file, frames),
        Commands::Interval { file, start, end } => run_interval(file, start, end),
    }
}
