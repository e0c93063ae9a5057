//! ALICE-Score index builder
//!
//! Converts an ARPA language model into an ALICE-Score index.

use alice_score::{AnyModel, ArpaReader, CompressionMode, ModelType};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "alice-build")]
#[command(author = "Moroya Sakamoto")]
#[command(version = "1.0.0")]
#[command(about = "Build an ALICE-Score index from an ARPA file")]
struct Cli {
    /// Input ARPA file (use - for stdin)
    arpa: PathBuf,

    /// Output index file
    output: PathBuf,

    /// Model type: probing_hash, sorted_array
    #[arg(short = 't', long = "type", default_value = "probing_hash")]
    model_type: String,

    /// Compression level: fast, balanced, best
    #[arg(short, long, default_value = "balanced")]
    level: String,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> alice_score::Result<()> {
    let model_type: ModelType = cli.model_type.parse()?;

    // Parse compression level
    let compression_mode = match cli.level.to_lowercase().as_str() {
        "fast" => CompressionMode::Fast,
        "balanced" => CompressionMode::Balanced,
        "best" => CompressionMode::Best,
        _ => {
            eprintln!("Unknown level: {}. Using balanced.", cli.level);
            CompressionMode::Balanced
        }
    };

    // Read input
    let start = Instant::now();
    let reader: Box<dyn BufRead> = if cli.arpa.to_string_lossy() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&cli.arpa)?))
    };
    let arpa = ArpaReader::new().read(reader)?;

    // Build and write
    let model = AnyModel::build(model_type, &arpa);
    let mut writer = BufWriter::new(File::create(&cli.output)?);
    let written = model.write_to(&mut writer, compression_mode)?;
    writer.flush()?;
    let elapsed = start.elapsed();

    // Report
    if cli.verbose {
        println!("ALICE-Score Index Build");
        println!("=======================");
        println!("Input:      {}", cli.arpa.display());
        println!("Output:     {}", cli.output.display());
        println!("Type:       {}", model_type);
        println!("Level:      {:?}", compression_mode);
        println!();
        println!("Order:      {}", model.order());
        println!("Vocabulary: {} words", model.vocab_size());
        println!("N-grams:    {}", model.ngram_count());
        println!("Index size: {} bytes", written);
        println!("Time:       {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    } else {
        println!(
            "{} -> {} ({}, order {}, {} n-grams, {} bytes)",
            cli.arpa.display(),
            cli.output.display(),
            model_type,
            model.order(),
            model.ngram_count(),
            written
        );
    }

    Ok(())
}
