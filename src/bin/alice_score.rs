//! ALICE-Score CLI
//!
//! Scores a corpus against a language model index and prints perplexity.

use alice_score::{read_model_type, ALICEScoreError, AnyModel, CorpusReader, ModelType, Report};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "alice-score")]
#[command(author = "Moroya Sakamoto")]
#[command(version = "1.0.0")]
#[command(about = "Score a corpus against an n-gram language model index")]
#[command(long_about = r#"
ALICE-Score: Corpus Perplexity Scoring

Principle:
  Corpus line → State reset → score(w1) → score(w2) → ...
    → Corpus totals (all tokens / OOV tokens only)
    → Perplexity = 10^(-total / tokens)

One sentence per line. Use - to read the corpus from stdin.
"#)]
struct Cli {
    /// Index filename
    index_filename: PathBuf,

    /// Corpus filename (use - for stdin)
    corpus_filename: PathBuf,

    /// Print per-sentence scores as JSON lines on stderr
    #[arg(long)]
    sentences: bool,

    /// Output format: text, json
    #[arg(short, long, default_value = "text")]
    format: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help / --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    };

    if let Err(e) = run(&cli) {
        match e {
            ALICEScoreError::UnsupportedModelType(tag) => {
                eprintln!("Error: score() not supported with type '{}'.", tag);
            }
            other => eprintln!("Error: {}", other),
        }
        process::exit(1);
    }
}

fn run(cli: &Cli) -> alice_score::Result<()> {
    let tag = read_model_type(&cli.index_filename)?;
    if ModelType::from_tag(&tag).is_none() {
        return Err(ALICEScoreError::UnsupportedModelType(tag));
    }

    let model = AnyModel::load(&cli.index_filename)?;
    let mut corpus = CorpusReader::open(&cli.corpus_filename)?;

    let stats = if cli.sentences {
        let stderr = io::stderr();
        model.score_corpus_with(&mut corpus, |sentence| {
            let written = serde_json::to_string(sentence)
                .map_err(ALICEScoreError::from)
                .and_then(|line| Ok(writeln!(stderr.lock(), "{}", line)?));
            if let Err(e) = written {
                log::warn!("Failed to write score of sentence {}: {}", sentence.sentence, e);
            }
        })?
    } else {
        model.score_corpus(&mut corpus)?
    };

    let report = Report::new(stats);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format.to_lowercase().as_str() {
        "json" => report.write_json(&mut out)?,
        "text" => report.write_text(&mut out)?,
        _ => {
            eprintln!("Unknown format: {}. Using text.", cli.format);
            report.write_text(&mut out)?;
        }
    }
    out.flush()?;

    Ok(())
}
