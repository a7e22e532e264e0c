
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod batch;
mod download;
mod dump;
mod error;
mod kaikki;
mod stardict;
mod tools;
mod tsv;
mod util;

use download::{DumpSource, HttpFetcher};
use dump::DumpPipeline;
use stardict::{Metadata, StardictBuilder};
use tools::{DEFAULT_CONVERTER, DEFAULT_EXTRACTOR};
use util::*;


#[derive(Parser)]
#[command(name = "wiktionary2stardict")]
#[command(about = "Builds Stardict dictionaries from Wiktionary data")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides it.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Extraction command, the output path and dump path are appended
    #[arg(long, global = true, env = "W2S_EXTRACTOR", default_value = DEFAULT_EXTRACTOR)]
    extractor: ToolCommand,

    /// Stardict converter command, the TSV path and output path are appended
    #[arg(long, global = true, env = "W2S_CONVERTER", default_value = DEFAULT_CONVERTER)]
    converter: ToolCommand,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download a Wiktionary dump, extract it and convert it to Stardict
    Dump {
        /// Source language code (ex. cs)
        source_lang: String,

        /// Target language (ex. italian)
        target_lang: String,

        /// Dump URL, derived from the source language when not given
        #[arg(long)]
        dump_url: Option<String>,

        /// Local dump file, derived from the URL when not given
        #[arg(long)]
        dump_file: Option<PathBuf>,

        /// JSONL file written by the extractor
        #[arg(long, default_value = "wiktextract.jsonl")]
        jsonl_file: PathBuf,

        /// Tab separated file passed to the converter
        #[arg(long, default_value = "dict.csv")]
        csv_file: PathBuf,

        /// Stardict output
        #[arg(long, default_value = "dict.stardict")]
        stardict_file: PathBuf,
    },

    /// Build Czech <-> language dictionaries for the fixed language list from Kaikki.org
    Batch {
        /// Directory for downloads and dictionaries
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
    },

    /// Build one Czech <-> language style dictionary, from Kaikki.org or local JSONL
    Build {
        /// Source language name or code (ex. Czech)
        #[arg(short, long)]
        from: String,

        /// Target language name or code (ex. Italian)
        #[arg(short, long)]
        to: String,

        /// Local JSONL file or directory of .jsonl files used instead of downloading
        #[arg(long)]
        jsonl: Option<PathBuf>,

        /// Directory for downloads and dictionaries
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
    },

    /// Convert a word/translation TSV into Stardict without the external converter
    Export {
        /// TSV file with a `word<TAB>translation` header
        csv_file: PathBuf,

        /// Output base path, a Stardict extension is stripped
        output: PathBuf,

        /// Dictionary name, the output file name when not given
        #[arg(long)]
        bookname: Option<String>,
    },

    /// Look a word up in a Stardict package
    View {
        /// Word to display
        #[arg(short, long)]
        word: String,

        /// Package base path or any of its files
        package: PathBuf,
    },

    /// List languages Kaikki.org publishes extracts for
    Langs,

    /// Print the entries of a Stardict .ifo, .idx, .syn or .dict file
    Cat {
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn export(csv_file: &Path, output: &Path, bookname: Option<String>) -> Result<()> {
    let rows = tsv::read_rows(csv_file).with_context(|| format!("reading {}", csv_file.display()))?;

    let base = stardict_base(output);
    let bookname = bookname.unwrap_or_else(|| {
        base.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let mut builder = StardictBuilder::new();
    let mut empty = 0;
    for (word, translation) in &rows {
        if translation.is_empty() {
            empty += 1;
            continue;
        }
        builder.add(word, translation);
    }
    info!(
        "{} rows read, {} without translation skipped, {} headwords.",
        rows.len(),
        empty,
        builder.len()
    );
    if builder.is_empty() {
        warn!("{} has no translated rows, the dictionary will be empty", csv_file.display());
    }

    let metadata = Metadata {
        bookname,
        author: None,
        description: Some(String::from("Generated from Wiktionary JSONL")),
    };
    builder.write(&base, &metadata)?;
    Ok(())
}

fn langs() -> Result<()> {
    let fetcher = HttpFetcher::new()?;
    let html = fetcher
        .get_text(kaikki::KAIKKI_INDEX_URL)
        .context("fetching Kaikki.org language list")?;
    let languages = kaikki::parse_language_list(&html);
    if languages.is_empty() {
        bail!("no languages found on {}", kaikki::KAIKKI_INDEX_URL);
    }
    for (name, senses) in languages {
        println!("{} ({})", name, senses);
    }
    Ok(())
}

fn cat(file: &Path) -> Result<()> {
    let ifo = stardict::read_ifo(&sibling_file(file, "ifo"))
        .with_context(|| format!("reading the .ifo file next to {}", file.display()))?;

    match file.extension().and_then(|e| e.to_str()) {
        Some("ifo") => {
            println!("bookname={}", ifo.bookname);
            println!("wordcount={}", ifo.wordcount);
            println!("synwordcount={}", ifo.synwordcount);
            println!("idxfilesize={}", ifo.idxfilesize);
            println!("idxoffsetbits={}", ifo.idxoffsetbits);
        }
        Some("idx") => {
            let entries = stardict::read_idx(file, ifo.idxoffsetbits)?;
            for entry in &entries {
                println!("{}", entry);
            }
            info!("Displayed {} IDX entries.", entries.len());
        }
        Some("syn") => {
            let entries = stardict::read_syn(file)?;
            for entry in &entries {
                println!("{}", entry);
            }
            info!("Displayed {} SYN entries.", entries.len());
        }
        Some("dict") => {
            let entries = stardict::read_idx(&sibling_file(file, "idx"), ifo.idxoffsetbits)?;
            for entry in &entries {
                let definition = stardict::read_definition(file, entry)?;
                println!("{}\t{}", entry.word, definition.replace('\n', "\\n"));
            }
            info!("Displayed {} definitions.", entries.len());
        }
        _ => bail!("{} is not a Stardict file", file.display()),
    }
    Ok(())
}

fn view(package: &Path, word: &str) -> Result<()> {
    let base = stardict_base(package);
    match stardict::lookup(&base, word).with_context(|| format!("reading {}", base.display()))? {
        Some((headword, definition)) => {
            info!("Found {} in {}.", headword, base.display());
            println!("{}", headword);
            println!("{}", definition);
            Ok(())
        }
        None => bail!("{} not found in {}", word, base.display()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Command::Dump {
            source_lang,
            target_lang,
            dump_url,
            dump_file,
            jsonl_file,
            csv_file,
            stardict_file,
        } => {
            let dump = DumpSource::resolve(&source_lang, dump_url, dump_file);
            let pipeline = DumpPipeline {
                source_lang,
                target_lang,
                dump,
                jsonl_file,
                csv_file,
                stardict_file,
                extractor: cli.extractor,
                converter: cli.converter,
            };
            let fetcher = HttpFetcher::new()?;
            pipeline.run(&fetcher).context("dump pipeline failed")?;
        }
        Command::Batch { work_dir } => {
            let fetcher = HttpFetcher::new()?;
            batch::run_batch(&fetcher, &work_dir).context("batch build failed")?;
        }
        Command::Build {
            from,
            to,
            jsonl,
            work_dir,
        } => {
            let fetcher = HttpFetcher::new()?;
            batch::extract_dict(&fetcher, &from, &to, &work_dir, jsonl.as_deref())
                .with_context(|| format!("building {} -> {} failed", from, to))?;
        }
        Command::Export {
            csv_file,
            output,
            bookname,
        } => export(&csv_file, &output, bookname)?,
        Command::Langs => langs()?,
        Command::View { word, package } => view(&package, &word)?,
        Command::Cat { file } => cat(&file)?,
    }

    Ok(())
}
