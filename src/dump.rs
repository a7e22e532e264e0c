
use std::path::PathBuf;

use tracing::info;

use super::download::{download_dump, DumpSource, Fetch};
use super::error::Result;
use super::tools::{run_converter, run_extractor};
use super::tsv::convert_jsonl_to_tsv;
use super::util::*;


/// Inputs of the dump based pipeline.
#[derive(Debug, Clone)]
pub struct DumpPipeline {
    pub source_lang: String,
    pub target_lang: String,
    pub dump: DumpSource,
    pub jsonl_file: PathBuf,
    pub csv_file: PathBuf,
    pub stardict_file: PathBuf,
    pub extractor: ToolCommand,
    pub converter: ToolCommand,
}

impl DumpPipeline {
    /// Download, extract, reformat, convert. Stops at the first failing stage.
    pub fn run<F: Fetch + ?Sized>(&self, fetcher: &F) -> Result<()> {
        info!(
            "Building {} -> {} dictionary from {}",
            self.source_lang, self.target_lang, self.dump.url
        );
        download_dump(fetcher, &self.dump)?;
        run_extractor(&self.extractor, &self.dump.file, &self.jsonl_file)?;
        convert_jsonl_to_tsv(&self.jsonl_file, &self.csv_file, &self.target_lang)?;
        run_converter(&self.converter, &self.csv_file, &self.stardict_file)?;
        info!("Dictionary written to {}.", self.stardict_file.display());
        Ok(())
    }
}
