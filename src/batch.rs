
use std::path::{Path, PathBuf};

use tracing::info;

use super::download::Fetch;
use super::error::Result;
use super::kaikki::DictionaryCreator;


pub const HOME_LANGUAGE: &str = "Czech";

pub const LANGUAGES: [&str; 10] = [
    "Italian",
    "French",
    "Latin",
    "Polish",
    "Esperanto",
    "Hungarian",
    "Translingual",
    "Serbo-Croatian",
    "Slovak",
    "Spanish",
];

pub const AUTHOR: &str = "hPa";

/// Builds one directional dictionary, `<from>-<to>-dict.ifo` in `work_dir`.
/// `local_data` replaces the download with local JSONL files.
pub fn extract_dict<F: Fetch + ?Sized>(
    fetcher: &F,
    from: &str,
    to: &str,
    work_dir: &Path,
    local_data: Option<&Path>,
) -> Result<PathBuf> {
    info!("Building {} -> {} dictionary ...", from, to);
    let output = PathBuf::from(format!("{}-{}-dict.ifo", from, to));

    let mut creator = DictionaryCreator::new(from, to, fetcher, work_dir);
    match local_data {
        Some(path) => {
            creator.use_local_data(path)?;
        }
        None => {
            creator.download_data_from_kaikki()?;
        }
    }
    creator.create_database()?;
    let summary = creator.export_to_stardict(AUTHOR, &format!("{} to {} dictionary", from, to), &output)?;
    info!(
        "{} -> {}: {} words, {} forms.",
        from, to, summary.words, summary.synonyms
    );

    Ok(work_dir.join(output))
}

/// Builds both directions against the home language for every language.
/// The first failure aborts the remaining builds.
pub fn run_batch<F: Fetch + ?Sized>(fetcher: &F, work_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut built = Vec::with_capacity(LANGUAGES.len() * 2);
    for lang in LANGUAGES.iter() {
        built.push(extract_dict(fetcher, HOME_LANGUAGE, lang, work_dir, None)?);
        built.push(extract_dict(fetcher, lang, HOME_LANGUAGE, work_dir, None)?);
    }
    info!("Built {} dictionaries.", built.len());
    Ok(built)
}
