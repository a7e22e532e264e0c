
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tracing::{debug, info};

use super::error::Result;
use super::util::*;


/// Transfers a remote resource into a local file.
pub trait Fetch {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Fetcher backed by a blocking HTTP client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<HttpFetcher> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            // Dumps take long to transfer, do not limit the whole request.
            .timeout(None::<Duration>)
            .build()?;
        Ok(HttpFetcher { client })
    }

    /// Fetches a small text resource into memory.
    pub fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        Ok(self.client.get(url).send()?.error_for_status()?.text()?)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!("GET {} -> {}", url, dest.display());
        let mut response = self.client.get(url).send()?.error_for_status()?;

        let written = write_body(&mut response, dest);

        // Leave nothing behind that would be taken for a finished download.
        if written.is_err() {
            let _ = std::fs::remove_file(dest);
        }
        written
    }
}

fn write_body(response: &mut Response, dest: &Path) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(dest)?);
    let n = response.copy_to(&mut writer)?;
    writer.flush()?;
    Ok(n)
}

/// Canonical dump address for a language code.
pub fn dump_url_for_lang(lang_code: &str) -> String {
    let lang = lang_code.to_lowercase();
    format!(
        "https://dumps.wikimedia.org/{lang}wiktionary/latest/{lang}wiktionary-latest-pages-articles.xml.bz2",
        lang = lang
    )
}

/// Location of the dump: URL and local file, both derived when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSource {
    pub url: String,
    pub file: PathBuf,
}

impl DumpSource {
    pub fn resolve(lang_code: &str, url: Option<String>, file: Option<PathBuf>) -> DumpSource {
        let url = url.unwrap_or_else(|| dump_url_for_lang(lang_code));
        let file = file.unwrap_or_else(|| PathBuf::from(file_name_from_url(&url)));
        DumpSource { url, file }
    }
}

/// Downloads `url` into `dest` unless `dest` already exists.
/// Returns whether a transfer happened.
pub fn download_if_missing<F: Fetch + ?Sized>(fetcher: &F, url: &str, dest: &Path) -> Result<bool> {
    if dest.exists() {
        info!("{} already exists, skipping download.", dest.display());
        return Ok(false);
    }

    info!("Downloading {} ...", url);
    let size = fetcher.fetch(url, dest)?;
    info!("Downloaded {} bytes into {}.", size, dest.display());
    Ok(true)
}

/// Acquires the dump described by `source`.
pub fn download_dump<F: Fetch + ?Sized>(fetcher: &F, source: &DumpSource) -> Result<bool> {
    download_if_missing(fetcher, &source.url, &source.file)
}
