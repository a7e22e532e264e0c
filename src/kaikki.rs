
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::download::{download_if_missing, Fetch};
use super::error::{Error, Result};
use super::stardict::{Metadata, StardictBuilder, Summary};
use super::util::*;


pub const KAIKKI_INDEX_URL: &str = "https://kaikki.org/dictionary/index.html";

/// Form tags that describe inflection tables instead of real word forms.
const META_FORM_TAGS: [&str; 3] = ["table-tags", "inflection-template", "class"];

#[derive(Debug, Default, Deserialize)]
pub struct Sense {
    #[serde(default)]
    pub glosses: Vec<String>,
    #[serde(default)]
    pub raw_glosses: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub word: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Form {
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One line of a Kaikki.org extract.
#[derive(Debug, Default, Deserialize)]
pub struct KaikkiEntry {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub lang_code: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub senses: Vec<Sense>,
    #[serde(default)]
    pub translations: Vec<Translation>,
    #[serde(default)]
    pub forms: Vec<Form>,
}

impl KaikkiEntry {
    /// Glosses of all senses, raw glosses where a sense has none.
    pub fn glosses(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for sense in &self.senses {
            let glosses = if sense.glosses.is_empty() { &sense.raw_glosses } else { &sense.glosses };
            out.extend(glosses.iter().map(String::as_str).filter(|g| !g.is_empty()));
        }
        out
    }

    /// Translation words into the language given by name or code.
    pub fn translations_into(&self, target: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for t in &self.translations {
            let matches = [t.lang.as_deref(), t.code.as_deref()]
                .iter()
                .flatten()
                .any(|l| l.eq_ignore_ascii_case(target));
            if let (true, Some(word)) = (matches, t.word.as_deref()) {
                if !word.is_empty() && !out.contains(&word) {
                    out.push(word);
                }
            }
        }
        out
    }

    /// Inflected forms worth looking up.
    pub fn word_forms(&self) -> impl Iterator<Item = &str> {
        self.forms
            .iter()
            .filter(|f| !f.tags.iter().any(|t| META_FORM_TAGS.contains(&t.as_str())))
            .map(|f| f.form.as_str())
            .filter(|f| !f.is_empty() && *f != "-")
    }
}

/// Download address of the Kaikki.org extract for a language name,
/// ex. `Serbo-Croatian` -> `.../Serbo-Croatian/kaikki.org-dictionary-SerboCroatian.jsonl`.
pub fn kaikki_url(language: &str) -> String {
    let dir = language.replace(' ', "%20");
    let file: String = language.chars().filter(|c| *c != ' ' && *c != '-').collect();
    format!("https://kaikki.org/dictionary/{}/kaikki.org-dictionary-{}.jsonl", dir, file)
}

/// Extracts `(language, senses)` pairs from the Kaikki.org index page.
pub fn parse_language_list(html: &str) -> Vec<(String, u64)> {
    let re = Regex::new(r#"<a href="([^"/]+)/index\.html">([^<]+?)\s*\((\d+) senses\)</a>"#).unwrap();
    re.captures_iter(html)
        .map(|caps| {
            let name = caps[2].trim().to_string();
            let count = caps[3].parse().unwrap_or(0);
            (name, count)
        })
        .collect()
}

/// One part of speech of a headword.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Part {
    pub pos: String,
    pub translations: Vec<String>,
    pub glosses: Vec<String>,
}

impl Part {
    fn render(&self) -> String {
        let mut line = String::new();
        if !self.pos.is_empty() {
            line.push_str(&self.pos);
            line.push_str(": ");
        }
        line.push_str(&self.translations.join(", "));
        if !self.translations.is_empty() && !self.glosses.is_empty() {
            line.push_str("; ");
        }
        line.push_str(&self.glosses.join("; "));
        line
    }
}

/// Headwords of one language pair with what is known about them.
#[derive(Debug, Default)]
pub struct Database {
    pub articles: BTreeMap<String, Vec<Part>>,
    /// `(form, headword)`
    pub forms: Vec<(String, String)>,
    pub skipped_lines: usize,
}

impl Database {
    /// Adds the entries of a Kaikki extract whose language name or code is `source`.
    pub fn read_lines<R: BufRead>(&mut self, reader: R, source: &str, target: &str) -> Result<()> {
        let mut skipped = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: KaikkiEntry = match serde_json::from_str(&line) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("line {}: {}", i + 1, e);
                    skipped += 1;
                    continue;
                }
            };
            self.insert(&entry, source, target);
        }
        if skipped > 0 {
            warn!("skipped {} malformed lines", skipped);
        }
        self.skipped_lines += skipped;
        Ok(())
    }

    fn insert(&mut self, entry: &KaikkiEntry, source: &str, target: &str) {
        let in_source = [entry.lang.as_deref(), entry.lang_code.as_deref()]
            .iter()
            .flatten()
            .any(|l| l.eq_ignore_ascii_case(source));
        let word = match entry.word.as_deref() {
            Some(word) if in_source && !word.is_empty() => word,
            _ => return,
        };

        let part = Part {
            pos: entry.pos.clone().unwrap_or_default(),
            translations: entry.translations_into(target).into_iter().map(String::from).collect(),
            glosses: entry.glosses().into_iter().map(String::from).collect(),
        };
        if part.translations.is_empty() && part.glosses.is_empty() {
            return;
        }

        for form in entry.word_forms() {
            if form != word {
                self.forms.push((String::from(form), String::from(word)));
            }
        }
        self.articles.entry(String::from(word)).or_default().push(part);
    }

    /// Renders an article as plain text, one line per part of speech.
    pub fn render(parts: &[Part]) -> String {
        parts.iter().map(Part::render).collect::<Vec<_>>().join("\n")
    }
}

/// Builds a Stardict dictionary for one language pair from Kaikki.org data.
/// Call order: download, create database, export.
pub struct DictionaryCreator<'a, F: Fetch + ?Sized> {
    source_language: String,
    target_language: String,
    fetcher: &'a F,
    work_dir: PathBuf,
    data_files: Vec<PathBuf>,
    database: Option<Database>,
}

/// The file itself, or the `.jsonl` files of a directory in name order.
pub fn jsonl_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(Error::NoData(path.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let file = entry?.path();
        if file.is_file() && file.extension().map_or(false, |e| e == "jsonl") {
            files.push(file);
        }
    }
    if files.is_empty() {
        return Err(Error::NoData(path.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

impl<'a, F: Fetch + ?Sized> DictionaryCreator<'a, F> {
    pub fn new(source_language: &str, target_language: &str, fetcher: &'a F, work_dir: &Path) -> Self {
        DictionaryCreator {
            source_language: String::from(source_language),
            target_language: String::from(target_language),
            fetcher,
            work_dir: work_dir.to_path_buf(),
            data_files: Vec::new(),
            database: None,
        }
    }

    /// Fetches the extract of the source language, reusing a previous download.
    pub fn download_data_from_kaikki(&mut self) -> Result<&Path> {
        let url = kaikki_url(&self.source_language);
        let path = self.work_dir.join(file_name_from_url(&url));
        download_if_missing(self.fetcher, &url, &path)?;
        self.data_files = vec![path];
        Ok(&self.data_files[0])
    }

    /// Reads local extracts instead of downloading, a file or a directory
    /// of `.jsonl` files. Returns the number of files.
    pub fn use_local_data(&mut self, path: &Path) -> Result<usize> {
        self.data_files = jsonl_files(path)?;
        self.database = None;
        info!("Using {} local file(s) from {}.", self.data_files.len(), path.display());
        Ok(self.data_files.len())
    }

    fn load(&mut self) -> Result<Database> {
        if self.data_files.is_empty() {
            self.download_data_from_kaikki()?;
        }

        let mut db = Database::default();
        for path in &self.data_files {
            info!(
                "Reading {} -> {} entries from {} ...",
                self.source_language,
                self.target_language,
                path.display()
            );
            let reader = BufReader::new(File::open(path)?);
            db.read_lines(reader, &self.source_language, &self.target_language)?;
        }
        info!(
            "Database holds {} headwords, {} forms, {} lines skipped.",
            db.articles.len(),
            db.forms.len(),
            db.skipped_lines
        );
        Ok(db)
    }

    /// Reads the downloaded extract into the in-memory database.
    /// Returns the number of headwords.
    pub fn create_database(&mut self) -> Result<usize> {
        let db = self.load()?;
        let count = db.articles.len();
        self.database = Some(db);
        Ok(count)
    }

    /// Writes the Stardict package; `output` may name the `.ifo` file or the base.
    pub fn export_to_stardict(&mut self, author: &str, bookname: &str, output: &Path) -> Result<Summary> {
        let db = match self.database.take() {
            Some(db) => db,
            None => self.load()?,
        };

        let mut builder = StardictBuilder::new();
        for (word, parts) in &db.articles {
            builder.add(word, &Database::render(parts));
        }
        for (form, word) in &db.forms {
            builder.add_synonym(form, word);
        }

        let metadata = Metadata {
            bookname: String::from(bookname),
            author: Some(String::from(author)),
            description: Some(format!(
                "{} to {} dictionary generated from Wiktionary data by kaikki.org",
                self.source_language, self.target_language
            )),
        };
        self.database = Some(db);

        let base = stardict_base(&self.work_dir.join(output));
        builder.write(&base, &metadata)
    }
}
