//! Stardict package writing and reading.
//!
//! A package is made of `.ifo` (metadata), `.idx` (sorted headwords with
//! offsets into `.dict`), `.dict` (definition texts) and optionally `.syn`
//! (alternative spellings pointing into `.idx`). Integers are big-endian.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::error::{Error, Result};


const IFO_MAGIC: &str = "StarDict's dict ifo file";
const IFO_VERSION: &str = "2.4.2";

/// Headwords must be shorter than this many bytes.
const MAX_WORD_BYTES: usize = 256;

/// Orders words the way Stardict readers binary-search them:
/// ASCII case-insensitive first, then plain byte order.
pub fn stardict_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()));
    folded.then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

/// Contents of the `.ifo` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IfoInfo {
    pub bookname: String,
    pub wordcount: usize,
    pub synwordcount: usize,
    pub idxfilesize: u64,
    pub idxoffsetbits: u32,
    pub author: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub sametypesequence: Option<String>,
}

/// Keeps `.ifo` values on one line.
fn sanitize(value: &str) -> String {
    value.replace(|c: char| c == '\n' || c == '\r', " ").trim().to_string()
}

impl IfoInfo {
    pub fn write_to<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "{}", IFO_MAGIC)?;
        writeln!(w, "version={}", IFO_VERSION)?;
        writeln!(w, "bookname={}", sanitize(&self.bookname))?;
        writeln!(w, "wordcount={}", self.wordcount)?;
        if self.synwordcount > 0 {
            writeln!(w, "synwordcount={}", self.synwordcount)?;
        }
        writeln!(w, "idxfilesize={}", self.idxfilesize)?;
        if self.idxoffsetbits == 64 {
            writeln!(w, "idxoffsetbits=64")?;
        }
        if let Some(author) = self.author.as_deref().filter(|s| !s.is_empty()) {
            writeln!(w, "author={}", sanitize(author))?;
        }
        if let Some(description) = self.description.as_deref().filter(|s| !s.is_empty()) {
            writeln!(w, "description={}", sanitize(description))?;
        }
        if let Some(date) = &self.date {
            writeln!(w, "date={}", date)?;
        }
        if let Some(sequence) = &self.sametypesequence {
            writeln!(w, "sametypesequence={}", sequence)?;
        }
        w.flush()
    }

    /// Parses `.ifo` content. Unknown keys are ignored.
    pub fn parse(content: &str) -> IfoInfo {
        let mut info = IfoInfo {
            idxoffsetbits: 32,
            ..IfoInfo::default()
        };
        for line in content.lines() {
            let (key, value) = match line.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };
            let value = value.trim();
            match key.trim() {
                "bookname" => info.bookname = String::from(value),
                "wordcount" => info.wordcount = value.parse().unwrap_or(0),
                "synwordcount" => info.synwordcount = value.parse().unwrap_or(0),
                "idxfilesize" => info.idxfilesize = value.parse().unwrap_or(0),
                "idxoffsetbits" => info.idxoffsetbits = value.parse().unwrap_or(32),
                "author" => info.author = Some(String::from(value)),
                "description" => info.description = Some(String::from(value)),
                "date" => info.date = Some(String::from(value)),
                "sametypesequence" => info.sametypesequence = Some(String::from(value)),
                _ => {}
            }
        }
        info
    }
}

/// One `.idx` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxEntry {
    pub word: String,
    pub offset: u64,
    pub size: u32,
}

impl std::fmt::Display for IdxEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}\t{}", self.word, self.offset, self.size)
    }
}

/// One `.syn` record, `index` points into the sorted `.idx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynEntry {
    pub word: String,
    pub index: u32,
}

impl std::fmt::Display for SynEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.word, self.index)
    }
}

/// Descriptive fields of a package.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub bookname: String,
    pub author: Option<String>,
    pub description: Option<String>,
}

/// Counts of what was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub words: usize,
    pub synonyms: usize,
}

/// Collects definitions and writes them as a Stardict package
/// with `sametypesequence=m` (plain UTF-8 text).
#[derive(Debug, Default)]
pub struct StardictBuilder {
    definitions: HashMap<String, String>,
    synonyms: Vec<(String, String)>,
}

fn valid_word(word: &str) -> bool {
    !word.is_empty() && word.len() < MAX_WORD_BYTES && !word.contains('\0')
}

impl StardictBuilder {
    pub fn new() -> StardictBuilder {
        StardictBuilder::default()
    }

    /// Adds a definition; a repeated headword gets the text appended on a new line.
    pub fn add(&mut self, word: &str, definition: &str) {
        if !valid_word(word) {
            debug!("skipping unusable headword {:?}", word);
            return;
        }
        match self.definitions.get_mut(word) {
            Some(existing) => {
                if !definition.is_empty() {
                    existing.push('\n');
                    existing.push_str(definition);
                }
            }
            None => {
                self.definitions.insert(String::from(word), String::from(definition));
            }
        }
    }

    /// Makes `synonym` resolve to the definition of `word`.
    pub fn add_synonym(&mut self, synonym: &str, word: &str) {
        if synonym != word && valid_word(synonym) {
            self.synonyms.push((String::from(synonym), String::from(word)));
        }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Writes `<base>.dict`, `<base>.idx`, `<base>.syn` (if any) and `<base>.ifo`.
    pub fn write(self, base: &Path, metadata: &Metadata) -> Result<Summary> {
        let mut entries: Vec<(String, String)> = self.definitions.into_iter().collect();
        entries.par_sort_unstable_by(|a, b| stardict_cmp(&a.0, &b.0));

        let idx = write_dict(&with_ext(base, "dict"), &entries)?;
        let idxfilesize = write_idx(&with_ext(base, "idx"), &idx)?;

        let positions: HashMap<&str, u32> = idx
            .iter()
            .enumerate()
            .map(|(i, e)| (e.word.as_str(), i as u32))
            .collect();
        let mut syn: Vec<SynEntry> = self
            .synonyms
            .iter()
            .filter_map(|(synonym, word)| {
                positions.get(word.as_str()).map(|&index| SynEntry {
                    word: synonym.clone(),
                    index,
                })
            })
            .collect();
        syn.par_sort_unstable_by(|a, b| stardict_cmp(&a.word, &b.word).then(a.index.cmp(&b.index)));
        syn.dedup();

        let syn_path = with_ext(base, "syn");
        if syn.is_empty() {
            if syn_path.exists() {
                std::fs::remove_file(&syn_path)?;
            }
        } else {
            write_syn(&syn_path, &syn)?;
        }

        let info = IfoInfo {
            bookname: metadata.bookname.clone(),
            wordcount: idx.len(),
            synwordcount: syn.len(),
            idxfilesize,
            idxoffsetbits: 32,
            author: metadata.author.clone(),
            description: metadata.description.clone(),
            date: Some(chrono::Local::now().format("%Y.%m.%d").to_string()),
            sametypesequence: Some(String::from("m")),
        };
        let ifo_path = with_ext(base, "ifo");
        info.write_to(BufWriter::new(File::create(&ifo_path)?))?;

        info!(
            "Wrote {} ({} words, {} synonyms).",
            ifo_path.display(),
            idx.len(),
            syn.len()
        );
        Ok(Summary {
            words: idx.len(),
            synonyms: syn.len(),
        })
    }
}

/// Appends the extension instead of replacing, `cs-it.v2` -> `cs-it.v2.idx`.
fn with_ext(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn write_dict(path: &Path, entries: &[(String, String)]) -> Result<Vec<IdxEntry>> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut idx = Vec::with_capacity(entries.len());
    let mut offset: u64 = 0;
    for (word, definition) in entries {
        let data = definition.as_bytes();
        let end = offset + data.len() as u64;
        if end > u64::from(u32::MAX) {
            return Err(Error::OffsetOverflow(end));
        }
        writer.write_all(data)?;
        idx.push(IdxEntry {
            word: word.clone(),
            offset,
            size: data.len() as u32,
        });
        offset = end;
    }
    writer.flush()?;
    Ok(idx)
}

/// Returns the size of the written file.
fn write_idx(path: &Path, entries: &[IdxEntry]) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut size = 0;
    for entry in entries {
        writer.write_all(entry.word.as_bytes())?;
        writer.write_all(&[0])?;
        writer.write_all(&(entry.offset as u32).to_be_bytes())?;
        writer.write_all(&entry.size.to_be_bytes())?;
        size += entry.word.len() as u64 + 1 + 8;
    }
    writer.flush()?;
    Ok(size)
}

fn write_syn(path: &Path, entries: &[SynEntry]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        writer.write_all(entry.word.as_bytes())?;
        writer.write_all(&[0])?;
        writer.write_all(&entry.index.to_be_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Splits `word\0` followed by `tail` bytes off the front of `data`.
fn take_record<'a>(data: &'a [u8], tail: usize, path: &Path) -> Result<(String, &'a [u8], &'a [u8])> {
    let invalid = |reason| Error::InvalidIndex {
        path: path.to_path_buf(),
        reason,
    };
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| invalid("missing word terminator"))?;
    let word = std::str::from_utf8(&data[..nul]).map_err(|_| invalid("word is not UTF-8"))?;
    let rest = &data[nul + 1..];
    if rest.len() < tail {
        return Err(invalid("truncated record"));
    }
    Ok((String::from(word), &rest[..tail], &rest[tail..]))
}

pub fn read_ifo(path: &Path) -> Result<IfoInfo> {
    let content = std::fs::read_to_string(path)?;
    if !content.starts_with(IFO_MAGIC) {
        warn!("{} does not start with the ifo header", path.display());
    }
    Ok(IfoInfo::parse(&content))
}

/// Reads `.idx` records, `offset_bits` is 32 or 64 as declared in `.ifo`.
pub fn read_idx(path: &Path, offset_bits: u32) -> Result<Vec<IdxEntry>> {
    let data = std::fs::read(path)?;
    let offset_len = if offset_bits == 64 { 8 } else { 4 };
    let mut rest = data.as_slice();
    let mut entries = Vec::new();
    while !rest.is_empty() {
        let (word, fields, tail) = take_record(rest, offset_len + 4, path)?;
        let (offset, size) = fields.split_at(offset_len);
        let offset = if offset_len == 8 {
            u64::from_be_bytes([offset[0], offset[1], offset[2], offset[3], offset[4], offset[5], offset[6], offset[7]])
        } else {
            u64::from(u32::from_be_bytes([offset[0], offset[1], offset[2], offset[3]]))
        };
        let size = u32::from_be_bytes([size[0], size[1], size[2], size[3]]);
        entries.push(IdxEntry { word, offset, size });
        rest = tail;
    }
    Ok(entries)
}

pub fn read_syn(path: &Path) -> Result<Vec<SynEntry>> {
    let data = std::fs::read(path)?;
    let mut rest = data.as_slice();
    let mut entries = Vec::new();
    while !rest.is_empty() {
        let (word, fields, tail) = take_record(rest, 4, path)?;
        let index = u32::from_be_bytes([fields[0], fields[1], fields[2], fields[3]]);
        entries.push(SynEntry { word, index });
        rest = tail;
    }
    Ok(entries)
}

/// Reads the definition text addressed by `entry` from a `.dict` file.
pub fn read_definition(dict_path: &Path, entry: &IdxEntry) -> Result<String> {
    let mut f = File::open(dict_path)?;
    f.seek(SeekFrom::Start(entry.offset))?;
    let mut buf = vec![0; entry.size as usize];
    f.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Finds `word` in the package at `base`, as a headword or else as a synonym.
/// Returns the matching headword and its definition.
pub fn lookup(base: &Path, word: &str) -> Result<Option<(String, String)>> {
    let ifo = read_ifo(&with_ext(base, "ifo"))?;
    let idx = read_idx(&with_ext(base, "idx"), ifo.idxoffsetbits)?;

    let position = match idx.binary_search_by(|e| stardict_cmp(&e.word, word)) {
        Ok(i) => Some(i),
        Err(_) => {
            let syn_path = with_ext(base, "syn");
            if syn_path.exists() {
                let syn = read_syn(&syn_path)?;
                syn.binary_search_by(|e| stardict_cmp(&e.word, word))
                    .ok()
                    .map(|i| syn[i].index as usize)
            } else {
                None
            }
        }
    };

    match position.and_then(|i| idx.get(i)) {
        Some(entry) => {
            let definition = read_definition(&with_ext(base, "dict"), entry)?;
            Ok(Some((entry.word.clone(), definition)))
        }
        None => Ok(None),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparator_folds_ascii_case_first() {
        let mut words = vec!["b", "B", "a", "ab", "A", "č", "Z"];
        words.sort_by(|a, b| stardict_cmp(a, b));
        assert_eq!(words, vec!["A", "a", "ab", "B", "b", "Z", "č"]);
    }

    #[test]
    fn ifo_round_trip_keeps_fields() {
        let info = IfoInfo {
            bookname: String::from("Czech to\nItalian"),
            wordcount: 2,
            synwordcount: 1,
            idxfilesize: 30,
            idxoffsetbits: 32,
            author: Some(String::from("hPa")),
            description: None,
            date: Some(String::from("2026.10.19")),
            sametypesequence: Some(String::from("m")),
        };
        let mut out = Vec::new();
        info.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("StarDict's dict ifo file\nversion=2.4.2\nbookname=Czech to Italian\n"));
        assert!(!text.contains("idxoffsetbits"));
        assert!(!text.contains("description"));

        let parsed = IfoInfo::parse(&text);
        assert_eq!(parsed.bookname, "Czech to Italian");
        assert_eq!(parsed.wordcount, 2);
        assert_eq!(parsed.synwordcount, 1);
        assert_eq!(parsed.idxfilesize, 30);
        assert_eq!(parsed.idxoffsetbits, 32);
        assert_eq!(parsed.author.as_deref(), Some("hPa"));
    }

    #[test]
    fn package_is_sorted_and_addressable() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("cs-it");

        let mut builder = StardictBuilder::new();
        builder.add("pes", "cane");
        builder.add("dům", "casa");
        builder.add("Auto", "automobile");
        builder.add("pes", "cagnolino");
        builder.add("", "ignored");
        builder.add_synonym("psa", "pes");
        builder.add_synonym("domu", "dům");
        builder.add_synonym("pes", "pes");
        builder.add_synonym("kočky", "kočka");
        assert_eq!(builder.len(), 3);

        let summary = builder
            .write(&base, &Metadata { bookname: String::from("Czech to Italian dictionary"), ..Metadata::default() })
            .unwrap();
        assert_eq!(summary, Summary { words: 3, synonyms: 2 });

        let ifo = read_ifo(&dir.path().join("cs-it.ifo")).unwrap();
        assert_eq!(ifo.wordcount, 3);
        assert_eq!(ifo.synwordcount, 2);
        assert_eq!(ifo.sametypesequence.as_deref(), Some("m"));
        let idx_path = dir.path().join("cs-it.idx");
        assert_eq!(ifo.idxfilesize, std::fs::metadata(&idx_path).unwrap().len());

        let idx = read_idx(&idx_path, ifo.idxoffsetbits).unwrap();
        let words: Vec<&str> = idx.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["Auto", "dům", "pes"]);

        let dict = dir.path().join("cs-it.dict");
        assert_eq!(read_definition(&dict, &idx[0]).unwrap(), "automobile");
        assert_eq!(read_definition(&dict, &idx[1]).unwrap(), "casa");
        assert_eq!(read_definition(&dict, &idx[2]).unwrap(), "cane\ncagnolino");
        let total: u64 = idx.iter().map(|e| u64::from(e.size)).sum();
        assert_eq!(std::fs::metadata(&dict).unwrap().len(), total);

        let syn = read_syn(&dir.path().join("cs-it.syn")).unwrap();
        assert_eq!(
            syn,
            vec![
                SynEntry { word: String::from("domu"), index: 1 },
                SynEntry { word: String::from("psa"), index: 2 },
            ]
        );
    }

    #[test]
    fn lookup_finds_headwords_and_synonyms() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("cs-it");

        let mut builder = StardictBuilder::new();
        for (word, definition) in [("pes", "cane"), ("dům", "casa"), ("Auto", "automobile"), ("auto", "macchina")] {
            builder.add(word, definition);
        }
        builder.add_synonym("psa", "pes");
        builder.write(&base, &Metadata::default()).unwrap();

        assert_eq!(lookup(&base, "dům").unwrap(), Some((String::from("dům"), String::from("casa"))));
        assert_eq!(lookup(&base, "auto").unwrap(), Some((String::from("auto"), String::from("macchina"))));
        assert_eq!(lookup(&base, "Auto").unwrap(), Some((String::from("Auto"), String::from("automobile"))));
        assert_eq!(lookup(&base, "psa").unwrap(), Some((String::from("pes"), String::from("cane"))));
        assert_eq!(lookup(&base, "kočka").unwrap(), None);

        // Without a .syn file only headwords are found.
        let plain = dir.path().join("plain");
        let mut builder = StardictBuilder::new();
        builder.add("pes", "cane");
        builder.write(&plain, &Metadata::default()).unwrap();
        assert_eq!(lookup(&plain, "psa").unwrap(), None);
    }

    #[test]
    fn truncated_idx_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.idx");
        std::fs::write(&path, b"word\0\x00\x00").unwrap();
        assert!(matches!(read_idx(&path, 32), Err(Error::InvalidIndex { .. })));
    }
}
