
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::error::{Error, Result};


pub const HEADER: &str = "word\ttranslation";

/// One line of the extraction output. Only the fields the table needs.
#[derive(Debug, Default, Deserialize)]
struct ExtractionRecord {
    /// Written as found, strings bare, other JSON values in their JSON text.
    #[serde(default)]
    word: Option<Value>,
    /// Language name -> definition objects, in source order.
    #[serde(default)]
    definitions: Option<Map<String, Value>>,
}

impl ExtractionRecord {
    fn word(&self) -> Cow<'_, str> {
        match &self.word {
            Some(Value::String(word)) => Cow::Borrowed(word),
            Some(Value::Null) | None => Cow::Borrowed(""),
            Some(other) => Cow::Owned(other.to_string()),
        }
    }

    /// First gloss of the first definition of the first language.
    fn first_translation(&self) -> (Option<&str>, &str) {
        let first = self.definitions.as_ref().and_then(|defs| defs.iter().next());
        let (lang, defs) = match first {
            Some((lang, defs)) => (lang.as_str(), defs),
            None => return (None, ""),
        };

        let gloss = defs
            .get(0)
            .and_then(|def| def.get("glosses"))
            .and_then(|glosses| glosses.get(0))
            .and_then(Value::as_str)
            .unwrap_or("");
        (Some(lang), gloss)
    }
}

/// Outcome of a conversion.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Conversion {
    pub rows: usize,
    /// First language translations were taken from that is not the target language.
    pub other_language: Option<String>,
}

/// Reformats extraction records into `word<TAB>translation` rows.
/// Values are written as they are, a tab inside a value shifts the columns.
pub fn convert<R: BufRead, W: Write>(reader: R, mut writer: W, target_lang: &str) -> Result<Conversion> {
    writer.write_all(HEADER.as_bytes())?;
    writer.write_all(b"\n")?;

    let mut conversion = Conversion::default();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ExtractionRecord = serde_json::from_str(&line)
            .map_err(|source| Error::Json { line: i + 1, source })?;

        let (lang, translation) = record.first_translation();
        if let Some(lang) = lang {
            if conversion.other_language.is_none() && !lang.eq_ignore_ascii_case(target_lang) {
                warn!(
                    "translations are taken from the first language found ({}), not from {}",
                    lang, target_lang
                );
                conversion.other_language = Some(String::from(lang));
            }
        }

        writeln!(writer, "{}\t{}", record.word(), translation)?;
        conversion.rows += 1;
    }

    writer.flush()?;
    Ok(conversion)
}

/// Converts the JSONL file into the TSV file.
pub fn convert_jsonl_to_tsv(jsonl_file: &Path, tsv_file: &Path, target_lang: &str) -> Result<Conversion> {
    info!("Converting {} to {} ...", jsonl_file.display(), tsv_file.display());
    let reader = BufReader::new(File::open(jsonl_file)?);
    let writer = BufWriter::new(File::create(tsv_file)?);
    let conversion = convert(reader, writer, target_lang)?;
    info!("Conversion finished, {} rows.", conversion.rows);
    Ok(conversion)
}

/// Reads `(word, translation)` rows back, the header is skipped.
/// Rows without a tab get an empty translation.
pub fn read_rows(tsv_file: &Path) -> Result<Vec<(String, String)>> {
    let reader = BufReader::new(File::open(tsv_file)?);
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if (i == 0 && line == HEADER) || line.is_empty() {
            continue;
        }
        let (word, translation) = line.split_once('\t').unwrap_or((&line, ""));
        rows.push((String::from(word), String::from(translation)));
    }
    Ok(rows)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> String {
        let mut out = Vec::new();
        convert(input.as_bytes(), &mut out, "italian").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn first_gloss_of_first_language() {
        let out = run(r#"{"word": "dům", "definitions": {"italian": [{"glosses": ["casa"]}]}}"#);
        assert_eq!(out, "word\ttranslation\ndům\tcasa\n");
    }

    #[test]
    fn missing_definitions_gives_empty_translation() {
        assert_eq!(run(r#"{"word": "pes"}"#), "word\ttranslation\npes\t\n");
    }

    #[test]
    fn missing_glosses_gives_empty_translation() {
        let out = run(r#"{"word": "kočka", "definitions": {"italian": [{"examples": []}], "french": [{"glosses": ["chat"]}]}}"#);
        assert_eq!(out, "word\ttranslation\nkočka\t\n");
    }

    #[test]
    fn first_language_in_source_order_wins() {
        let out = run(r#"{"word": "voda", "definitions": {"zulu": [{"glosses": ["amanzi"]}], "italian": [{"glosses": ["acqua"]}]}}"#);
        assert_eq!(out, "word\ttranslation\nvoda\tamanzi\n");
    }

    #[test]
    fn one_row_per_record() {
        let input = "{\"word\": \"a\"}\n{\"word\": \"b\", \"definitions\": {}}\n{\"word\": \"c\", \"definitions\": {\"italian\": []}}\n\n";
        let out = run(input);
        assert_eq!(out.lines().count(), 4);
        assert_eq!(out, "word\ttranslation\na\t\nb\t\nc\t\n");
    }

    #[test]
    fn non_string_word_is_written_as_json() {
        let input = "{\"word\": 5, \"definitions\": {\"italian\": [{\"glosses\": [\"cinque\"]}]}}\n{\"word\": null}\n{\"word\": [\"a\", 1]}\n";
        assert_eq!(run(input), "word\ttranslation\n5\tcinque\n\t\n[\"a\",1]\t\n");
    }

    #[test]
    fn other_language_is_reported_once() {
        let input = concat!(
            r#"{"word": "dům", "definitions": {"italian": [{"glosses": ["casa"]}]}}"#, "\n",
            r#"{"word": "voda", "definitions": {"zulu": [{"glosses": ["amanzi"]}]}}"#, "\n",
            r#"{"word": "pes", "definitions": {"french": [{"glosses": ["chien"]}]}}"#, "\n",
        );
        let mut out = Vec::new();
        let conversion = convert(input.as_bytes(), &mut out, "Italian").unwrap();
        assert_eq!(
            conversion,
            Conversion { rows: 3, other_language: Some(String::from("zulu")) }
        );

        let mut out = Vec::new();
        let conversion = convert(input.lines().next().unwrap().as_bytes(), &mut out, "italian").unwrap();
        assert_eq!(conversion.other_language, None);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let mut out = Vec::new();
        let err = convert("{\"word\": \"a\"}\nnot json\n".as_bytes(), &mut out, "italian").unwrap_err();
        assert!(matches!(err, Error::Json { line: 2, .. }));
    }

    #[test]
    fn rows_read_back_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let jsonl = dir.path().join("wiktextract.jsonl");
        let tsv = dir.path().join("dict.csv");
        std::fs::write(
            &jsonl,
            "{\"word\": \"dům\", \"definitions\": {\"italian\": [{\"glosses\": [\"casa\"]}]}}\n{\"word\": \"pes\"}\n",
        )
        .unwrap();

        assert_eq!(convert_jsonl_to_tsv(&jsonl, &tsv, "italian").unwrap().rows, 2);
        assert_eq!(
            read_rows(&tsv).unwrap(),
            vec![
                (String::from("dům"), String::from("casa")),
                (String::from("pes"), String::new()),
            ]
        );
    }
}
