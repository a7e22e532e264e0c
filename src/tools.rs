
use std::ffi::OsStr;
use std::path::Path;

use tracing::info;

use super::error::Result;
use super::util::*;


pub const DEFAULT_EXTRACTOR: &str = "wiktwords";
pub const DEFAULT_CONVERTER: &str = "python3 -m pyglossary";

/// Runs the wiki-markup extractor over the whole dump.
pub fn run_extractor(extractor: &ToolCommand, dump_file: &Path, jsonl_file: &Path) -> Result<()> {
    info!("Running {} on {} ...", extractor, dump_file.display());
    command_wait(extractor, [OsStr::new("--out"), jsonl_file.as_os_str(), dump_file.as_os_str()])?;
    info!("Extraction finished.");
    Ok(())
}

/// Runs the external converter with exactly two positional arguments.
pub fn run_converter(converter: &ToolCommand, tsv_file: &Path, stardict_file: &Path) -> Result<()> {
    info!("Running {} to produce {} ...", converter, stardict_file.display());
    command_wait(converter, [tsv_file.as_os_str(), stardict_file.as_os_str()])?;
    info!("Conversion to Stardict finished.");
    Ok(())
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults_parse() {
        let converter: ToolCommand = DEFAULT_CONVERTER.parse().unwrap();
        assert_eq!(converter.program, "python3");
        assert_eq!(converter.args, vec!["-m", "pyglossary"]);
    }

    #[test]
    fn extractor_gets_out_then_dump() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("dump.xml.bz2");
        let jsonl = dir.path().join("out.jsonl");
        std::fs::write(&dump, b"").unwrap();

        // $1 = --out, $2 = jsonl, $3 = dump
        let extractor = ToolCommand::new("sh", &["-c", r#"test "$1" = --out && test -f "$3" && echo '{"word": "pes"}' > "$2""#, "sh"]);
        run_extractor(&extractor, &dump, &jsonl).unwrap();
        assert_eq!(std::fs::read_to_string(&jsonl).unwrap(), "{\"word\": \"pes\"}\n");
    }

    #[test]
    fn converter_gets_two_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = dir.path().join("dict.csv");
        let out = dir.path().join("dict.stardict");
        std::fs::write(&tsv, "word\ttranslation\n").unwrap();

        let converter = ToolCommand::new("sh", &["-c", r#"test $# -eq 2 && cp "$1" "$2""#, "sh"]);
        run_converter(&converter, &tsv, &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "word\ttranslation\n");
    }

    #[test]
    fn converter_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ToolCommand::new("sh", &["-c", "exit 3", "sh"]);
        let err = run_converter(&converter, &dir.path().join("a"), &dir.path().join("b")).unwrap_err();
        match err {
            Error::CommandFailed { status, .. } => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected error: {}", other),
        }
    }
}
