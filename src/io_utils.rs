//! I/O utilities for delimited reading, encoding fallback and artifact writes.
//!
//! Every file the pipeline touches flows through this module:
//!
//! - **Encoding fallback**: the raw sales export is decoded by trying a fixed
//!   list of encodings; when none yields a well-formed table the text is
//!   decoded lossily and malformed lines are skipped.
//! - **Reader/writer construction**: `open_csv_reader` and `open_csv_writer`
//!   share one `csv` builder configuration.
//! - **Atomic writes**: artifacts are written to a temporary file next to the
//!   destination and renamed into place once complete.

use std::{
    fs,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::error::PipelineError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// Encodings attempted, in order, when decoding a source file.
pub const ENCODING_CANDIDATES: &[&str] = &["utf-8", "latin-1", "cp1252", "iso-8859-1"];

/// Label reported when the lenient fallback produced the table.
pub const LENIENT_ENCODING_LABEL: &str = "latin-1 (lenient)";

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_writer<W>(writer: W, delimiter: u8) -> csv::Writer<W>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    builder.from_writer(writer)
}

/// Header plus data rows decoded from a delimited source.
#[derive(Debug, Clone)]
pub struct DecodedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub encoding: String,
    pub skipped_lines: usize,
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

fn parse_strict(text: &str, delimiter: u8) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = open_csv_reader(text.as_bytes(), delimiter, true);
    let headers = reader
        .headers()
        .context("Reading header row")?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Parsing data row {}", idx + 2))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

fn parse_lenient(text: &str, delimiter: u8) -> (Vec<String>, Vec<Vec<String>>, usize) {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    let mut reader = builder.from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map(|record| record.iter().map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        match record {
            Ok(record) if record.len() == headers.len() => {
                rows.push(record.iter().map(str::to_string).collect());
            }
            _ => skipped += 1,
        }
    }
    (headers, rows, skipped)
}

/// Decodes and parses `bytes`, trying each candidate encoding before the
/// lenient lossy fallback.
pub fn decode_with_fallback(bytes: &[u8], delimiter: u8) -> Result<DecodedTable> {
    for label in ENCODING_CANDIDATES {
        let encoding = resolve_encoding(Some(label))?;
        let attempt = decode_bytes(bytes, encoding).and_then(|text| parse_strict(&text, delimiter));
        match attempt {
            Ok((headers, rows)) => {
                debug!("Decoded source as {label}");
                return Ok(DecodedTable {
                    headers,
                    rows,
                    encoding: (*label).to_string(),
                    skipped_lines: 0,
                });
            }
            Err(err) => debug!("Encoding {label} rejected: {err:#}"),
        }
    }

    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    let (headers, rows, skipped_lines) = parse_lenient(&text, delimiter);
    warn!("All encodings failed; decoded lossily and skipped {skipped_lines} malformed line(s)");
    Ok(DecodedTable {
        headers,
        rows,
        encoding: LENIENT_ENCODING_LABEL.to_string(),
        skipped_lines,
    })
}

/// Reads a delimited file from disk with the encoding fallback applied.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<DecodedTable> {
    if !path.exists() {
        return Err(PipelineError::SourceNotFound(path.to_path_buf()).into());
    }
    let bytes = fs::read(path).with_context(|| format!("Reading input file {path:?}"))?;
    decode_with_fallback(&bytes, delimiter).with_context(|| format!("Decoding {path:?}"))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating directory {parent:?}"))?;
    }
    Ok(())
}

/// Writes `path` through a temporary sibling file that is renamed into place
/// only after `write` returns successfully.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    ensure_parent_dir(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Creating temporary file in {dir:?}"))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer
            .flush()
            .with_context(|| format!("Flushing output for {path:?}"))?;
    }
    temp.persist(path)
        .with_context(|| format!("Persisting output file {path:?}"))?;
    Ok(())
}

pub fn write_text_atomically(path: &Path, contents: &str) -> Result<()> {
    write_atomically(path, |writer| {
        writer
            .write_all(contents.as_bytes())
            .with_context(|| format!("Writing {path:?}"))
    })
}

/// Writes a header and rows as a delimited file atomically.
pub fn write_delimited<I>(path: &Path, headers: &[String], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    write_atomically(path, |writer| {
        let mut csv_writer = open_csv_writer(writer, DEFAULT_CSV_DELIMITER);
        csv_writer
            .write_record(headers)
            .with_context(|| format!("Writing header to {path:?}"))?;
        for row in rows {
            csv_writer
                .write_record(&row)
                .with_context(|| format!("Writing row to {path:?}"))?;
        }
        csv_writer
            .flush()
            .with_context(|| format!("Flushing {path:?}"))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_input_is_accepted_first() {
        let table = decode_with_fallback("A,B\n1,Café\n".as_bytes(), b',').unwrap();
        assert_eq!(table.encoding, "utf-8");
        assert_eq!(table.rows, vec![vec!["1".to_string(), "Café".to_string()]]);
    }

    #[test]
    fn latin1_bytes_fall_through_to_latin1() {
        let bytes = b"A,B\n1,Caf\xe9\n";
        let table = decode_with_fallback(bytes, b',').unwrap();
        assert_eq!(table.encoding, "latin-1");
        assert_eq!(table.rows[0][1], "Café");
    }

    #[test]
    fn ragged_rows_trigger_lenient_fallback() {
        let table = decode_with_fallback(b"A,B\n1,2\n3\n4,5,6\n7,8\n", b',').unwrap();
        assert_eq!(table.encoding, LENIENT_ENCODING_LABEL);
        assert_eq!(table.skipped_lines, 2);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn write_atomically_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");
        write_text_atomically(&path, "first").unwrap();
        write_text_atomically(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn failed_write_leaves_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_text_atomically(&path, "kept").unwrap();
        let result = write_atomically(&path, |_| Err(anyhow!("boom")));
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "kept");
    }

    #[test]
    fn read_delimited_reports_missing_source() {
        let err = read_delimited(Path::new("definitely/missing.csv"), b',').unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::SourceNotFound(_))
        ));
    }
}
