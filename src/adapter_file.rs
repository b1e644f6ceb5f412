//! Local-file adapter.
//!
//! Dispatches purely on file extension (case-insensitive) to a PDF text
//! reader, a Word-document reader, a tabular-to-markdown reader, or a raw
//! UTF-8 read as fallback. A missing file is checked up front, before any
//! format dispatch. The PDF path has a layered fallback: `pdf-extract`
//! first, `lopdf` when that fails.

use async_trait::async_trait;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::adapter::SourceAdapter;
use crate::content::{SourceContent, SourceType};
use crate::error::{ExtractError, Result};

/// Extensions claimed even when the file does not (yet) exist on disk.
const EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "txt", "md", "rst", "csv", "xlsx"];

/// Decompression cap for a single ZIP entry inside DOCX/XLSX containers
/// (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Upper bound on table cells read from one spreadsheet sheet.
const MAX_TABLE_CELLS: usize = 100_000;

pub struct LocalFileAdapter;

impl LocalFileAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFileAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for LocalFileAdapter {
    fn name(&self) -> &'static str {
        "local_file"
    }

    fn can_handle(&self, source: &str) -> bool {
        if source.starts_with("http://") || source.starts_with("https://") {
            return false;
        }
        if source.is_empty() {
            return false;
        }
        match extension_of(source) {
            Some(ext) if EXTENSIONS.contains(&ext.as_str()) => true,
            _ => Path::new(source).is_file(),
        }
    }

    async fn extract(&self, source: &str) -> Result<SourceContent> {
        let path = Path::new(source);
        if !path.exists() {
            return Err(ExtractError::unavailable(
                source,
                format!("file not found: {}", source),
            ));
        }

        let ext = extension_of(source).unwrap_or_default();
        debug!(path = %source, ext, "reading local file");

        let text = match ext.as_str() {
            "pdf" => read_pdf(path)?,
            "docx" | "doc" => read_docx(path)?,
            "xlsx" => read_xlsx(path)?,
            "csv" => read_csv(path)?,
            _ => read_plain(path)?,
        };

        if text.trim().is_empty() {
            return Err(ExtractError::no_content(source, "file contained no text"));
        }

        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string());

        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        Ok(SourceContent::new(
            text,
            title,
            format!("file://{}", absolute.display()),
            SourceType::LocalFile,
        ))
    }
}

fn extension_of(source: &str) -> Option<String> {
    Path::new(source)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

fn read_plain(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractError::unavailable(path.to_string_lossy(), e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// PDF text extraction with a layered fallback: `pdf-extract` handles most
/// documents; `lopdf` picks up some files the first library rejects.
fn read_pdf(path: &Path) -> Result<String> {
    let display_path = path.to_string_lossy();
    match pdf_extract::extract_text(path) {
        Ok(text) => Ok(text),
        Err(primary) => {
            warn!(path = %display_path, error = %primary, "pdf-extract failed, trying lopdf");
            let doc = lopdf::Document::load(path).map_err(|e| {
                ExtractError::no_content(
                    display_path.clone(),
                    format!("PDF extraction failed ({}; lopdf: {})", primary, e),
                )
            })?;
            let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
            doc.extract_text(&pages).map_err(|e| {
                ExtractError::no_content(
                    display_path.clone(),
                    format!("PDF extraction failed ({}; lopdf: {})", primary, e),
                )
            })
        }
    }
}

/// Word paragraph extraction: pull `<w:t>` runs out of `word/document.xml`,
/// one line per paragraph.
fn read_docx(path: &Path) -> Result<String> {
    let display = path.to_string_lossy().into_owned();
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractError::unavailable(display.clone(), e.to_string()))?;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| ExtractError::no_content(display.clone(), format!("not a Word document: {}", e)))?;

    let xml = read_zip_entry(&mut archive, "word/document.xml")
        .map_err(|e| ExtractError::no_content(display.clone(), e))?;

    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text => {
                current.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    paragraphs.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::no_content(
                    display,
                    format!("malformed document XML: {}", e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}

/// Spreadsheet-to-markdown: each sheet's rows become a pipe table, first row
/// treated as the header.
fn read_xlsx(path: &Path) -> Result<String> {
    let display = path.to_string_lossy().into_owned();
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractError::unavailable(display.clone(), e.to_string()))?;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| ExtractError::no_content(display.clone(), format!("not a spreadsheet: {}", e)))?;

    let shared = match read_zip_entry(&mut archive, "xl/sharedStrings.xml") {
        Ok(xml) => parse_shared_strings(&xml).map_err(|e| ExtractError::no_content(display.clone(), e))?,
        // Sheets with only inline numbers have no shared-strings part.
        Err(_) => Vec::new(),
    };

    let mut sheet_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    sheet_names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut tables = Vec::new();
    for name in sheet_names {
        let xml = read_zip_entry(&mut archive, &name)
            .map_err(|e| ExtractError::no_content(display.clone(), e))?;
        let rows = parse_sheet_rows(&xml, &shared).map_err(|e| ExtractError::no_content(display.clone(), e))?;
        if !rows.is_empty() {
            tables.push(rows_to_markdown(&rows));
        }
    }

    Ok(tables.join("\n\n"))
}

fn read_csv(path: &Path) -> Result<String> {
    let display = path.to_string_lossy().into_owned();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ExtractError::unavailable(display.clone(), e.to_string()))?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ExtractError::no_content(display.clone(), format!("bad CSV: {}", e)))?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    Ok(rows_to_markdown(&rows))
}

/// Render rows as a Markdown pipe table, first row as the header.
fn rows_to_markdown(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        out.push_str("| ");
        out.push_str(&row.join(" | "));
        out.push_str(" |\n");
        if i == 0 {
            out.push_str("|");
            for _ in row {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

fn read_zip_entry(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> std::result::Result<Vec<u8>, String> {
    let entry = archive
        .by_name(name)
        .map_err(|e| format!("{} missing: {}", name, e))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(format!("ZIP entry {} exceeds size limit", name));
    }
    Ok(out)
}

fn parse_shared_strings(xml: &[u8]) -> std::result::Result<Vec<String>, String> {
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_text = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_text = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(t)) if in_text => {
                current.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Read one worksheet's cell values row by row. Shared-string cells
/// (`t="s"`) are resolved through the shared table; other values are used
/// verbatim.
fn parse_sheet_rows(
    xml: &[u8],
    shared: &[String],
) -> std::result::Result<Vec<Vec<String>>, String> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut in_row = false;
    let mut in_value = false;
    let mut cell_is_shared = false;
    let mut cell_count = 0usize;

    loop {
        if cell_count >= MAX_TABLE_CELLS {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = true;
                    current_row.clear();
                }
                b"c" => {
                    cell_is_shared = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                }
                b"v" => in_value = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(t)) if in_value && in_row => {
                let raw = t.unescape().unwrap_or_default();
                let value = raw.trim();
                let resolved = if cell_is_shared {
                    value
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared.get(i))
                        .cloned()
                        .unwrap_or_default()
                } else {
                    value.to_string()
                };
                current_row.push(resolved);
                cell_count += 1;
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"c" => cell_is_shared = false,
                b"row" => {
                    in_row = false;
                    if !current_row.is_empty() {
                        rows.push(std::mem::take(&mut current_row));
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn adapter() -> LocalFileAdapter {
        LocalFileAdapter::new()
    }

    #[test]
    fn recognized_extensions_are_claimed_without_existing() {
        let files = adapter();
        assert!(files.can_handle("notes.pdf"));
        assert!(files.can_handle("REPORT.DOCX"));
        assert!(files.can_handle("data.csv"));
        assert!(!files.can_handle("archive.tar.gz"));
        assert!(!files.can_handle("https://example.com/notes.pdf"));
        assert!(!files.can_handle(""));
    }

    #[test]
    fn existing_file_with_odd_extension_is_claimed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.log");
        std::fs::write(&path, "hello").unwrap();
        assert!(adapter().can_handle(path.to_str().unwrap()));
    }

    #[tokio::test]
    async fn missing_file_fails_before_format_dispatch() {
        let err = adapter().extract("notes.pdf").await.unwrap_err();
        match err {
            ExtractError::SourceUnavailable { input, reason } => {
                assert_eq!(input, "notes.pdf");
                assert!(reason.contains("file not found"));
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_extraction_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.md");
        std::fs::write(&path, "# Heading\n\nbody text\n").unwrap();
        let source = path.to_str().unwrap();

        let first = adapter().extract(source).await.unwrap();
        let second = adapter().extract(source).await.unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.source_url, second.source_url);
        assert_eq!(first.source_type, SourceType::LocalFile);
        assert_eq!(first.title, "notes.md");
        assert!(first.source_url.starts_with("file://"));
    }

    #[tokio::test]
    async fn empty_file_is_no_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();
        let err = adapter().extract(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoContent { .. }));
    }

    #[tokio::test]
    async fn csv_becomes_a_markdown_table() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scores.csv");
        std::fs::write(&path, "name,score\nalice,10\nbob,7\n").unwrap();

        let content = adapter().extract(path.to_str().unwrap()).await.unwrap();
        assert_eq!(
            content.text,
            "| name | score |\n| --- | --- |\n| alice | 10 |\n| bob | 7 |"
        );
    }

    fn write_docx(path: &Path, paragraphs: &[&str]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn docx_paragraphs_become_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("minutes.docx");
        write_docx(&path, &["first paragraph", "second paragraph"]);

        let content = adapter().extract(path.to_str().unwrap()).await.unwrap();
        assert_eq!(content.text, "first paragraph\nsecond paragraph");
        assert_eq!(content.title, "minutes.docx");
    }

    #[tokio::test]
    async fn corrupt_docx_is_no_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.docx");
        std::fs::write(&path, "this is not a zip archive").unwrap();
        let err = adapter().extract(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoContent { .. }));
    }

    fn write_xlsx(path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file("xl/sharedStrings.xml", options).unwrap();
        zip.write_all(
            b"<?xml version=\"1.0\"?><sst><si><t>name</t></si><si><t>alice</t></si></sst>",
        )
        .unwrap();

        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(
            b"<?xml version=\"1.0\"?><worksheet><sheetData>\
              <row><c t=\"s\"><v>0</v></c><c><v>1</v></c></row>\
              <row><c t=\"s\"><v>1</v></c><c><v>10</v></c></row>\
              </sheetData></worksheet>",
        )
        .unwrap();
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn xlsx_rows_become_a_markdown_table() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scores.xlsx");
        write_xlsx(&path);

        let content = adapter().extract(path.to_str().unwrap()).await.unwrap();
        assert_eq!(
            content.text,
            "| name | 1 |\n| --- | --- |\n| alice | 10 |"
        );
    }
}
