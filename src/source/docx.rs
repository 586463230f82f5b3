// Body paragraph extraction from the WordprocessingML main document part.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::error::{LegalTransError, Result};

/// Collect the text of body-level paragraphs from a .docx file.
///
/// Matches what a paragraph iterator over the main document part sees:
/// run text plus explicit tabs and breaks. Paragraphs inside tables are
/// skipped.
pub fn paragraph_texts(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| LegalTransError::Extraction(format!("not a docx container: {}", e)))?;

    let mut xml = String::new();
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| LegalTransError::Extraction(format!("missing word/document.xml: {}", e)))?;
    entry.read_to_string(&mut xml)?;

    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut table_depth = 0usize;
    let mut in_paragraph = false;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth += 1,
                b"p" if table_depth == 0 => {
                    in_paragraph = true;
                    current.clear();
                }
                b"r" if in_paragraph => in_run = true,
                b"t" if in_run => in_text = true,
                _ => {}
            },
            // Tab stops under w:pPr also use the "tab" name; only run-level
            // elements contribute characters.
            Ok(Event::Empty(e)) if in_run => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                b"noBreakHyphen" => current.push('-'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|err| {
                    LegalTransError::Extraction(format!("invalid document xml: {}", err))
                })?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"p" if in_paragraph && table_depth == 0 => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(LegalTransError::Extraction(format!(
                    "invalid document xml: {}",
                    e
                )));
            }
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
    <w:p>
      <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
      <w:r><w:t>Before</w:t><w:tab/><w:t>after tab</w:t></w:r>
      <w:r><w:br/><w:t>next line</w:t></w:r>
    </w:p>
    <w:tbl>
      <w:tr><w:tc><w:p><w:r><w:t>table cell text</w:t></w:r></w:p></w:tc></w:tr>
    </w:tbl>
    <w:p/>
    <w:p><w:r><w:t>Fish &amp; Chips</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_parse_body_paragraphs() {
        let texts = parse_document_xml(SAMPLE).unwrap();
        assert_eq!(
            texts,
            vec![
                "First paragraph".to_string(),
                "Before\tafter tab\nnext line".to_string(),
                "Fish & Chips".to_string(),
            ]
        );
    }

    #[test]
    fn test_table_paragraphs_are_skipped() {
        let texts = parse_document_xml(SAMPLE).unwrap();
        assert!(texts.iter().all(|t| !t.contains("table cell")));
    }

    #[test]
    fn test_roundtrip_through_container() {
        use std::io::Write;
        use zip::ZipWriter;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.docx");

        let file = File::create(&path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(SAMPLE.as_bytes()).unwrap();
        writer.finish().unwrap();

        let texts = paragraph_texts(&path).unwrap();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], "First paragraph");
        assert_eq!(texts[2], "Fish & Chips");
    }
}
