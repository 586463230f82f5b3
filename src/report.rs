// Side-by-side DOCX comparison table.
//
// The package is written from scratch: container parts as fixed templates,
// word/document.xml assembled from escaped text. Word tolerates the
// minimal part set used here (no styles part; all formatting is inline).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use quick_xml::escape::escape;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::dispatch::BackendColumn;
use crate::error::{LegalTransError, Result};
use crate::source::Paragraph;

// A4 landscape with 0.5 inch margins; the table spans 10 inches.
const PAGE_WIDTH: u32 = 16838;
const PAGE_HEIGHT: u32 = 11906;
const PAGE_MARGIN: u32 = 720;
const NUMBER_COLUMN_WIDTH: u32 = 576;
const TEXT_COLUMN_WIDTH: u32 = 3312;

const HEADER_FILL: &str = "D9EAF7";
const NUMBER_FILL: &str = "E0E0E0";

const TITLE_TEXT: &str = "Документ створено за допомогою LegalTrans";
const ORIGINAL_HEADER: &str = "Оригінальний текст";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/>
</Relationships>"#;

// Page X of Y, centered on every page.
const FOOTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:ftr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:p><w:pPr><w:jc w:val="center"/></w:pPr>
<w:fldSimple w:instr=" PAGE "><w:r><w:t>1</w:t></w:r></w:fldSimple>
<w:r><w:t xml:space="preserve"> of </w:t></w:r>
<w:fldSimple w:instr=" NUMPAGES "><w:r><w:t>1</w:t></w:r></w:fldSimple>
</w:p>
</w:ftr>"#;

/// Replace filesystem-hostile characters so any source stem can name a file.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}

/// Timestamped report filename for a source stem.
pub fn report_filename(stem: &str, generated_at: &DateTime<Local>) -> String {
    format!(
        "{}_uk_{}.docx",
        sanitize_filename(stem),
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Write the comparison table package. Every column must be index-aligned
/// with the paragraph sequence.
pub fn build_report(
    paragraphs: &[Paragraph],
    columns: &[BackendColumn],
    generated_at: &DateTime<Local>,
    path: &Path,
) -> Result<()> {
    for column in columns {
        if column.cells.len() != paragraphs.len() {
            return Err(LegalTransError::Report(format!(
                "{} column has {} cells for {} paragraphs",
                column.kind.label(),
                column.cells.len(),
                paragraphs.len()
            )));
        }
    }

    let document = document_xml(paragraphs, columns, generated_at);

    let file = File::create(path)?;
    let mut package = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    let parts: [(&str, &str); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", ROOT_RELS_XML),
        ("word/document.xml", &document),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML),
        ("word/footer1.xml", FOOTER_XML),
    ];

    for (name, content) in parts {
        package
            .start_file(name, options)
            .map_err(|e| LegalTransError::Report(format!("failed to add {}: {}", name, e)))?;
        package.write_all(content.as_bytes())?;
    }

    package
        .finish()
        .map_err(|e| LegalTransError::Report(format!("failed to finish package: {}", e)))?;

    Ok(())
}

fn document_xml(
    paragraphs: &[Paragraph],
    columns: &[BackendColumn],
    generated_at: &DateTime<Local>,
) -> String {
    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    xml.push_str("<w:body>");

    // Title, bold 12pt centered, then the generation timestamp.
    xml.push_str(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>"#);
    xml.push_str(&format!(
        r#"<w:r><w:rPr><w:b/><w:sz w:val="24"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(TITLE_TEXT)
    ));
    xml.push_str(&format!(
        r#"<w:p><w:r><w:t xml:space="preserve">Дата та час перекладу: {}</w:t></w:r></w:p>"#,
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    xml.push_str(&table_xml(paragraphs, columns));

    xml.push_str(&format!(
        r#"<w:sectPr><w:footerReference w:type="default" r:id="rId1"/><w:pgSz w:w="{}" w:h="{}" w:orient="landscape"/><w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" w:header="360" w:footer="360" w:gutter="0"/></w:sectPr>"#,
        PAGE_WIDTH,
        PAGE_HEIGHT,
        m = PAGE_MARGIN
    ));

    xml.push_str("</w:body></w:document>");
    xml
}

fn table_xml(paragraphs: &[Paragraph], columns: &[BackendColumn]) -> String {
    let mut xml = String::new();
    xml.push_str("<w:tbl><w:tblPr>");
    xml.push_str(r#"<w:tblW w:w="14400" w:type="dxa"/><w:tblLayout w:type="fixed"/>"#);
    xml.push_str("<w:tblBorders>");
    for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        xml.push_str(&format!(
            r#"<w:{edge} w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#
        ));
    }
    xml.push_str("</w:tblBorders></w:tblPr>");

    xml.push_str("<w:tblGrid>");
    xml.push_str(&format!(r#"<w:gridCol w:w="{}"/>"#, NUMBER_COLUMN_WIDTH));
    for _ in 0..=columns.len() {
        xml.push_str(&format!(r#"<w:gridCol w:w="{}"/>"#, TEXT_COLUMN_WIDTH));
    }
    xml.push_str("</w:tblGrid>");

    // Header row, repeated at the top of every page.
    xml.push_str("<w:tr><w:trPr><w:tblHeader/></w:trPr>");
    xml.push_str(&header_cell("№", NUMBER_COLUMN_WIDTH));
    xml.push_str(&header_cell(ORIGINAL_HEADER, TEXT_COLUMN_WIDTH));
    for column in columns {
        xml.push_str(&header_cell(column.kind.label(), TEXT_COLUMN_WIDTH));
    }
    xml.push_str("</w:tr>");

    for paragraph in paragraphs {
        xml.push_str("<w:tr>");
        xml.push_str(&number_cell(paragraph.index + 1));
        xml.push_str(&text_cell(&paragraph.text));
        for column in columns {
            xml.push_str(&text_cell(&column.cells[paragraph.index]));
        }
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    xml
}

fn header_cell(label: &str, width: u32) -> String {
    format!(
        r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/><w:shd w:val="clear" w:color="auto" w:fill="{}"/></w:tcPr><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p></w:tc>"#,
        width,
        HEADER_FILL,
        escape(label)
    )
}

fn number_cell(number: usize) -> String {
    format!(
        r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/><w:shd w:val="clear" w:color="auto" w:fill="{}"/></w:tcPr><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:sz w:val="18"/></w:rPr><w:t>{}</w:t></w:r></w:p></w:tc>"#,
        NUMBER_COLUMN_WIDTH, NUMBER_FILL, number
    )
}

/// Body cell: 9pt justified text; embedded newlines and tabs become
/// explicit break and tab elements.
fn text_cell(text: &str) -> String {
    let mut runs = String::new();
    runs.push_str(r#"<w:r><w:rPr><w:sz w:val="18"/></w:rPr>"#);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            runs.push_str("<w:br/>");
        }
        for (j, segment) in line.split('\t').enumerate() {
            if j > 0 {
                runs.push_str("<w:tab/>");
            }
            if !segment.is_empty() {
                runs.push_str(&format!(
                    r#"<w:t xml:space="preserve">{}</w:t>"#,
                    escape(segment)
                ));
            }
        }
    }
    runs.push_str("</w:r>");

    format!(
        r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/></w:tcPr><w:p><w:pPr><w:jc w:val="both"/></w:pPr>{}</w:p></w:tc>"#,
        TEXT_COLUMN_WIDTH, runs
    )
}
