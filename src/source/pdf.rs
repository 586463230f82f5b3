use std::path::Path;

use crate::error::{LegalTransError, Result};

/// Extract the text of a PDF, one entry per line. Blank lines are dropped
/// by the caller during sequencing.
pub fn paragraph_texts(path: &Path) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| LegalTransError::Extraction(format!("pdf extraction failed: {}", e)))?;

    Ok(text.lines().map(|line| line.to_string()).collect())
}
