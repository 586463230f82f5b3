use scraper::{Html, Selector};

use crate::error::{LegalTransError, Result};

/// Texts of every `<p>` element in a fetched page, in document order.
/// Parsing is kept separate from fetching; the DOM handle is not Send and
/// must never be held across an await point.
pub fn paragraph_texts(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("p")
        .map_err(|e| LegalTransError::Extraction(format!("invalid selector: {}", e)))?;

    Ok(document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .collect())
}
