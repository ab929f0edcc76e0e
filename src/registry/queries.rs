use std::path::Path;

use super::RegistryError;

/// Extract the query list from an uploaded query file.
///
/// CSV files (by MIME type or `.csv` extension) contribute the first column of every
/// row after the header. Anything else is read as one query per line. Entries are
/// trimmed and blank entries dropped.
pub fn parse_queries(
    data: &[u8],
    filename: Option<&str>,
    mime_type: Option<&str>,
) -> Result<Vec<String>, RegistryError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| RegistryError::Invalid("query file must be UTF-8 text".to_string()))?;

    if is_csv(filename, mime_type) {
        parse_csv(text)
    } else {
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn is_csv(filename: Option<&str>, mime_type: Option<&str>) -> bool {
    if mime_type.is_some_and(|m| m.eq_ignore_ascii_case("text/csv")) {
        return true;
    }
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn parse_csv(text: &str) -> Result<Vec<String>, RegistryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut queries = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| RegistryError::Invalid(format!("malformed CSV query file: {e}")))?;
        if let Some(query) = record.get(0).map(str::trim).filter(|q| !q.is_empty()) {
            queries.push(query.to_string());
        }
    }
    Ok(queries)
}
