//! Id lists for bulk commands
//!
//! Ids come from positional arguments, optionally extended by an input file
//! in one of three formats:
//! - text: one id per line; blank lines and `#` comments are skipped and
//!   anything after the first whitespace is ignored
//! - csv: the id is the first field of each record
//! - json: an array of ids or of `{"id": ..}` objects

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::ModrError;
use crate::cli::{IdFormat, InputArgs};

type Result<T> = std::result::Result<T, ModrError>;

/// Collect ids from arguments and the optional input file, in order
///
/// # Errors
/// Returns `ModrError::InvalidInput` if the file cannot be read or parsed.
pub fn collect(ids: &[u64], input: &InputArgs) -> Result<Vec<u64>> {
    let mut all = ids.to_vec();
    if let Some(path) = &input.input {
        let content = read_input(path)?;
        let parsed = match input.format {
            IdFormat::Text => parse_ids_plaintext(&content)?,
            IdFormat::Csv => parse_ids_csv(&content, input.delimiter)?,
            IdFormat::Json => parse_ids_json(&content)?,
        };
        all.extend(parsed);
    }
    Ok(all)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    std::fs::read_to_string(path)
        .map_err(|e| ModrError::InvalidInput(format!("Failed to read {}: {e}", path.display())))
}

fn parse_id(raw: &str, location: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| ModrError::InvalidInput(format!("Invalid id '{raw}' at {location}")))
}

/// # Errors
/// Returns `ModrError::InvalidInput` on a non-numeric id.
pub fn parse_ids_plaintext(content: &str) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(first) = trimmed.split_whitespace().next() {
            ids.push(parse_id(first, &format!("line {}", i + 1))?);
        }
    }
    Ok(ids)
}

/// # Errors
/// Returns `ModrError::InvalidInput` if the content looks like JSON, a record
/// is malformed, or an id field is empty or non-numeric.
pub fn parse_ids_csv(content: &str, delimiter: char) -> Result<Vec<u64>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Err(ModrError::InvalidInput(
            "Invalid CSV id list: content appears to be JSON (try --format json)".to_string(),
        ));
    }
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| ModrError::InvalidInput(format!("Delimiter '{delimiter}' is not a single byte")))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());
    let mut ids = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let record = rec
            .map_err(|e| ModrError::InvalidInput(format!("Invalid CSV id list at record {}: {e}", i + 1)))?;
        let Some(field) = record.get(0) else {
            continue;
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(ModrError::InvalidInput(format!(
                "Invalid CSV id list at record {}: empty id",
                i + 1
            )));
        }
        ids.push(parse_id(field, &format!("record {}", i + 1))?);
    }
    Ok(ids)
}

/// # Errors
/// Returns `ModrError::InvalidInput` if the content is not a JSON id array.
pub fn parse_ids_json(content: &str) -> Result<Vec<u64>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum JsonId {
        Bare(u64),
        Object { id: u64 },
    }
    let parsed: Vec<JsonId> = serde_json::from_str(content)
        .map_err(|e| ModrError::InvalidInput(format!("Invalid JSON id list: {e}")))?;
    Ok(parsed
        .into_iter()
        .map(|entry| match entry {
            JsonId::Bare(id) | JsonId::Object { id } => id,
        })
        .collect())
}
