//! Loading a film dataset file into the document store.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use filmgraph_docstore::{document_key, DocumentStore};

/// Parse a dataset file: either one JSON array of documents or one
/// document per line.
pub fn parse_documents(text: &str) -> Result<Vec<Value>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let docs: Vec<Value> = serde_json::from_str(trimmed).context("invalid JSON array")?;
        return Ok(docs);
    }

    let mut docs = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: Value =
            serde_json::from_str(line).with_context(|| format!("invalid JSON on line {}", n + 1))?;
        docs.push(doc);
    }
    if docs.is_empty() {
        bail!("no documents found");
    }
    Ok(docs)
}

/// Upsert every document under its derived key. Returns how many were stored.
pub async fn import_documents(store: &DocumentStore, docs: &[Value]) -> Result<usize> {
    store.ensure_schema().await?;

    let mut stored = 0;
    for (position, doc) in docs.iter().enumerate() {
        let key = document_key(doc, position);
        match store.put_film(&key, doc).await {
            Ok(()) => stored += 1,
            Err(e) => warn!(key = key.as_str(), error = %e, "Failed to store film document"),
        }
    }
    info!(stored, total = docs.len(), "Film documents imported");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_and_json_lines() {
        let array = r#"[{"title": "A"}, {"title": "B"}]"#;
        assert_eq!(parse_documents(array).unwrap().len(), 2);

        let lines = "{\"title\": \"A\"}\n\n{\"title\": \"B\", \"Rank\": 2}\n";
        let docs = parse_documents(lines).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["Rank"], 2);
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_documents("{\"title\": \"A\"}\n{oops\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_documents("  \n").is_err());
    }
}
