//! CSV text for admin export and import. The encoder reproduces the wire
//! format existing admin frontends already parse, including its lossy
//! treatment of composite values; the decoder accepts quoted cells with
//! embedded delimiters, line breaks, and doubled-quote escapes.

use crate::schema::{CollectionSchema, FieldKind};
use crate::store::Document;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static JSON_KEY_RE: OnceLock<Regex> = OnceLock::new();

fn json_key_re() -> &'static Regex {
    JSON_KEY_RE.get_or_init(|| {
        Regex::new(r#"(['"])?([a-zA-Z0-9_]+)(['"])?:"#).expect("valid regex")
    })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_date(value: &Value) -> Option<String> {
    let s = value.as_str()?;
    let parsed = DateTime::parse_from_rfc3339(s).ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    )
}

// Composite cells are not strict JSON on the wire: every double quote is
// doubled, single quotes become doubled quotes, and bare `word:` sequences
// gain quoting and a space. Clean objects survive a decode + JSON parse;
// colons inside string values do not. Changing this breaks existing
// consumers, so it stays byte-for-byte.
fn encode_composite(value: &Value) -> String {
    let doubled = value.to_string().replace('"', "\"\"").replace('\'', "\"\"");
    let keyed = json_key_re().replace_all(&doubled, "\"\"${2}\"\": ");
    format!("\"{keyed}\"")
}

fn encode_cell(kind: FieldKind, value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Object(_) | Value::Array(_) => encode_composite(value),
        other => {
            if kind == FieldKind::Date {
                if let Some(formatted) = format_date(other) {
                    return formatted;
                }
            }
            format!("\"{}\"", scalar_text(other).replace('"', "\"\""))
        }
    }
}

/// Encode documents as CSV with the schema's field names as the header.
/// Absent and null values emit empty cells; date fields emit an unquoted
/// `YYYY-MM-DD HH:mm:ss` timestamp; every row, the last included, ends in
/// `\n`.
pub fn to_csv(schema: &CollectionSchema, docs: &[Document]) -> String {
    let mut out = schema.header_line();
    out.push('\n');
    for doc in docs {
        let mut first = true;
        for field in schema.field_names() {
            if !first {
                out.push(',');
            }
            first = false;
            if let Some(value) = doc.get(field) {
                let kind = schema
                    .descriptor(field)
                    .map(|d| d.kind)
                    .unwrap_or(FieldKind::String);
                out.push_str(&encode_cell(kind, value));
            }
        }
        out.push('\n');
    }
    out
}

// Returns the unescaped cell and the bytes consumed including both quotes,
// or None when the closing quote is missing.
fn parse_quoted(input: &str) -> Option<(String, usize)> {
    let inner = &input[1..];
    let mut scan = 0usize;
    loop {
        let quote_at = scan + inner[scan..].find('"')?;
        if inner[quote_at + 1..].starts_with('"') {
            scan = quote_at + 2;
        } else {
            let raw = &inner[..quote_at];
            return Some((raw.replace("\"\"", "\""), quote_at + 2));
        }
    }
}

/// Decode CSV text into rows of cells. A line break opens a new row only
/// when it appears outside quotes; `""` inside a quoted cell unescapes to
/// `"`. Scanning stops at the first position that is neither a delimiter
/// nor a line break, so malformed trailing input is dropped rather than
/// misattributed. Pure function of its input.
pub fn csv_to_rows(data: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![Vec::new()];
    let mut pos = 0usize;
    let mut first = true;
    loop {
        if first {
            first = false;
        } else if data[pos..].starts_with(delimiter) {
            pos += delimiter.len_utf8();
        } else if data[pos..].starts_with("\r\n") {
            pos += 2;
            rows.push(Vec::new());
        } else if data[pos..].starts_with('\n') || data[pos..].starts_with('\r') {
            pos += 1;
            rows.push(Vec::new());
        } else {
            break;
        }

        let rest = &data[pos..];
        let cell = if rest.starts_with('"') {
            match parse_quoted(rest) {
                Some((value, consumed)) => {
                    pos += consumed;
                    value
                }
                // Unterminated quote: emit an empty cell and let the scan
                // stop at the stray quote on the next pass.
                None => String::new(),
            }
        } else {
            let end = rest
                .find(|c: char| c == delimiter || c == '"' || c == '\r' || c == '\n')
                .unwrap_or(rest.len());
            pos += end;
            rest[..end].to_string()
        };
        if let Some(row) = rows.last_mut() {
            row.push(cell);
        }
    }
    rows
}
