//! Parser for the semi-structured grade CSV exports.
//!
//! Exports are known to carry trailing partial lines and stray quotes, so the
//! parser never fails: lines it cannot make sense of are dropped.

use std::collections::HashMap;

/// One data line of a grade export, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: HashMap<String, String>,
}

impl Row {
    /// Returns the raw value for `column`, or `None` if the column is absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Returns the value for `column` when it is present and non-empty.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parses a whole export into rows.
///
/// The first line is the header. Data lines whose field count differs from
/// the header's are skipped.
pub fn parse_csv(content: &str) -> Vec<Row> {
    let mut lines = content.lines();

    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();

    let mut rows = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let values = parse_line(line);
        if values.len() != headers.len() {
            continue;
        }

        rows.push(headers.iter().copied().zip(values).collect());
    }

    rows
}

/// Splits a single line into trimmed fields.
///
/// A `"` toggles quoted mode and is not kept. Commas inside quotes belong to
/// the field. Quote state never outlives the line.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    fields.push(current.trim().to_string());
    fields
}
