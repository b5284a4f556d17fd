//! Output formatting for query results.
//!
//! Supports pretty JSON and flat CSV.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;
use tracing::debug;

use crate::analyzers::types::EntitySummary;

/// Separator used when the related-name list is flattened into one CSV cell.
const RELATED_SEPARATOR: &str = "; ";

/// One CSV line per summary. CSV has no lists, so related names are joined.
#[derive(Debug, Serialize)]
struct SummaryRecord<'a> {
    id: &'a str,
    subject: &'a str,
    catalog_number: &'a str,
    description: &'a str,
    total_students: u64,
    average_gpa: Option<f64>,
    related: String,
}

impl<'a> From<&'a EntitySummary> for SummaryRecord<'a> {
    fn from(s: &'a EntitySummary) -> Self {
        SummaryRecord {
            id: &s.id,
            subject: &s.subject,
            catalog_number: &s.catalog_number,
            description: &s.description,
            total_students: s.total_students,
            average_gpa: s.average_gpa,
            related: s.related.join(RELATED_SEPARATOR),
        }
    }
}

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(mut writer: W, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes summaries as CSV with a header row.
///
/// An absent score is written as an empty cell.
pub fn write_csv<W: Write>(writer: W, summaries: &[EntitySummary]) -> Result<()> {
    debug!(rows = summaries.len(), "Writing CSV output");

    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for summary in summaries {
        writer.serialize(SummaryRecord::from(summary))?;
    }
    writer.flush()?;

    Ok(())
}
