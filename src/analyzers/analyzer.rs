use crate::analyzers::aggregate::{ByCourse, ByProfessor, aggregate};
use crate::analyzers::types::Snapshot;
use crate::parser::{Row, parse_csv};
use anyhow::{Context, Result};
use chrono::Utc;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File names must contain this marker to be aggregated.
const CLEANED_MARKER: &str = "cleaned_data";

/// Pre-merged exports carry this marker and would double count.
const COMBINED_MARKER: &str = "combined";

/// Reads every cleaned grade export under `data_dir` and builds both entity
/// tables from them.
///
/// I/O failures abort the pass; nothing is returned until both tables are
/// complete.
#[tracing::instrument(skip_all, fields(data_dir = %data_dir.display()))]
pub fn build_snapshot(data_dir: &Path) -> Result<Snapshot> {
    let rows = load_rows(data_dir)?;

    let courses = aggregate(&ByCourse, &rows);
    let professors = aggregate(&ByProfessor, &rows);

    info!(
        rows = rows.len(),
        courses = courses.len(),
        professors = professors.len(),
        "Grade data aggregated"
    );

    Ok(Snapshot {
        built_at: Utc::now(),
        courses,
        professors,
    })
}

/// Returns whether `file_name` names a cleaned, non-combined CSV export.
pub fn is_source_file(file_name: &str) -> bool {
    file_name.contains(CLEANED_MARKER)
        && file_name.ends_with(".csv")
        && !file_name.contains(COMBINED_MARKER)
}

/// Lists source files in `data_dir`, sorted by name.
pub fn discover_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory {}", data_dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        // `is_file` follows symlinks.
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if is_source_file(name) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Parses every discovered file and concatenates the rows.
///
/// Invalid UTF-8 is replaced with U+FFFD rather than failing the file.
pub fn load_rows(data_dir: &Path) -> Result<Vec<Row>> {
    let mut rows = Vec::new();

    for path in discover_files(data_dir)? {
        let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = content {
            warn!(file = %path.display(), "Export is not valid UTF-8, replacing bad bytes");
        }
        let parsed = parse_csv(&content);

        debug!(file = %path.display(), rows = parsed.len(), "Parsed grade export");
        rows.extend(parsed);
    }

    Ok(rows)
}
