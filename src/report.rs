use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::evaluate::RunReport;
use crate::snapshot::store::{write_atomic, StoreError};

pub const NO_CHANGES_MARKER: &str = "**No changes for today**";

const TIMESTAMP_HEADER: &str = "## ";

/// How a run's rendering is persisted against the cumulative report
/// artifact: `replace` keeps only the latest run, `prepend` grows a
/// newest-first history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    Replace,
    Prepend,
}

impl Display for ReportMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Prepend => write!(f, "prepend"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown report mode: {0}")]
pub struct ReportModeParseError(pub String);

impl FromStr for ReportMode {
    type Err = ReportModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "prepend" => Ok(Self::Prepend),
            _ => Err(ReportModeParseError(s.to_string())),
        }
    }
}

/// Renders one run as a timestamp-headed Markdown block. Only changed
/// sources get a section; a run without changes renders the fixed marker.
pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{TIMESTAMP_HEADER}{}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if report.has_changes() {
        for result in report.results.iter().filter(|r| r.changed) {
            out.push_str(&format!("### [{0}]({0})\n\n", result.source));
            out.push_str("**Line changes detected!**\n\n");
            out.push_str("```diff\n");
            out.push_str(&result.diff);
            out.push_str("\n```\n\n---\n\n");
        }
    } else {
        out.push_str(NO_CHANGES_MARKER);
        out.push_str("\n\n---\n");
    }
    out
}

/// Writes the rendered block to the report artifact. The whole artifact is
/// assembled in memory and written atomically.
pub fn write_report(path: &Path, rendered: &str, mode: ReportMode) -> Result<(), StoreError> {
    let contents = match mode {
        ReportMode::Replace => rendered.to_string(),
        ReportMode::Prepend => match fs::read_to_string(path) {
            Ok(previous) => format!("{rendered}\n{previous}"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => rendered.to_string(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        },
    };
    write_atomic(path, &contents)
}

/// Isolates the newest timestamp-headed block of the report artifact into a
/// separate file. Returns `false` (with a warning, not an error) when the
/// artifact is missing or holds no timestamped block.
pub fn extract_latest_block(report_path: &Path, latest_path: &Path) -> Result<bool, StoreError> {
    let contents = match fs::read_to_string(report_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("report artifact not found: {}", report_path.display());
            return Ok(false);
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: report_path.to_path_buf(),
                source,
            })
        }
    };

    let Some(block) = latest_block(&contents) else {
        warn!(
            "no timestamped block found in {}",
            report_path.display()
        );
        return Ok(false);
    };

    write_atomic(latest_path, &block)?;
    info!("wrote latest block to {}", latest_path.display());
    Ok(true)
}

fn latest_block(contents: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut in_block = false;
    for line in contents.lines() {
        if line.starts_with(TIMESTAMP_HEADER) {
            if in_block {
                break;
            }
            in_block = true;
        }
        if in_block {
            lines.push(line);
        }
    }
    if !in_block {
        return None;
    }
    let mut block = lines.join("\n");
    block.push('\n');
    Some(block)
}
