//! Pending work items read from a CSV file.
//!
//! The file has a header row naming the columns `user_id`, `title`,
//! `video_url`, `video_thumbnail_url` and optionally `createdAt`, in any order.
//! A field may be wrapped in double quotes, in which case it may contain
//! commas and `""` stands for one quote. Unquoted fields are trimmed.
//! Records may not span lines.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, ServiceError};
use crate::orchestrator::ItemState;
use crate::queue::{WorkItem, WorkQueue};

const REQUIRED_COLUMNS: [&str; 4] = ["user_id", "title", "video_url", "video_thumbnail_url"];

/// Split one CSV line into its fields.
fn split_record(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut closed = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => {
                    in_quotes = false;
                    closed = true;
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            ',' => {
                fields.push(finish(&mut field, quoted));
                quoted = false;
                closed = false;
            }
            '"' if !quoted && field.trim().is_empty() => {
                field.clear();
                quoted = true;
                in_quotes = true;
            }
            c if closed && c.is_whitespace() => {}
            c if closed => return Err(format!("unexpected '{c}' after closing quote")),
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(finish(&mut field, quoted));
    Ok(fields)
}

fn finish(field: &mut String, quoted: bool) -> String {
    let value = std::mem::take(field);
    if quoted { value } else { value.trim().to_string() }
}

/// Parse work items from CSV text.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`ServiceError::SourceError`] if the header lacks a required column,
/// a row has a different number of fields than the header, or a quoted field
/// is malformed.
pub fn parse_work_items(content: &str) -> Result<Vec<WorkItem>> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };

    let header = split_record(header)
        .map_err(|e| ServiceError::SourceError(format!("header: {e}")))?;
    let columns: HashMap<String, usize> =
        header.into_iter().enumerate().map(|(i, name)| (name, i)).collect();
    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(ServiceError::SourceError(format!("missing column '{required}'")));
        }
    }

    lines
        .enumerate()
        .map(|(row, line)| {
            let values = split_record(line)
                .map_err(|e| ServiceError::SourceError(format!("row {}: {e}", row + 1)))?;
            if values.len() != columns.len() {
                return Err(ServiceError::SourceError(format!(
                    "row {} has {} fields, expected {}",
                    row + 1,
                    values.len(),
                    columns.len()
                )));
            }
            let field = |name: &str| columns.get(name).map(|&i| values[i].clone());
            Ok(WorkItem {
                user_id: field("user_id").unwrap_or_default(),
                title: field("title").unwrap_or_default(),
                video_url: field("video_url").unwrap_or_default(),
                video_thumbnail_url: field("video_thumbnail_url").unwrap_or_default(),
                created_at: field("createdAt").filter(|v| !v.is_empty()),
            })
        })
        .collect()
}

/// Read work items from the CSV file at `path`.
pub async fn read_work_items(path: impl AsRef<Path>) -> Result<Vec<WorkItem>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ServiceError::SourceError(format!("cannot read '{}': {e}", path.display()))
    })?;
    parse_work_items(&content)
}

/// Enqueue every pending work item found in the CSV at `path`.
///
/// Returns the number of items enqueued.
pub async fn ingest_batch(path: impl AsRef<Path>, queue: &WorkQueue) -> Result<usize> {
    let items = read_work_items(path).await?;
    let count = items.len();
    for item in items {
        debug!(title = %item.title, state = %ItemState::Queued, "queueing transcription");
        queue.enqueue(item)?;
    }
    info!(count, "queued work items");
    Ok(count)
}
