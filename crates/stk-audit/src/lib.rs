//! stk-audit
//!
//! Stock audit records are produced by the backend as a side effect of every
//! write. This crate never constructs them; it parses, tags and merges the
//! two streams (menu-item level and option level) for display.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSource {
    #[default]
    MenuItem,
    Option,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub source: AuditSource,
    /// Set for option-level records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_name: Option<String>,
}

impl AuditRecord {
    pub fn delta(&self) -> i64 {
        self.new_quantity - self.previous_quantity
    }
}

/// Merge both streams newest-first.
///
/// Each record is tagged with the stream it came from. Equal timestamps keep
/// menu-item records ahead of option records, and input order within a stream.
pub fn merge_streams(menu_item: &[AuditRecord], option: &[AuditRecord]) -> Vec<AuditRecord> {
    let tagged = |records: &[AuditRecord], source: AuditSource| {
        records
            .iter()
            .cloned()
            .map(move |mut r| {
                r.source = source;
                r
            })
            .collect::<Vec<_>>()
    };

    let mut merged = tagged(menu_item, AuditSource::MenuItem);
    merged.extend(tagged(option, AuditSource::Option));
    // Stable sort keeps the concatenation order on ties.
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged
}

/// Parse JSON Lines (one record per line; blank lines skipped).
pub fn parse_jsonl(raw: &str) -> Result<Vec<AuditRecord>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<AuditRecord>(line)
                .with_context(|| format!("invalid audit record on line {}", idx + 1))
        })
        .collect()
}

pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<AuditRecord>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read audit log {:?}", path))?;
    parse_jsonl(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(minute: u32, prev: i64, new: i64) -> AuditRecord {
        AuditRecord {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap(),
            previous_quantity: prev,
            new_quantity: new,
            reason: None,
            source: AuditSource::MenuItem,
            option_id: None,
            option_name: None,
        }
    }

    #[test]
    fn merge_is_newest_first_and_tagged() {
        let item = vec![rec(1, 10, 12), rec(5, 12, 8)];
        let opts = vec![rec(3, 4, 6)];
        let merged = merge_streams(&item, &opts);
        let order: Vec<i64> = merged.iter().map(|r| r.new_quantity).collect();
        assert_eq!(order, vec![8, 6, 12]);
        assert_eq!(merged[1].source, AuditSource::Option);
        assert_eq!(merged[0].source, AuditSource::MenuItem);
    }

    #[test]
    fn merge_ties_keep_menu_item_first() {
        let merged = merge_streams(&[rec(2, 1, 2)], &[rec(2, 3, 4)]);
        assert_eq!(merged[0].source, AuditSource::MenuItem);
        assert_eq!(merged[1].source, AuditSource::Option);
    }

    #[test]
    fn parse_jsonl_reports_line_numbers() {
        let good = r#"{"timestamp":"2026-03-01T12:00:00Z","previous_quantity":3,"new_quantity":5,"reason":"restock"}"#;
        let parsed = parse_jsonl(&format!("{good}\n\n{good}\n")).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].delta(), 2);
        assert_eq!(parsed[0].reason.as_deref(), Some("restock"));

        let err = parse_jsonl(&format!("{good}\nnot json\n")).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn read_jsonl_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item.jsonl");
        fs::write(
            &path,
            r#"{"timestamp":"2026-03-01T12:00:00Z","previous_quantity":0,"new_quantity":9,"source":"option","option_id":"small"}"#,
        )
        .unwrap();
        let records = read_jsonl(&path).unwrap();
        assert_eq!(records[0].source, AuditSource::Option);
        assert_eq!(records[0].option_id.as_deref(), Some("small"));
    }
}
