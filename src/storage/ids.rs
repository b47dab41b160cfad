//! Identifiers for records created while offline.
//!
//! Format: `<prefix>-<n>` where the prefix names the resource
//! (`local-goal`, `local-word`, ...) and `n` is a millisecond timestamp bumped
//! as needed so that ids within one resource strictly increase.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::models::ResourceKind;

/// Per-resource monotonic id source.
#[derive(Debug, Clone, Default)]
pub struct LocalIdGenerator {
    last: BTreeMap<ResourceKind, i64>,
}

impl LocalIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for `kind`, never equal to or below one issued before.
    pub fn next(&mut self, kind: ResourceKind, now: DateTime<Utc>) -> String {
        let last = self.last.entry(kind).or_insert(i64::MIN);
        let n = now.timestamp_millis().max(last.saturating_add(1));
        *last = n;
        format!("{}-{}", kind.local_prefix(), n)
    }

    /// Account for an id that already exists (e.g. loaded from disk).
    pub fn observe(&mut self, kind: ResourceKind, id: &str) {
        if let Some(n) = parse_local_id(kind, id) {
            let last = self.last.entry(kind).or_insert(i64::MIN);
            *last = (*last).max(n);
        }
    }
}

/// Sequence number of a locally generated id for `kind`.
pub fn parse_local_id(kind: ResourceKind, id: &str) -> Option<i64> {
    id.strip_prefix(kind.local_prefix())?
        .strip_prefix('-')?
        .parse()
        .ok()
}

/// Whether `id` was generated by the local store for any resource.
pub fn is_local_id(id: &str) -> bool {
    ResourceKind::ALL
        .iter()
        .any(|kind| parse_local_id(*kind, id).is_some())
}
