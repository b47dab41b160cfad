//! Local fallback store.
//!
//! When the backend cannot be reached every resource client reads and writes
//! here instead. The store keeps:
//! - one collection of JSON records per [`ResourceKind`]
//! - the last visited page per user
//! - a [`LocalIdGenerator`] so offline records get unique, per-resource ids
//!
//! Records are partitioned by their `userId` field: a signed-in user only sees
//! their own records, and a signed-out session only sees unowned ones.
//!
//! The store lives in memory. It can be written to a directory of JSONL files
//! (`visions.jsonl`, `goals.jsonl`, ..., `page-state.jsonl`) and read back, one
//! record per line.

pub mod ids;

pub use ids::{LocalIdGenerator, is_local_id, parse_local_id};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::models::{Entity, ListFilter, Patch, ResourceKind};
use crate::{Error, Result};

/// File holding per-user page state.
const PAGE_STATE_FILE: &str = "page-state.jsonl";

/// Field stamped on every stored record with its owner.
const OWNER_FIELD: &str = "userId";

/// In-memory substitute for the REST backend.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    records: BTreeMap<ResourceKind, Vec<Value>>,
    pages: BTreeMap<String, Value>,
    ids: LocalIdGenerator,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Resource records ===

    /// Records of `kind` owned by `user` that pass `filter`, in insertion order.
    pub fn list(&self, kind: ResourceKind, user: Option<&str>, filter: &ListFilter) -> Vec<Value> {
        self.records
            .get(&kind)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| owned_by(r, user) && filter.matches(kind, r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Typed view of [`LocalStore::list`].
    ///
    /// Records that no longer deserialize are skipped.
    pub fn list_as<T: Entity>(&self, user: Option<&str>, filter: &ListFilter) -> Vec<T> {
        self.list(T::KIND, user, filter)
            .into_iter()
            .filter_map(|r| serde_json::from_value(r).ok())
            .collect()
    }

    /// Single record by id.
    pub fn get(&self, kind: ResourceKind, id: &str, user: Option<&str>) -> Option<&Value> {
        self.records
            .get(&kind)?
            .iter()
            .find(|r| record_id(r) == Some(id) && owned_by(r, user))
    }

    /// Store a new record under a freshly generated local id.
    pub fn insert<T: Entity>(
        &mut self,
        mut entity: T,
        user: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<T> {
        entity.set_id(self.ids.next(T::KIND, now));
        let mut record = serde_json::to_value(&entity)?;
        set_owner(&mut record, user);
        let stored = serde_json::from_value(record.clone())?;
        self.records.entry(T::KIND).or_default().push(record);
        Ok(stored)
    }

    /// Apply `patch` to an existing record.
    ///
    /// Identity and ownership cannot be patched. The merged record must still
    /// pass validation, otherwise the stored record is left untouched.
    pub fn update<T: Entity>(&mut self, id: &str, patch: &Patch, user: Option<&str>) -> Result<T> {
        let record = self
            .records
            .get_mut(&T::KIND)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| record_id(r) == Some(id) && owned_by(r, user))
            })
            .ok_or_else(|| not_found(T::KIND, id))?;

        let mut merged = record.clone();
        if let Value::Object(ref mut map) = merged {
            for (key, value) in patch {
                if matches!(key.as_str(), "id" | "_id" | OWNER_FIELD) {
                    continue;
                }
                map.insert(key.clone(), value.clone());
            }
        }
        let entity: T = serde_json::from_value(merged)?;
        entity.validate()?;

        let mut normalized = serde_json::to_value(&entity)?;
        set_owner(&mut normalized, user);
        *record = normalized;
        Ok(entity)
    }

    /// Remove a record.
    pub fn remove(&mut self, kind: ResourceKind, id: &str, user: Option<&str>) -> Result<()> {
        let records = self
            .records
            .get_mut(&kind)
            .ok_or_else(|| not_found(kind, id))?;
        let before = records.len();
        records.retain(|r| !(record_id(r) == Some(id) && owned_by(r, user)));
        if records.len() == before {
            return Err(not_found(kind, id));
        }
        Ok(())
    }

    /// Number of records of `kind`, across all owners.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.records.get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.records.values().all(Vec::is_empty) && self.pages.is_empty()
    }

    // === Page state ===

    pub fn page(&self, user: &str) -> Option<&Value> {
        self.pages.get(user)
    }

    pub fn set_page(&mut self, user: &str, page: Value) {
        self.pages.insert(user.to_string(), page);
    }

    pub fn clear_page(&mut self, user: &str) -> bool {
        self.pages.remove(user).is_some()
    }

    // === Persistence ===

    /// Write every collection to `dir` as JSONL, replacing previous files.
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        for kind in ResourceKind::ALL {
            let records = self.records.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
            write_jsonl(&dir.join(jsonl_name(kind)), records.iter())?;
        }

        let pages: Vec<Value> = self
            .pages
            .iter()
            .map(|(user, page)| {
                let mut line = Map::new();
                line.insert(OWNER_FIELD.to_string(), Value::String(user.clone()));
                line.insert("page".to_string(), page.clone());
                Value::Object(line)
            })
            .collect();
        write_jsonl(&dir.join(PAGE_STATE_FILE), pages.iter())
    }

    /// Read a store written by [`LocalStore::save_to_dir`].
    ///
    /// Missing files are empty collections. Malformed lines are an error.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut store = Self::new();
        for kind in ResourceKind::ALL {
            let records = read_jsonl(&dir.join(jsonl_name(kind)))?;
            for record in &records {
                if let Some(id) = record_id(record) {
                    store.ids.observe(kind, id);
                }
            }
            if !records.is_empty() {
                store.records.insert(kind, records);
            }
        }

        for line in read_jsonl(&dir.join(PAGE_STATE_FILE))? {
            let user = line.get(OWNER_FIELD).and_then(Value::as_str);
            if let (Some(user), Some(page)) = (user, line.get("page")) {
                store.pages.insert(user.to_string(), page.clone());
            }
        }
        Ok(store)
    }
}

fn jsonl_name(kind: ResourceKind) -> String {
    format!("{}.jsonl", kind.as_str())
}

fn write_jsonl<'a>(path: &Path, lines: impl Iterator<Item = &'a Value>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for value in lines {
        let json = serde_json::to_string(value)?;
        writeln!(writer, "{}", json)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_jsonl(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut values = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        values.push(serde_json::from_str(&line)?);
    }
    Ok(values)
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn owned_by(record: &Value, user: Option<&str>) -> bool {
    record.get(OWNER_FIELD).and_then(Value::as_str) == user
}

fn set_owner(record: &mut Value, user: Option<&str>) {
    if let Value::Object(map) = record {
        match user {
            Some(u) => {
                map.insert(OWNER_FIELD.to_string(), Value::String(u.to_string()));
            }
            None => {
                map.remove(OWNER_FIELD);
            }
        }
    }
}

fn not_found(kind: ResourceKind, id: &str) -> Error {
    Error::NotFound(format!("{}/{}", kind, id))
}
