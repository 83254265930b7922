//! Key-value backend contract and the in-memory reference implementation.
//!
//! Records cross this boundary as JSON documents; the store layer above
//! deserializes and validates them. The contract is deliberately small:
//! point reads, two single-field write primitives (one conditional, one
//! not), single-field delete, and a cursor-paginated partition scan.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::KvError;

/// Composite record key: partition (owner) + sort (position key or game id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

/// Opaque scan position; callers hold it between pages and may persist it to
/// resume a scan later.
pub type ScanCursor = String;

/// One page of a partition scan.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub items: Vec<Value>,
    /// Cursor for the next page; `None` means the scan is complete.
    pub next: Option<ScanCursor>,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a record. Absence is `None`, not an error.
    async fn get_item(&self, key: &ItemKey) -> Result<Option<Value>, KvError>;

    /// Create the map at `path` on the record (creating the record itself if
    /// needed), failing with [`KvError::AlreadyExists`] if `path` is already
    /// present. An empty `path` addresses the whole record.
    async fn put_if_absent(&self, key: &ItemKey, path: &str, value: Value)
        -> Result<(), KvError>;

    /// Unconditionally set a single `field` inside the map at `path` (record
    /// root when `path` is empty), leaving sibling fields untouched.
    async fn merge_field(
        &self,
        key: &ItemKey,
        path: &str,
        field: &str,
        value: Value,
    ) -> Result<(), KvError>;

    /// Remove a single field. Missing record or field is a no-op.
    async fn delete_field(&self, key: &ItemKey, path: &str, field: &str) -> Result<(), KvError>;

    /// One page of records in `partition`, unordered from the caller's point
    /// of view, resumable via the returned cursor.
    async fn scan_page(
        &self,
        partition: &str,
        cursor: Option<ScanCursor>,
    ) -> Result<ScanPage, KvError>;
}

const DEFAULT_PAGE_SIZE: usize = 100;

/// In-memory [`KeyValueStore`] with the same observable semantics as a
/// remote document table. Backs every test in this crate.
pub struct MemoryKv {
    partition_attr: &'static str,
    sort_attr: &'static str,
    page_size: usize,
    items: Mutex<BTreeMap<(String, String), Value>>,
}

impl MemoryKv {
    /// `partition_attr`/`sort_attr` are the attribute names the key fields
    /// materialize under inside each record, so deserialization sees them.
    pub fn new(partition_attr: &'static str, sort_attr: &'static str) -> Self {
        Self::with_page_size(partition_attr, sort_attr, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(
        partition_attr: &'static str,
        sort_attr: &'static str,
        page_size: usize,
    ) -> Self {
        Self {
            partition_attr,
            sort_attr,
            page_size: page_size.max(1),
            items: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(String, String), Value>>, KvError> {
        self.items
            .lock()
            .map_err(|_| KvError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn seed(&self, key: &ItemKey) -> Map<String, Value> {
        let mut obj = Map::new();
        obj.insert(
            self.partition_attr.to_string(),
            Value::String(key.partition.clone()),
        );
        obj.insert(self.sort_attr.to_string(), Value::String(key.sort.clone()));
        obj
    }
}

fn object_of(item: &mut Value) -> Result<&mut Map<String, Value>, KvError> {
    item.as_object_mut()
        .ok_or_else(|| KvError::Malformed("stored item is not an object".to_string()))
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get_item(&self, key: &ItemKey) -> Result<Option<Value>, KvError> {
        let items = self.lock()?;
        Ok(items
            .get(&(key.partition.clone(), key.sort.clone()))
            .cloned())
    }

    async fn put_if_absent(
        &self,
        key: &ItemKey,
        path: &str,
        value: Value,
    ) -> Result<(), KvError> {
        let mut items = self.lock()?;
        match items.entry((key.partition.clone(), key.sort.clone())) {
            Entry::Occupied(mut occupied) => {
                if path.is_empty() {
                    return Err(KvError::AlreadyExists);
                }
                let obj = object_of(occupied.get_mut())?;
                if obj.contains_key(path) {
                    return Err(KvError::AlreadyExists);
                }
                obj.insert(path.to_string(), value);
            }
            Entry::Vacant(slot) => {
                let mut obj = if path.is_empty() {
                    match value {
                        Value::Object(fields) => fields,
                        other => {
                            return Err(KvError::Malformed(format!(
                                "record body must be an object, got {other}"
                            )))
                        }
                    }
                } else {
                    let mut obj = Map::new();
                    obj.insert(path.to_string(), value);
                    obj
                };
                // Key attributes always win over caller-supplied duplicates.
                for (attr, v) in self.seed(key) {
                    obj.insert(attr, v);
                }
                slot.insert(Value::Object(obj));
            }
        }
        Ok(())
    }

    async fn merge_field(
        &self,
        key: &ItemKey,
        path: &str,
        field: &str,
        value: Value,
    ) -> Result<(), KvError> {
        let mut items = self.lock()?;
        let item = items
            .entry((key.partition.clone(), key.sort.clone()))
            .or_insert_with(|| Value::Object(self.seed(key)));
        let obj = object_of(item)?;
        if path.is_empty() {
            obj.insert(field.to_string(), value);
        } else {
            let slot = obj
                .entry(path.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let map = slot.as_object_mut().ok_or_else(|| {
                KvError::Malformed(format!("field {path} is not a map"))
            })?;
            map.insert(field.to_string(), value);
        }
        Ok(())
    }

    async fn delete_field(&self, key: &ItemKey, path: &str, field: &str) -> Result<(), KvError> {
        let mut items = self.lock()?;
        if let Some(item) = items.get_mut(&(key.partition.clone(), key.sort.clone())) {
            let obj = object_of(item)?;
            if path.is_empty() {
                obj.remove(field);
            } else if let Some(map) = obj.get_mut(path).and_then(Value::as_object_mut) {
                map.remove(field);
            }
        }
        Ok(())
    }

    async fn scan_page(
        &self,
        partition: &str,
        cursor: Option<ScanCursor>,
    ) -> Result<ScanPage, KvError> {
        let items = self.lock()?;
        let lower = match cursor {
            Some(c) => Bound::Excluded((partition.to_string(), c)),
            None => Bound::Included((partition.to_string(), String::new())),
        };
        let mut page = Vec::with_capacity(self.page_size);
        let mut last_sort: Option<String> = None;
        let mut more = false;
        for ((p, sort), value) in items.range((lower, Bound::Unbounded)) {
            if p.as_str() != partition {
                break;
            }
            if page.len() == self.page_size {
                more = true;
                break;
            }
            last_sort = Some(sort.clone());
            page.push(value.clone());
        }
        let next = if more { last_sort } else { None };
        Ok(ScanPage { items: page, next })
    }
}
