//! TOML-backed configuration store

use std::path::{Path, PathBuf};

use toml::{Table, Value};

use super::{same_name, ConfigStore, Leaf, NodePath, STOCK_DOCUMENT};
use crate::error::{StoreError, StoreResult};

/// A hierarchical TOML document, optionally backed by a file.
#[derive(Debug, Clone, Default)]
pub struct TomlStore {
    document: Table,
    source: Option<PathBuf>,
}

impl TomlStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing document (in-memory)
    pub fn from_table(document: Table) -> Self {
        Self {
            document,
            source: None,
        }
    }

    /// Parse a document from a string (in-memory)
    pub fn parse(content: &str) -> StoreResult<Self> {
        Ok(Self::from_table(toml::from_str::<Table>(content)?))
    }

    /// Read a document from `path`.
    ///
    /// Subsequent [`ConfigStore::flush`] calls write back to the same file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let document = toml::from_str::<Table>(&content)?;
        tracing::debug!("Loaded permissions from {:?}", path);
        Ok(Self {
            document,
            source: Some(path.to_path_buf()),
        })
    }

    /// Read a document from `path`, writing the stock document first if the
    /// file does not exist.
    pub fn open_or_create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, STOCK_DOCUMENT)?;
            tracing::info!("Generated default permissions file at {:?}", path);
        }
        Self::open(path)
    }

    /// The underlying document
    pub fn document(&self) -> &Table {
        &self.document
    }

    /// Backing file, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Serialize the document
    pub fn to_toml_string(&self) -> StoreResult<String> {
        Ok(toml::to_string_pretty(&self.document)?)
    }

    fn lookup(&self, path: &NodePath) -> StoreResult<Option<&Value>> {
        let segments = path.segments();
        let Some((last, parents)) = segments.split_last() else {
            return Ok(None);
        };

        let mut table = &self.document;
        for (depth, segment) in parents.iter().enumerate() {
            match find_key(table, segment).and_then(|key| table.get(key)) {
                None => return Ok(None),
                Some(Value::Table(child)) => table = child,
                Some(other) => {
                    return Err(StoreError::WrongType {
                        path: prefix(segments, depth + 1),
                        expected: "table",
                        found: kind(other),
                    })
                }
            }
        }

        Ok(find_key(table, last).and_then(|key| table.get(key)))
    }

    /// Walk to the table at `segments`, creating missing tables when `create`
    fn table_mut(&mut self, segments: &[String], create: bool) -> StoreResult<Option<&mut Table>> {
        let mut table = &mut self.document;
        for (depth, segment) in segments.iter().enumerate() {
            let key = match find_key(table, segment).map(str::to_owned) {
                Some(key) => key,
                None if create => {
                    table.insert(segment.clone(), Value::Table(Table::new()));
                    segment.clone()
                }
                None => return Ok(None),
            };
            table = match table.get_mut(&key) {
                Some(Value::Table(child)) => child,
                _ => {
                    return Err(StoreError::NotATable {
                        path: prefix(segments, depth + 1),
                    })
                }
            };
        }
        Ok(Some(table))
    }
}

impl ConfigStore for TomlStore {
    fn current_path(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "<memory>".to_string(),
        }
    }

    fn exists(&self, path: &NodePath) -> StoreResult<bool> {
        if path.is_root() {
            return Ok(true);
        }
        Ok(self.lookup(path)?.is_some())
    }

    fn keys(&self, path: &NodePath) -> StoreResult<Option<Vec<String>>> {
        if path.is_root() {
            return Ok(Some(self.document.keys().cloned().collect()));
        }
        match self.lookup(path)? {
            None => Ok(None),
            Some(Value::Table(table)) => Ok(Some(table.keys().cloned().collect())),
            Some(other) => Err(StoreError::WrongType {
                path: path.to_string(),
                expected: "table",
                found: kind(other),
            }),
        }
    }

    fn get_bool(&self, path: &NodePath) -> StoreResult<Option<bool>> {
        match self.lookup(path)? {
            None => Ok(None),
            Some(Value::Boolean(value)) => Ok(Some(*value)),
            Some(other) => Err(StoreError::WrongType {
                path: path.to_string(),
                expected: "boolean",
                found: kind(other),
            }),
        }
    }

    fn get_string_list(&self, path: &NodePath) -> StoreResult<Option<Vec<String>>> {
        let items = match self.lookup(path)? {
            None => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(StoreError::WrongType {
                    path: path.to_string(),
                    expected: "string list",
                    found: kind(other),
                })
            }
        };

        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(StoreError::WrongType {
                    path: path.to_string(),
                    expected: "string list",
                    found: kind(other),
                }),
            })
            .collect::<StoreResult<Vec<_>>>()
            .map(Some)
    }

    fn set(&mut self, path: &NodePath, value: Leaf) -> StoreResult<()> {
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(StoreError::NotATable {
                path: path.to_string(),
            });
        };
        let Some(table) = self.table_mut(parents, true)? else {
            return Err(StoreError::NotATable {
                path: path.to_string(),
            });
        };

        let key = find_key(table, last)
            .map(str::to_owned)
            .unwrap_or_else(|| last.clone());
        let value = match value {
            Leaf::Bool(b) => Value::Boolean(b),
            Leaf::StringList(items) => Value::Array(items.into_iter().map(Value::String).collect()),
            Leaf::Table => Value::Table(Table::new()),
        };
        table.insert(key, value);
        Ok(())
    }

    fn remove(&mut self, path: &NodePath) -> StoreResult<bool> {
        let Some((last, parents)) = path.segments().split_last() else {
            return Ok(false);
        };
        let Some(table) = self.table_mut(parents, false)? else {
            return Ok(false);
        };
        let Some(key) = find_key(table, last).map(str::to_owned) else {
            return Ok(false);
        };
        Ok(table.remove(&key).is_some())
    }

    fn flush(&mut self) -> StoreResult<()> {
        let Some(path) = &self.source else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.document)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved permissions to {:?}", path);
        Ok(())
    }
}

/// Exact key match first, then by folded name
fn find_key<'a>(table: &'a Table, segment: &str) -> Option<&'a str> {
    table
        .keys()
        .find(|key| key.as_str() == segment)
        .or_else(|| table.keys().find(|key| same_name(key, segment)))
        .map(String::as_str)
}

fn prefix(segments: &[String], len: usize) -> String {
    segments[..len].join("/")
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "boolean",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "array",
        Value::Table(_) => "table",
    }
}
