//! Item projection
//!
//! A table applies exactly one view to everything it hands out. `Raw`
//! passes items through; `FieldView` reads a fixed set of named fields.

use super::item::Item;
use super::Table;
use crate::error::{Result, TableError};
use crate::xpath::compile_cached;
use indexmap::IndexMap;
use tracing::warn;

/// Projection applied to every item a table returns.
///
/// Views receive the owning table, so they can read its name, session
/// identity or document while projecting.
pub trait View: Sized {
    type Output;

    fn project(&self, table: &Table<Self>, item: Item) -> Self::Output;
}

/// Identity view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Raw;

impl View for Raw {
    type Output = Item;

    fn project(&self, _table: &Table<Self>, item: Item) -> Item {
        item
    }
}

/// Named fields, each read as the trimmed text of a path relative to the item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    name: String,
    fields: IndexMap<String, String>,
}

impl FieldView {
    pub fn new(name: impl Into<String>, fields: IndexMap<String, String>) -> Result<Self> {
        for path in fields.values() {
            compile_cached(path).map_err(|e| TableError::path(path, e))?;
        }
        Ok(FieldView {
            name: name.into(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl View for FieldView {
    type Output = Record;

    fn project(&self, _table: &Table<Self>, item: Item) -> Record {
        let values = self
            .fields
            .iter()
            .map(|(field, path)| {
                let value = item.text(path).unwrap_or_else(|e| {
                    warn!(view = %self.name, field = %field, error = %e, "field evaluation failed");
                    None
                });
                (field.clone(), value)
            })
            .collect();
        Record { item, values }
    }
}

/// Output of a `FieldView`: field values in definition order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    item: Item,
    values: IndexMap<String, Option<String>>,
}

impl Record {
    /// Value of `field`; `None` when the field is unknown or its path matched nothing
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field)?.as_deref()
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
