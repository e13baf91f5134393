//! Keyed tables over XML documents
//!
//! A `Table` overlays list, map and iterator access on the repeated items
//! of one document snapshot:
//! - `PathSpec` says where items live and how each one is keyed
//! - keys are resolved once per snapshot and cached
//! - lookups by key, position or slice become path queries
//! - every returned item goes through the table's `View`

pub mod definition;
pub mod index;
pub mod item;
pub mod key;
pub mod resolver;
pub mod session;
pub mod spec;
pub mod view;

#[cfg(test)]
mod tests;

pub use definition::{load_definitions, Definitions, TableDef};
pub use index::{ItemIndex, SliceRange};
pub use item::Item;
pub use key::Key;
pub use resolver::resolve_keys;
pub use session::{ArgValue, Args, Request, Session, SessionError};
pub use spec::{KeySpec, PathSpec};
pub use view::{FieldView, Raw, Record, View};

use crate::dom::XmlDocument;
use crate::error::{Result, TableError};
use std::cell::{Cell, OnceCell};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Indexing argument: a key, a position or a slice
#[derive(Debug, Clone, PartialEq)]
pub enum KeyQuery {
    Name(String),
    Tuple(Vec<String>),
    Position(isize),
    Slice(SliceRange),
}

impl From<&str> for KeyQuery {
    fn from(name: &str) -> Self {
        KeyQuery::Name(name.to_string())
    }
}

impl From<String> for KeyQuery {
    fn from(name: String) -> Self {
        KeyQuery::Name(name)
    }
}

impl From<(&str, &str)> for KeyQuery {
    fn from((a, b): (&str, &str)) -> Self {
        KeyQuery::Tuple(vec![a.to_string(), b.to_string()])
    }
}

impl From<Vec<String>> for KeyQuery {
    fn from(parts: Vec<String>) -> Self {
        KeyQuery::Tuple(parts)
    }
}

impl From<isize> for KeyQuery {
    fn from(position: isize) -> Self {
        KeyQuery::Position(position)
    }
}

impl From<SliceRange> for KeyQuery {
    fn from(range: SliceRange) -> Self {
        KeyQuery::Slice(range)
    }
}

impl From<Key> for KeyQuery {
    fn from(key: Key) -> Self {
        match key {
            Key::Simple(name) => KeyQuery::Name(name),
            Key::Composite(parts) => KeyQuery::Tuple(parts),
        }
    }
}

impl From<&Key> for KeyQuery {
    fn from(key: &Key) -> Self {
        key.clone().into()
    }
}

/// Result of `Table::select`
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<T> {
    /// Key or position lookup; `None` when no item has the key
    Single(Option<T>),
    /// Slice lookup
    Many(Vec<T>),
}

impl<T> Selection<T> {
    pub fn into_single(self) -> Option<T> {
        match self {
            Selection::Single(item) => item,
            Selection::Many(items) => items.into_iter().next(),
        }
    }

    pub fn into_many(self) -> Vec<T> {
        match self {
            Selection::Single(item) => item.into_iter().collect(),
            Selection::Many(items) => items,
        }
    }
}

/// Keyed, ordered view over the repeated items of one document snapshot
pub struct Table<V: View = Raw> {
    name: String,
    spec: PathSpec,
    view: V,
    doc: Option<Arc<XmlDocument>>,
    session: Option<Arc<dyn Session>>,
    request: Option<Request>,
    path: Option<PathBuf>,
    keys: OnceCell<Vec<Key>>,
    key_scans: Cell<usize>,
}

impl Table<Raw> {
    pub fn new(name: impl Into<String>, spec: PathSpec) -> Self {
        Table::with_view(name, spec, Raw)
    }
}

impl<V: View> Table<V> {
    pub fn with_view(name: impl Into<String>, spec: PathSpec, view: V) -> Self {
        Table {
            name: name.into(),
            spec,
            view,
            doc: None,
            session: None,
            request: None,
            path: None,
            keys: OnceCell::new(),
            key_scans: Cell::new(0),
        }
    }

    pub fn with_document(mut self, doc: impl Into<Arc<XmlDocument>>) -> Self {
        self.attach(doc);
        self
    }

    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Default RPC used by `get()`
    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// XML file read by `get()` when no session is set
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Attach a document snapshot, dropping cached keys
    pub fn attach(&mut self, doc: impl Into<Arc<XmlDocument>>) {
        let doc = doc.into();
        debug!(table = %self.name, nodes = doc.node_count(), "document attached");
        self.doc = Some(doc);
        self.keys = OnceCell::new();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn document(&self) -> Option<&Arc<XmlDocument>> {
        self.doc.as_ref()
    }

    /// Identity of the session's device
    pub fn hostname(&self) -> Option<&str> {
        self.session.as_deref().map(|s| s.hostname())
    }

    /// True until a document is attached
    pub fn is_empty(&self) -> bool {
        self.doc.is_none()
    }

    pub fn is_container(&self) -> bool {
        self.spec.is_container()
    }

    /// Number of times keys were resolved from a document
    pub fn key_scans(&self) -> usize {
        self.key_scans.get()
    }

    // ----------------------------------------------------------------
    // Acquisition
    // ----------------------------------------------------------------

    /// Fetch with the default request arguments
    pub fn get(&mut self) -> Result<()> {
        self.get_with(&Args::new())
    }

    /// Fetch a fresh document; `args` override the definition's defaults
    pub fn get_with(&mut self, args: &Args) -> Result<()> {
        let doc = match (&self.session, &self.path) {
            (Some(session), _) => {
                let request = self
                    .request
                    .as_ref()
                    .ok_or_else(|| TableError::NoSource(self.name.clone()))?
                    .merged(args);
                debug!(table = %self.name, host = session.hostname(), rpc = %request.rpc, "executing rpc");
                let reply = session.execute(&request).map_err(|source| TableError::Session {
                    hostname: session.hostname().to_string(),
                    source,
                })?;
                XmlDocument::parse_strict(&reply).map_err(TableError::Parse)?
            }
            (None, Some(path)) => {
                debug!(table = %self.name, path = %path.display(), "reading xml file");
                XmlDocument::from_file(path)?
            }
            (None, None) => return Err(TableError::NoSource(self.name.clone())),
        };
        self.attach(doc);
        Ok(())
    }

    // ----------------------------------------------------------------
    // Reads
    // ----------------------------------------------------------------

    fn data(&self) -> Result<&Arc<XmlDocument>> {
        self.doc.as_ref().ok_or(TableError::EmptyTable)
    }

    fn item_path(&self) -> Result<&str> {
        self.spec
            .item_path()
            .ok_or_else(|| TableError::ContainerTable(self.name.clone()))
    }

    /// Item keys in document order, resolved once per document
    pub fn keys(&self) -> Result<&[Key]> {
        let doc = self.data()?;
        self.item_path()?;
        if let Some(keys) = self.keys.get() {
            return Ok(keys.as_slice());
        }
        let keys = resolve_keys(doc, &self.spec)?;
        self.key_scans.set(self.key_scans.get() + 1);
        debug!(table = %self.name, keys = keys.len(), "resolved keys");
        Ok(self.keys.get_or_init(|| keys).as_slice())
    }

    pub fn index(&self) -> Result<ItemIndex<'_>> {
        let keys = self.keys()?;
        Ok(ItemIndex::new(self.data()?, &self.spec, keys))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.index()?.count())
    }

    /// Key membership; resolves keys on first use
    pub fn contains(&self, key: impl Into<Key>) -> Result<bool> {
        Ok(self.index()?.contains_key(&key.into()))
    }

    /// Project every item, in document order. Each call re-queries the
    /// document.
    pub fn iter(&self) -> Result<Iter<'_, V>> {
        let doc = self.data()?;
        let nodes = resolver::item_nodes(doc, self.item_path()?)?;
        Ok(Iter {
            table: self,
            doc,
            nodes: nodes.into_iter(),
        })
    }

    pub fn values(&self) -> Result<Vec<V::Output>> {
        Ok(self.iter()?.collect())
    }

    /// `(key, value)` pairs; keys and values must line up
    pub fn items(&self) -> Result<Vec<(Key, V::Output)>> {
        let keys = self.keys()?;
        let values = self.values()?;
        if keys.len() != values.len() {
            return Err(TableError::Structural(format!(
                "{} keys but {} items",
                keys.len(),
                values.len()
            )));
        }
        Ok(keys.iter().cloned().zip(values).collect())
    }

    /// Indexing by name, composite tuple, position or slice
    pub fn select(&self, query: impl Into<KeyQuery>) -> Result<Selection<V::Output>> {
        let query = query.into();
        trace!(table = %self.name, ?query, "select");
        let index = self.index()?;
        let projected = |item: Option<Item>| item.map(|i| self.project(i));
        Ok(match query {
            KeyQuery::Name(name) => {
                Selection::Single(projected(index.lookup_by_key(&Key::Simple(name))?))
            }
            KeyQuery::Tuple(parts) => {
                Selection::Single(projected(index.lookup_by_key(&Key::Composite(parts))?))
            }
            KeyQuery::Position(i) => Selection::Single(projected(index.lookup_by_position(i)?)),
            KeyQuery::Slice(range) => Selection::Many(
                index
                    .lookup_by_slice(&range)?
                    .into_iter()
                    .map(|item| self.project(item))
                    .collect(),
            ),
        })
    }

    /// Item with `key`, `None` when absent
    pub fn lookup(&self, key: impl Into<Key>) -> Result<Option<V::Output>> {
        Ok(self.select(key.into())?.into_single())
    }

    /// Item at `position`; negative positions count from the end
    pub fn at(&self, position: isize) -> Result<Option<V::Output>> {
        Ok(self.select(position)?.into_single())
    }

    pub fn slice(&self, range: impl Into<SliceRange>) -> Result<Vec<V::Output>> {
        Ok(self.select(range.into())?.into_many())
    }

    // ----------------------------------------------------------------
    // Container tables
    // ----------------------------------------------------------------

    fn container_root(&self) -> Result<Item> {
        let doc = self.data()?;
        if !self.is_container() {
            return Err(TableError::Structural(format!(
                "table '{}' has items, use iter()",
                self.name
            )));
        }
        Ok(Item::new(Arc::clone(doc), resolver::table_root(doc)))
    }

    /// Trimmed text of `path` relative to the container's top element
    pub fn field(&self, path: &str) -> Result<Option<String>> {
        self.container_root()?.text(path)
    }

    /// The container's top element, projected
    pub fn record(&self) -> Result<V::Output> {
        let root = self.container_root()?;
        Ok(self.project(root))
    }

    fn project(&self, item: Item) -> V::Output {
        self.view.project(self, item)
    }

    /// Evaluate an arbitrary path against the document's top element
    pub fn query(&self, path: &str) -> Result<Vec<Item>> {
        let doc = self.data()?;
        Item::new(Arc::clone(doc), resolver::table_root(doc)).select(path)
    }
}

/// Projected items of a table, in document order
pub struct Iter<'t, V: View> {
    table: &'t Table<V>,
    doc: &'t Arc<XmlDocument>,
    nodes: std::vec::IntoIter<crate::dom::NodeId>,
}

impl<V: View> Iterator for Iter<'_, V> {
    type Item = V::Output;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.next()?;
        Some(self.table.project(Item::new(Arc::clone(self.doc), node)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<V: View> ExactSizeIterator for Iter<'_, V> {}

impl<V: View> fmt::Display for Table<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match (self.hostname(), &self.path) {
            (Some(host), _) => host.to_string(),
            (None, Some(path)) => path.display().to_string(),
            (None, None) => "-".to_string(),
        };
        if self.is_empty() {
            return write!(f, "{}:{} - Table empty", self.name, source);
        }
        match self.len() {
            Ok(n) => write!(f, "{}:{}: {} items", self.name, source, n),
            Err(_) if self.is_container() => write!(f, "{}:{}: container", self.name, source),
            Err(e) => write!(f, "{}:{}: {}", self.name, source, e),
        }
    }
}

impl<V: View + fmt::Debug> fmt::Debug for Table<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("view", &self.view)
            .field("attached", &self.doc.is_some())
            .field("cached_keys", &self.keys.get().map(Vec::len))
            .finish()
    }
}
