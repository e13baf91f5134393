//! TOML table definitions
//!
//! Each top-level TOML table is either a table definition (`rpc`, `args`,
//! `item`, `key`, `view`) or a view definition (`fields`):
//!
//! ```toml
//! [PhyPortTable]
//! rpc = "get-interface-information"
//! args = { extensive = true, interface_name = "[efgx][et]-*" }
//! item = "physical-interface"
//! key = "name"
//! view = "PhyPortView"
//!
//! [PhyPortView.fields]
//! oper = "oper-status"
//! admin = "admin-status"
//! ```

use super::session::{Args, Request};
use super::spec::{KeySpec, PathSpec};
use super::view::{FieldView, Raw};
use super::Table;
use crate::error::{Result, TableError};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawKey {
    One(String),
    Many(Vec<String>),
    Other(toml::Value),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    rpc: Option<String>,
    #[serde(default)]
    args: Args,
    item: Option<String>,
    key: Option<RawKey>,
    view: Option<String>,
    fields: Option<IndexMap<String, String>>,
}

/// A parsed table definition
#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: String,
    pub spec: PathSpec,
    pub request: Option<Request>,
    pub view: Option<String>,
}

/// All tables and views of one definitions file
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    tables: IndexMap<String, TableDef>,
    views: IndexMap<String, FieldView>,
}

/// Parse table and view definitions from TOML
pub fn load_definitions(source: &str) -> Result<Definitions> {
    let entries: IndexMap<String, RawEntry> = toml::from_str(source)?;
    let mut defs = Definitions::default();

    for (name, entry) in entries {
        if let Some(fields) = entry.fields {
            defs.views.insert(name.clone(), FieldView::new(name, fields)?);
            continue;
        }

        let invalid = |reason: &str| TableError::InvalidKeySpec {
            table: name.clone(),
            reason: reason.to_string(),
        };
        let key = match entry.key {
            None => KeySpec::default(),
            Some(RawKey::One(path)) => KeySpec::Single(path),
            Some(RawKey::Many(paths)) => KeySpec::Composite(paths),
            Some(RawKey::Other(value)) => {
                return Err(invalid(&format!(
                    "key must be a path or a list of paths, got {}",
                    value.type_str()
                )))
            }
        };
        let spec = match entry.item {
            Some(item) => PathSpec::new(item, key).map_err(|e| match e {
                TableError::InvalidKeySpec { reason, .. } => invalid(&reason),
                other => other,
            })?,
            None => PathSpec::container(),
        };
        let request = entry.rpc.map(|rpc| Request {
            rpc,
            args: entry.args,
        });

        defs.tables.insert(
            name.clone(),
            TableDef {
                name,
                spec,
                request,
                view: entry.view,
            },
        );
    }

    for def in defs.tables.values() {
        if let Some(view) = &def.view {
            if !defs.views.contains_key(view) {
                return Err(TableError::UnknownView(view.clone()));
            }
        }
    }

    debug!(
        tables = defs.tables.len(),
        views = defs.views.len(),
        "loaded table definitions"
    );
    Ok(defs)
}

impl Definitions {
    pub fn table_def(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn view(&self, name: &str) -> Option<&FieldView> {
        self.views.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    fn lookup(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .get(name)
            .ok_or_else(|| TableError::UnknownTable(name.to_string()))
    }

    /// Table projecting through its named view
    pub fn table(&self, name: &str) -> Result<Table<FieldView>> {
        let def = self.lookup(name)?;
        let view_name = def
            .view
            .as_deref()
            .ok_or_else(|| TableError::UnknownView(format!("{} names no view", name)))?;
        let view = self
            .views
            .get(view_name)
            .cloned()
            .ok_or_else(|| TableError::UnknownView(view_name.to_string()))?;
        Ok(def.build(view))
    }

    /// Table returning raw items, ignoring any named view
    pub fn raw_table(&self, name: &str) -> Result<Table<Raw>> {
        Ok(self.lookup(name)?.build(Raw))
    }
}

impl TableDef {
    fn build<V: super::View>(&self, view: V) -> Table<V> {
        let table = Table::with_view(self.name.clone(), self.spec.clone(), view);
        match &self.request {
            Some(request) => table.with_request(request.clone()),
            None => table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::session::ArgValue;

    const DEFS: &str = r#"
[PhyPortTable]
rpc = "get-interface-information"
args = { extensive = true, interface_name = "[efgx][et]-*" }
item = "physical-interface"
key = "name"
view = "PhyPortView"

[LogicalTable]
rpc = "get-interface-information"
item = "logical-interface"
key = ["name", "unit"]

[RouteEngine]
rpc = "get-route-engine-information"

[PhyPortView.fields]
oper = "oper-status"
admin = "admin-status"
"#;

    #[test]
    fn test_load_tables_and_views() {
        let defs = load_definitions(DEFS).unwrap();
        let mut names: Vec<_> = defs.table_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["LogicalTable", "PhyPortTable", "RouteEngine"]);

        let phy = defs.table_def("PhyPortTable").unwrap();
        assert_eq!(phy.spec.item_path(), Some("physical-interface"));
        let request = phy.request.as_ref().unwrap();
        assert_eq!(request.args["extensive"], ArgValue::Flag(true));
        assert_eq!(request.args["interface_name"], ArgValue::from("[efgx][et]-*"));

        let logical = defs.table_def("LogicalTable").unwrap();
        assert_eq!(logical.spec.key().paths(), ["name", "unit"]);

        assert!(defs.table_def("RouteEngine").unwrap().spec.is_container());
        let view = defs.view("PhyPortView").unwrap();
        let mut fields: Vec<_> = view.fields().collect();
        fields.sort_unstable();
        assert_eq!(fields, [("admin", "admin-status"), ("oper", "oper-status")]);
    }

    #[test]
    fn test_build_tables() {
        let defs = load_definitions(DEFS).unwrap();
        let table = defs.table("PhyPortTable").unwrap();
        assert_eq!(table.name(), "PhyPortTable");
        assert!(table.is_empty());
        assert!(defs.raw_table("LogicalTable").is_ok());
        assert!(matches!(defs.table("LogicalTable"), Err(TableError::UnknownView(_))));
        assert!(matches!(defs.raw_table("Nope"), Err(TableError::UnknownTable(_))));
    }

    #[test]
    fn test_default_key_is_name() {
        let defs = load_definitions("[T]\nitem = \"route\"\n").unwrap();
        assert_eq!(defs.table_def("T").unwrap().spec.key(), &KeySpec::default());
    }

    #[test]
    fn test_invalid_key_spec() {
        let err = load_definitions("[T]\nitem = \"route\"\nkey = 5\n").unwrap_err();
        assert!(matches!(err, TableError::InvalidKeySpec { table, .. } if table == "T"));
        let err = load_definitions("[T]\nitem = \"route\"\nkey = []\n").unwrap_err();
        assert!(matches!(err, TableError::InvalidKeySpec { .. }));
    }

    #[test]
    fn test_config_errors() {
        assert!(matches!(load_definitions("[T\n"), Err(TableError::Config(_))));
        assert!(matches!(
            load_definitions("[T]\nitem = \"x\"\nview = \"Missing\"\n"),
            Err(TableError::UnknownView(_))
        ));
    }
}
