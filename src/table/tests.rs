use super::*;
use indexmap::IndexMap;
use std::sync::Mutex;

const INTERFACES: &[u8] = b"<interface-information>\
    <physical-interface><name>ge-0/0/0</name><oper-status>up</oper-status>\
      <logical-interface><name>ge-0/0/0.0</name></logical-interface>\
      <logical-interface><name>ge-0/0/0.1</name></logical-interface>\
    </physical-interface>\
    <physical-interface><name>\n ge-0/0/1 \n</name><oper-status>down</oper-status>\
      <admin-status>up</admin-status></physical-interface>\
    <physical-interface><name>ge-0/0/2</name><oper-status>up</oper-status></physical-interface>\
    </interface-information>";

const UNITS: &[u8] = b"<interface-information>\
    <logical-interface><name>ge-0/0/0</name><unit>0</unit></logical-interface>\
    <logical-interface><name>ge-0/0/0</name><unit>1</unit></logical-interface>\
    </interface-information>";

fn phy_table() -> Table {
    let spec = PathSpec::new("physical-interface", "name").unwrap();
    Table::new("PhyPortTable", spec).with_document(XmlDocument::parse(INTERFACES))
}

fn unit_table() -> Table {
    let spec = PathSpec::new("logical-interface", vec!["name", "unit"]).unwrap();
    Table::new("LogicalTable", spec).with_document(XmlDocument::parse(UNITS))
}

fn port_view() -> FieldView {
    let fields = IndexMap::from([
        ("oper".to_string(), "oper-status".to_string()),
        ("admin".to_string(), "admin-status".to_string()),
    ]);
    FieldView::new("PhyPortView", fields).unwrap()
}

struct StubSession {
    host: String,
    reply: Vec<u8>,
    seen: Mutex<Vec<Request>>,
}

impl StubSession {
    fn new(host: &str, reply: &[u8]) -> Arc<Self> {
        Arc::new(StubSession {
            host: host.to_string(),
            reply: reply.to_vec(),
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl Session for StubSession {
    fn hostname(&self) -> &str {
        &self.host
    }

    fn execute(&self, request: &Request) -> std::result::Result<Vec<u8>, SessionError> {
        self.seen.lock().unwrap().push(request.clone());
        if self.reply.is_empty() {
            return Err("connection closed".into());
        }
        Ok(self.reply.clone())
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_interface_scenario() {
    let table = phy_table();
    assert_eq!(
        table.keys().unwrap(),
        [Key::from("ge-0/0/0"), Key::from("ge-0/0/1"), Key::from("ge-0/0/2")]
    );

    let by_key = table.lookup("ge-0/0/1").unwrap().unwrap();
    assert_eq!(by_key.text("oper-status").unwrap().as_deref(), Some("down"));
    assert_eq!(table.at(1).unwrap(), Some(by_key));
    assert!(!table.contains("ge-0/0/9").unwrap());
    assert!(table.contains("ge-0/0/2").unwrap());
    assert_eq!(table.lookup("ge-0/0/9").unwrap(), None);
}

#[test]
fn test_composite_scenario() {
    let table = unit_table();
    assert_eq!(
        table.keys().unwrap(),
        [Key::from(("ge-0/0/0", "0")), Key::from(("ge-0/0/0", "1"))]
    );

    let second = table.lookup(("ge-0/0/0", "1")).unwrap().unwrap();
    assert_eq!(second.text("unit").unwrap().as_deref(), Some("1"));
    assert_eq!(table.at(1).unwrap(), Some(second));
    assert_eq!(table.lookup(("ge-0/0/0", "7")).unwrap(), None);
}

#[test]
fn test_empty_table_scenario() {
    let table = Table::new("PhyPortTable", PathSpec::new("physical-interface", "name").unwrap());
    assert!(table.is_empty());
    assert!(matches!(table.len(), Err(TableError::EmptyTable)));
    assert!(matches!(table.keys(), Err(TableError::EmptyTable)));
    assert!(matches!(table.values(), Err(TableError::EmptyTable)));
    assert!(matches!(table.lookup("ge-0/0/0"), Err(TableError::EmptyTable)));
    assert!(matches!(table.contains("ge-0/0/0"), Err(TableError::EmptyTable)));
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_len_matches_keys() {
    for table in [phy_table(), unit_table()] {
        assert_eq!(table.len().unwrap(), table.keys().unwrap().len());
    }
}

#[test]
fn test_items_keys_match_keys() {
    let table = phy_table();
    let items = table.items().unwrap();
    let item_keys: Vec<Key> = items.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(item_keys, table.keys().unwrap());
    assert_eq!(items[2].1.text("name").unwrap().as_deref(), Some("ge-0/0/2"));
}

#[test]
fn test_position_equals_key_lookup() {
    for table in [phy_table(), unit_table()] {
        let keys = table.keys().unwrap().to_vec();
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(table.at(i as isize).unwrap(), table.lookup(key).unwrap());
            assert!(table.at(i as isize).unwrap().is_some());
        }
    }
}

#[test]
fn test_negative_positions() {
    let table = phy_table();
    let len = table.len().unwrap() as isize;
    let last = table.keys().unwrap().last().cloned().unwrap();
    assert_eq!(table.at(-1).unwrap(), table.lookup(last).unwrap());
    assert_eq!(table.at(-len).unwrap(), table.at(0).unwrap());
    assert!(matches!(
        table.at(-(len + 1)),
        Err(TableError::Index { index: -4, len: 3 })
    ));
    assert!(matches!(table.at(len), Err(TableError::Index { .. })));
}

#[test]
fn test_slice_equals_key_lookups() {
    let table = phy_table();
    let keys = table.keys().unwrap().to_vec();

    let expected: Vec<Item> = keys[0..2]
        .iter()
        .filter_map(|k| table.lookup(k).unwrap())
        .collect();
    assert_eq!(table.slice(0isize..2).unwrap(), expected);

    let reversed: Vec<Item> = keys
        .iter()
        .rev()
        .filter_map(|k| table.lookup(k).unwrap())
        .collect();
    assert_eq!(table.slice(SliceRange::default().with_step(-1)).unwrap(), reversed);
    assert!(table.slice(5isize..).unwrap().is_empty());
    assert_eq!(table.slice(..=isize::MAX).unwrap().len(), 3);
    assert_eq!(table.slice(SliceRange::new(Some(1), None, isize::MAX)).unwrap().len(), 1);
    assert!(matches!(
        table.slice(SliceRange::default().with_step(0)),
        Err(TableError::SliceStep)
    ));
}

#[test]
fn test_identity_projection_matches_raw_items() {
    let table = phy_table();
    let doc = table.document().unwrap();
    let raw: Vec<Item> = resolver::item_nodes(doc, "physical-interface")
        .unwrap()
        .into_iter()
        .map(|node| Item::new(Arc::clone(doc), node))
        .collect();
    assert_eq!(table.values().unwrap(), raw);
    assert_eq!(table.iter().unwrap().len(), 3);
}

#[test]
fn test_iteration_is_restartable() {
    let table = phy_table();
    let first: Vec<Item> = table.iter().unwrap().collect();
    let second: Vec<Item> = table.iter().unwrap().collect();
    assert_eq!(first, second);
}

#[test]
fn test_keys_are_cached() {
    let table = phy_table();
    assert_eq!(table.key_scans(), 0);
    let first = table.keys().unwrap();
    let second = table.keys().unwrap();
    assert!(std::ptr::eq(first, second));
    table.len().unwrap();
    table.lookup("ge-0/0/1").unwrap();
    assert_eq!(table.key_scans(), 1);
}

#[test]
fn test_contains_populates_cache() {
    let table = phy_table();
    assert!(table.contains("ge-0/0/0").unwrap());
    assert_eq!(table.key_scans(), 1);
}

#[test]
fn test_attach_resets_cache() {
    let mut table = phy_table();
    table.keys().unwrap();
    table.attach(XmlDocument::parse(UNITS));
    assert!(table.keys().unwrap().is_empty());
    assert_eq!(table.key_scans(), 2);
}

#[test]
fn test_duplicate_keys_first_match_wins() {
    let spec = PathSpec::new("logical-interface", "name").unwrap();
    let table = Table::new("Dup", spec).with_document(XmlDocument::parse(UNITS));

    assert_eq!(table.keys().unwrap(), [Key::from("ge-0/0/0"), Key::from("ge-0/0/0")]);
    assert_eq!(table.len().unwrap(), 2);
    let found = table.lookup("ge-0/0/0").unwrap().unwrap();
    assert_eq!(found.text("unit").unwrap().as_deref(), Some("0"));
    // Both positions resolve through the same key
    assert_eq!(table.at(1).unwrap(), Some(found));
}

#[test]
fn test_missing_simple_key_fails() {
    let doc = XmlDocument::parse(
        b"<r><item><name>a</name></item><item><other>b</other></item></r>",
    );
    let table = Table::new("T", PathSpec::new("item", "name").unwrap()).with_document(doc);
    assert!(matches!(
        table.keys(),
        Err(TableError::MissingKey { index: 1, .. })
    ));
}

#[test]
fn test_key_shape_mismatch_is_a_miss() {
    assert_eq!(phy_table().lookup(("ge-0/0/0", "0")).unwrap(), None);
    assert_eq!(unit_table().lookup("ge-0/0/0").unwrap(), None);
    assert_eq!(unit_table().lookup(vec!["ge-0/0/0"]).unwrap(), None);
}

#[test]
fn test_select_dispatch() {
    let table = phy_table();
    assert!(matches!(table.select("ge-0/0/2").unwrap(), Selection::Single(Some(_))));
    assert!(matches!(table.select(-1isize).unwrap(), Selection::Single(Some(_))));
    assert!(matches!(table.select(("a", "b")).unwrap(), Selection::Single(None)));
    match table.select(SliceRange::new(Some(1), None, 1)).unwrap() {
        Selection::Many(items) => assert_eq!(items.len(), 2),
        other => panic!("expected many, got {:?}", other),
    }
}

#[test]
fn test_large_table_keeps_document_order() {
    let mut xml = String::from("<rib>");
    for i in 0..(resolver::PARALLEL_THRESHOLD + 100) {
        xml.push_str(&format!("<rt><prefix>10.0.{}.{}/32</prefix></rt>", i / 256, i % 256));
    }
    xml.push_str("</rib>");
    let table = Table::new("Routes", PathSpec::new("rt", "prefix").unwrap())
        .with_document(XmlDocument::parse(xml.as_bytes()));

    let keys = table.keys().unwrap();
    assert_eq!(keys.len(), resolver::PARALLEL_THRESHOLD + 100);
    assert_eq!(keys[0], Key::from("10.0.0.0/32"));
    assert_eq!(keys[1100], Key::from("10.0.4.76/32"));
}

// ============================================================================
// Navigation and containers
// ============================================================================

#[test]
fn test_ancestor_and_sibling_navigation() {
    let spec = PathSpec::new("physical-interface/logical-interface", "name").unwrap();
    let table = Table::new("LogicalTable", spec).with_document(XmlDocument::parse(INTERFACES));

    let unit = table.lookup("ge-0/0/0.1").unwrap().unwrap();
    assert_eq!(
        unit.text("ancestor::physical-interface/name").unwrap().as_deref(),
        Some("ge-0/0/0")
    );
    assert_eq!(
        unit.text("preceding-sibling::logical-interface[1]/name").unwrap().as_deref(),
        Some("ge-0/0/0.0")
    );
    assert_eq!(unit.parent().unwrap().name(), Some("physical-interface"));

    let downs = table.query("physical-interface[oper-status='down']").unwrap();
    assert_eq!(downs.len(), 1);
    assert_eq!(
        downs[0].text("following-sibling::*[1]/name").unwrap().as_deref(),
        Some("ge-0/0/2")
    );
}

#[test]
fn test_container_table() {
    let doc = XmlDocument::parse(
        b"<route-engine-information><route-engine>\
          <slot>0</slot><mastership-state>master</mastership-state><cpu-idle>97</cpu-idle>\
          </route-engine></route-engine-information>",
    );
    let fields = IndexMap::from([
        ("slot".to_string(), "route-engine/slot".to_string()),
        ("state".to_string(), "route-engine/mastership-state".to_string()),
    ]);
    let view = FieldView::new("EngineView", fields).unwrap();
    let table = Table::with_view("RouteEngine", PathSpec::container(), view).with_document(doc);

    assert!(table.is_container());
    assert_eq!(table.field("route-engine/cpu-idle").unwrap().as_deref(), Some("97"));
    let record = table.record().unwrap();
    assert_eq!(record.get("state"), Some("master"));
    assert_eq!(record.get("slot"), Some("0"));

    assert!(matches!(table.keys(), Err(TableError::ContainerTable(_))));
    assert!(matches!(table.iter(), Err(TableError::ContainerTable(_))));
    assert!(matches!(phy_table().field("name"), Err(TableError::Structural(_))));
}

// ============================================================================
// Views
// ============================================================================

#[test]
fn test_field_view_records() {
    let table = Table::with_view(
        "PhyPortTable",
        PathSpec::new("physical-interface", "name").unwrap(),
        port_view(),
    )
    .with_document(XmlDocument::parse(INTERFACES));

    let record = table.lookup("ge-0/0/1").unwrap().unwrap();
    assert_eq!(record.get("oper"), Some("down"));
    assert_eq!(record.get("admin"), Some("up"));
    assert_eq!(record.iter().map(|(k, _)| k).collect::<Vec<_>>(), ["oper", "admin"]);

    let values = table.values().unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0].get("admin"), None);
    assert_eq!(values[0].get("no-such-field"), None);
    assert_eq!(values[2].item().text("name").unwrap().as_deref(), Some("ge-0/0/2"));

    let items = table.items().unwrap();
    assert_eq!(items[1].0, Key::from("ge-0/0/1"));
    assert_eq!(items[1].1, record);
}

struct HostTagged;

impl View for HostTagged {
    type Output = (String, Option<String>);

    fn project(&self, table: &Table<Self>, item: Item) -> Self::Output {
        let host = table.hostname().unwrap_or("-").to_string();
        (host, item.text("name").ok().flatten())
    }
}

#[test]
fn test_view_reads_owning_table() {
    let session = StubSession::new("router1", INTERFACES);
    let mut table = Table::with_view(
        "PhyPortTable",
        PathSpec::new("physical-interface", "name").unwrap(),
        HostTagged,
    )
    .with_session(session)
    .with_request(Request::new("get-interface-information"));
    table.get().unwrap();

    let tagged = table.at(0).unwrap().unwrap();
    assert_eq!(tagged, ("router1".to_string(), Some("ge-0/0/0".to_string())));
}

// ============================================================================
// Acquisition
// ============================================================================

#[test]
fn test_get_from_session() {
    let session = StubSession::new("router1", INTERFACES);
    let request = Request::new("get-interface-information")
        .arg("extensive", true)
        .arg("interface_name", "[efgx][et]-*");
    let mut table = Table::new("PhyPortTable", PathSpec::new("physical-interface", "name").unwrap())
        .with_session(session.clone())
        .with_request(request);
    assert_eq!(table.hostname(), Some("router1"));

    let mut args = Args::new();
    args.insert("interface_name".to_string(), "ge-0/0/1".into());
    table.get_with(&args).unwrap();

    assert!(!table.is_empty());
    assert_eq!(table.len().unwrap(), 3);
    let seen = session.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].args["interface_name"], ArgValue::from("ge-0/0/1"));
    assert_eq!(seen[0].args["extensive"], ArgValue::Flag(true));
}

#[test]
fn test_get_resets_key_cache() {
    let session = StubSession::new("router1", INTERFACES);
    let mut table = Table::new("PhyPortTable", PathSpec::new("physical-interface", "name").unwrap())
        .with_session(session)
        .with_request(Request::new("get-interface-information"));
    table.get().unwrap();
    table.keys().unwrap();
    table.get().unwrap();
    table.keys().unwrap();
    assert_eq!(table.key_scans(), 2);
}

#[test]
fn test_get_errors() {
    let spec = PathSpec::new("physical-interface", "name").unwrap();

    let mut table = Table::new("T", spec.clone())
        .with_session(StubSession::new("router1", b"<reply><a></reply>"))
        .with_request(Request::new("rpc"));
    assert!(matches!(table.get(), Err(TableError::Parse(_))));
    assert!(table.is_empty());

    let mut table = Table::new("T", spec.clone())
        .with_session(StubSession::new("router2", b""))
        .with_request(Request::new("rpc"));
    match table.get() {
        Err(TableError::Session { hostname, source }) => {
            assert_eq!(hostname, "router2");
            assert_eq!(source.to_string(), "connection closed");
        }
        other => panic!("expected session error, got {:?}", other.err()),
    }

    let mut table = Table::new("T", spec);
    assert!(matches!(table.get(), Err(TableError::NoSource(_))));
}

#[test]
fn test_get_from_file() {
    let path = std::env::temp_dir().join(format!("rustytable-{}-phy.xml", std::process::id()));
    let bad = std::env::temp_dir().join(format!("rustytable-{}-phy-bad.xml", std::process::id()));
    std::fs::write(&path, INTERFACES).unwrap();

    std::fs::write(&bad, b"<interface-information><a></interface-information>").unwrap();
    let mut broken = Table::new("T", PathSpec::new("physical-interface", "name").unwrap())
        .with_path(&bad);
    assert!(matches!(broken.get(), Err(TableError::Parse(_))));
    assert!(broken.is_empty());
    std::fs::remove_file(&bad).unwrap();

    let mut table = Table::new("PhyPortTable", PathSpec::new("physical-interface", "name").unwrap())
        .with_path(&path);
    table.get().unwrap();
    assert_eq!(table.keys().unwrap()[1], Key::from("ge-0/0/1"));
    assert_eq!(
        table.to_string(),
        format!("PhyPortTable:{}: 3 items", path.display())
    );

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(table.get(), Err(TableError::Io(_))));
}

#[test]
fn test_display() {
    let spec = PathSpec::new("physical-interface", "name").unwrap();
    let table = Table::new("PhyPortTable", spec.clone());
    assert_eq!(table.to_string(), "PhyPortTable:- - Table empty");
    assert_eq!(phy_table().to_string(), "PhyPortTable:-: 3 items");

    let table = Table::new("PhyPortTable", spec)
        .with_session(StubSession::new("router1", INTERFACES))
        .with_document(XmlDocument::parse(INTERFACES));
    assert_eq!(table.to_string(), "PhyPortTable:router1: 3 items");
}

#[test]
fn test_definitions_drive_tables() {
    let defs = load_definitions(
        r#"
[PhyPortTable]
rpc = "get-interface-information"
item = "physical-interface"
view = "PhyPortView"

[PhyPortView.fields]
oper = "oper-status"
"#,
    )
    .unwrap();

    let mut table = defs
        .table("PhyPortTable")
        .unwrap()
        .with_session(StubSession::new("router1", INTERFACES));
    table.get().unwrap();
    let record = table.lookup("ge-0/0/2").unwrap().unwrap();
    assert_eq!(record.get("oper"), Some("up"));
}
