use tmorm::prelude::*;
use tmorm::{Dialect, MemoryCache};
use std::sync::Arc;

fn items_session() -> Session {
    let session = Session::connect(SessionConfig::memory()).expect("open sqlite memory db");
    session
        .execute_raw(
            "CREATE TABLE items (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .expect("create items");

    session.start_transaction().expect("begin");
    for i in 1..=20 {
        let status = if i % 4 == 0 { "inactive" } else { "active" };
        session
            .connection()
            .execute(
                "INSERT INTO items (name, status, created_at) VALUES (?, ?, ?)",
                &[
                    Value::from(format!("item-{i}")),
                    Value::from(status),
                    Value::from(format!("2024-01-{i:02} 10:00:00")),
                ],
            )
            .expect("insert item");
    }
    session.confirm_transaction().expect("commit");
    session
}

#[test]
fn rendering_is_deterministic() {
    let mut items = EntityRepository::records("items");
    items
        .set_filter_value("status", "active")
        .add_join_table("tags", "item_id", "id", JoinKind::Left)
        .add_group_by("id", None)
        .add_having("COUNT(*)", "> 1")
        .add_order_by_field("created_at", OrderDirection::Desc)
        .set_limit(5);

    assert_eq!(items.select_sql(false), items.select_sql(false));
    assert_eq!(items.select_sql(true), items.select_sql(true));
    assert!(!items.select_sql(false).contains('\n'));
}

#[test]
fn empty_in_list_matches_nothing() {
    let session = items_session();
    let mut items = session.records("items").unwrap();
    items.set_filter_value_where_in("name", &[], None);

    assert!(items.select_sql(false).contains("IN (NULL)"));
    assert_eq!(
        items
            .count_of_objects_in_collection(session.connection())
            .unwrap(),
        0
    );
}

#[test]
fn count_rendering_drops_order_limit_and_having() {
    let mut items = EntityRepository::records("items");
    items
        .set_filter_value("status", "active")
        .add_group_by("status", None)
        .add_having("COUNT(*)", "> 1")
        .add_order_by_field("created_at", OrderDirection::Desc)
        .set_order_by_random(true)
        .set_limit(10);

    let sql = items.select_sql(true);
    assert!(sql.starts_with("SELECT COUNT(*) FROM `items`"));
    assert!(!sql.contains("ORDER BY"));
    assert!(!sql.contains("LIMIT"));
    assert!(!sql.contains("HAVING"));
    assert!(!sql.contains("WHERE"));
    assert!(sql.contains("GROUP BY"));
}

#[test]
fn unchanged_collection_executes_once() {
    let session = items_session();
    let conn = session.connection();
    let mut items = session.records("items").unwrap();
    items.set_filter_value("status", "active");

    items.as_array_of_objects(conn).unwrap();
    items.as_array_of_objects(conn).unwrap();
    items.pairs(conn, "name", None).unwrap();
    items.ids(conn).unwrap();
    assert_eq!(items.executions(), 1);
}

#[test]
fn cache_hit_returns_same_data_as_execution() {
    let session = items_session();
    let conn = session.connection();
    let backend: Arc<dyn tmorm::CacheBackend> = Arc::new(MemoryCache::new());

    let build = || {
        let mut items = EntityRepository::records("items");
        items.enable_using_cache(Arc::clone(&backend), None);
        items
            .set_filter_value("status", "inactive")
            .add_order_by_field("id", OrderDirection::Asc);
        items
    };

    let mut fresh = build();
    let fresh_rows = fresh.as_array_of_object_data(conn).unwrap().to_vec();
    let fresh_objects = fresh.as_array_of_objects(conn).unwrap().to_vec();
    assert_eq!(fresh.executions(), 1);

    let mut cached = build();
    assert_eq!(cached.as_array_of_object_data(conn).unwrap(), fresh_rows.as_slice());
    assert_eq!(cached.as_array_of_objects(conn).unwrap(), fresh_objects.as_slice());
    assert_eq!(cached.executions(), 0);
    assert_eq!(fresh_objects.len(), 5);
}

#[test]
fn identity_is_split_from_attributes() {
    let session = Session::connect(SessionConfig::memory()).unwrap();
    session
        .execute_raw("CREATE TABLE things (id INTEGER PRIMARY KEY, name TEXT); INSERT INTO things (id, name) VALUES (7, 'x');")
        .unwrap();

    let mut things = session.records("things").unwrap();
    let objects = things.as_array_of_objects(session.connection()).unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].id(), 7);
    assert!(!objects[0].attributes().contains_key("id"));
    assert_eq!(objects[0].get_attribute("name"), Some(Value::from("x")));
}

#[test]
fn active_items_newest_first_page() {
    let session = items_session();
    let mut items = session.records("items").unwrap();
    items
        .set_filter_value("status", "active")
        .add_order_by_field("created_at", OrderDirection::Desc)
        .set_limit(10)
        .set_offset(0);

    let sql = items.select_sql(false);
    assert_eq!(
        sql,
        "SELECT `items`.* FROM `items` WHERE `items`.`status` = 'active' ORDER BY `items`.`created_at` DESC LIMIT 0, 10"
    );

    let objects = items.as_array_of_objects(session.connection()).unwrap();
    assert_eq!(objects.len(), 10);
    assert!(
        objects
            .iter()
            .all(|o| o.get_attribute("status") == Some(Value::from("active")))
    );

    let stamps: Vec<String> = objects
        .iter()
        .map(|o| o.get_attribute("created_at").and_then(|v| v.to_text()).unwrap())
        .collect();
    let mut sorted = stamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(stamps, sorted);
    assert_eq!(stamps[0], "2024-01-19 10:00:00");
}

#[test]
fn count_without_filters_ignores_filters() {
    let session = Session::connect(SessionConfig::memory()).unwrap();
    session
        .execute_raw(
            "CREATE TABLE numbers (id INTEGER PRIMARY KEY, n INTEGER);
             WITH RECURSIVE seq(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM seq WHERE x < 100)
             INSERT INTO numbers (n) SELECT x FROM seq;",
        )
        .unwrap();

    let mut numbers = session.records("numbers").unwrap();
    numbers
        .set_filter_value("n", 5)
        .add_where_field_as_string("`numbers`.`n` > 3")
        .set_limit(2);

    assert_eq!(
        numbers
            .count_of_max_possible_found_objects_without_filters(session.connection())
            .unwrap(),
        100
    );
    assert_eq!(
        numbers
            .count_of_objects_in_collection(session.connection())
            .unwrap(),
        1
    );
}

#[test]
fn pairs_follow_row_order() {
    let session = Session::connect(SessionConfig::memory()).unwrap();
    session
        .execute_raw(
            "CREATE TABLE letters (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO letters (id, name) VALUES (1, 'a'), (2, 'b'), (3, 'c');",
        )
        .unwrap();

    let mut letters = session.records("letters").unwrap();
    letters.add_order_by_field("id", OrderDirection::Asc);
    let pairs = letters.pairs(session.connection(), "name", None).unwrap();
    assert_eq!(
        pairs,
        vec![
            (Value::BigInt(1), Value::from("a")),
            (Value::BigInt(2), Value::from("b")),
            (Value::BigInt(3), Value::from("c")),
        ]
    );
}

#[test]
fn random_order_uses_dialect_function() {
    let session = items_session();
    let mut items = session.records("items").unwrap();
    items
        .add_order_by_field("id", OrderDirection::Asc)
        .set_order_by_random(true);

    assert!(items.select_sql(false).ends_with(&format!(
        "ORDER BY {}",
        Dialect::Sqlite.random_function()
    )));
    assert_eq!(
        items
            .count_of_objects_in_collection(session.connection())
            .unwrap(),
        20
    );
}
