use std::collections::BTreeSet;

use tmorm::prelude::*;
use tmorm::{Attributes, MissingIdentityPolicy};

#[derive(Debug, Clone, Default, PartialEq)]
struct Article {
    id: i64,
    title: String,
    published: bool,
    views: i64,
    dirty: BTreeSet<String>,
}

impl Article {
    fn apply(&mut self, field: &str, value: &Value) -> bool {
        match field {
            "title" => self.title = value.to_text().unwrap_or_default(),
            "published" => self.published = value.as_bool().unwrap_or(false),
            "views" => self.views = value.as_i64().unwrap_or(0),
            _ => return false,
        }
        true
    }
}

impl Entity for Article {
    fn table_name(&self) -> &str {
        "cms_articles"
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn get_attribute(&self, field: &str) -> Option<Value> {
        match field {
            "title" => Some(Value::from(self.title.as_str())),
            "published" => Some(Value::Bool(self.published)),
            "views" => Some(Value::BigInt(self.views)),
            _ => None,
        }
    }

    fn set_attribute(&mut self, field: &str, value: Value) {
        if self.apply(field, &value) {
            self.dirty.insert(field.to_string());
        }
    }

    fn load_data(&mut self, data: Attributes, mark_dirty: bool) {
        for (field, value) in data {
            if self.apply(&field, &value) && mark_dirty {
                self.dirty.insert(field);
            }
        }
    }

    fn attributes(&self) -> Attributes {
        ["title", "published", "views"]
            .into_iter()
            .filter_map(|field| Some((field.to_string(), self.get_attribute(field)?)))
            .collect()
    }

    fn dirty_fields(&self) -> Vec<String> {
        self.dirty.iter().cloned().collect()
    }

    fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}

fn session_with(config: SessionConfig) -> Session {
    let session = Session::connect(config).expect("open sqlite memory db");
    session
        .execute_raw(
            "CREATE TABLE cms_articles (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                published INTEGER NOT NULL DEFAULT 0,
                views INTEGER NOT NULL DEFAULT 0,
                kind TEXT NOT NULL DEFAULT 'news' CHECK (kind IN ('news', 'press_release', 'blog-post'))
            );
            CREATE TABLE m_comments (id INTEGER PRIMARY KEY, article_id INTEGER, body TEXT);
            INSERT INTO cms_articles (title, published, views) VALUES
                ('First', 1, 10),
                ('Second', 0, 5),
                ('Third', 0, 7);
            INSERT INTO m_comments (article_id, body) VALUES (1, 'nice'), (3, 'meh');",
        )
        .expect("create schema");
    session
}

fn session() -> Session {
    session_with(SessionConfig::memory())
}

fn published_flags(session: &Session) -> Vec<i64> {
    session
        .connection()
        .query("SELECT published FROM cms_articles ORDER BY id", &[])
        .unwrap()
        .iter()
        .map(|row| row.get_named::<i64>("published").unwrap())
        .collect()
}

#[test]
fn typed_repository_takes_table_from_entity() {
    let session = session();
    let mut articles = session.repository(Article::default).unwrap();
    articles.add_order_by_field("id", OrderDirection::Asc);

    let objects = articles.as_array_of_objects(session.connection()).unwrap();
    assert_eq!(objects.len(), 3);
    assert_eq!(objects[0].title, "First");
    assert!(objects[0].published);
    assert_eq!(objects[2].views, 7);
    assert!(objects.iter().all(|a| a.dirty.is_empty()));
}

#[test]
fn new_entity_insert_and_update() {
    let session = session();
    let conn = session.connection();

    let mut article = Article::default();
    article.set_attribute("title", Value::from("Fourth"));
    assert!(article.is_new());
    assert!(article.save(conn).unwrap());
    assert_eq!(article.id(), 4);

    assert!(!article.save(conn).unwrap());
    article.set_attribute("views", Value::BigInt(99));
    assert!(article.save(conn).unwrap());

    let articles = session.repository(Article::default).unwrap();
    let stored = articles.find_one_by_id(conn, 4).unwrap().unwrap();
    assert_eq!(stored.title, "Fourth");
    assert_eq!(stored.views, 99);
}

#[test]
fn flip_bool_value_on_filtered_collection() {
    let session = session();
    let mut drafts = session.repository(Article::default).unwrap();
    drafts.set_filter_value("published", 0);
    drafts
        .flip_bool_value(session.connection(), "published")
        .unwrap();

    assert_eq!(published_flags(&session), vec![1, 1, 1]);
}

#[test]
fn cancelled_transaction_discards_collection_changes() {
    let session = session();
    let conn = session.connection();

    session.start_transaction().unwrap();
    let mut all = session.repository(Article::default).unwrap();
    let mut objects = all.as_array_of_objects(conn).unwrap().to_vec();
    for article in &mut objects {
        article.set_attribute("published", Value::Bool(false));
    }
    all.set_collected_objects(objects);
    assert_eq!(all.save(conn).unwrap(), 3);
    assert_eq!(published_flags(&session), vec![0, 0, 0]);

    session.cancel_transaction().unwrap();
    assert!(!session.is_transaction_active());
    assert_eq!(published_flags(&session), vec![1, 0, 0]);
}

#[test]
fn confirmed_transaction_keeps_deletes() {
    let session = session();
    let conn = session.connection();

    session.start_transaction().unwrap();
    let mut drafts = session.repository(Article::default).unwrap();
    drafts.set_filter_value("published", 0);
    assert_eq!(drafts.delete_object_collection(conn).unwrap(), 2);
    assert!(session.confirm_transaction().unwrap());

    let mut remaining = session.repository(Article::default).unwrap();
    assert_eq!(remaining.ids(conn).unwrap(), vec![1]);
}

#[test]
fn lazy_mode_and_streaming() {
    let session = session_with(
        SessionConfig::memory()
            .repository(RepositoryConfig::new().execution_mode(ExecutionMode::Lazy)),
    );
    let conn = session.connection();

    let mut articles = session.repository(Article::default).unwrap();
    assert_eq!(articles.config().effective_mode(), ExecutionMode::Lazy);
    articles.add_order_by_field("views", OrderDirection::Desc);

    let titles: Vec<String> = articles
        .stream_objects(conn)
        .unwrap()
        .map(|article| article.unwrap().title)
        .collect();
    assert_eq!(titles, vec!["First", "Third", "Second"]);
    assert_eq!(articles.executions(), 0);

    let last = articles.last_object(conn).unwrap().unwrap();
    assert_eq!(last.title, "Second");
    assert_eq!(articles.executions(), 1);
}

#[test]
fn stream_stops_on_missing_identity() {
    let session = session();
    let mut articles = session
        .repository(Article::default)
        .unwrap()
        .with_config(RepositoryConfig::new().missing_identity(MissingIdentityPolicy::HardError));
    articles.add_simple_select_fields(&["title"], None);

    let mut stream = articles.stream_objects(session.connection()).unwrap();
    assert!(matches!(stream.next(), Some(Err(Error::Materialization(_)))));
}

#[test]
fn schema_introspection_through_session() {
    let mut session = session();

    assert_eq!(
        session.table_names().unwrap(),
        vec!["cms_articles".to_string(), "m_comments".to_string()]
    );
    assert_eq!(session.resolve_table_name("article").unwrap(), "cms_articles");
    assert_eq!(session.resolve_table_name("comment").unwrap(), "m_comments");

    let articles = session.repository(Article::default).unwrap();
    let fields = articles
        .table_fields(session.connection(), &mut tmorm::MetadataCache::new())
        .unwrap();
    assert_eq!(fields, session.table_fields("cms_articles").unwrap());
    assert_eq!(fields, vec!["id", "title", "published", "views", "kind"]);

    let sql = session.create_table_sql("cms_articles").unwrap();
    assert!(!sql.contains('\n'));
    assert_eq!(
        session.enum_pairs("cms_articles", "kind").unwrap(),
        vec![
            ("news".to_string(), "News".to_string()),
            ("press_release".to_string(), "Press Release".to_string()),
            ("blog-post".to_string(), "Blog Post".to_string()),
        ]
    );

    let columns = session.columns("m_comments").unwrap();
    assert!(columns[0].primary_key);
    assert!(session.columns("missing").is_err());
}

#[test]
fn merge_with_comment_collection() {
    let session = session();
    let comments = session.records("m_comments").unwrap();
    let mut articles = session.repository(Article::default).unwrap();
    articles
        .merge_with_collection(&comments, "id", "article_id", JoinKind::Inner)
        .add_simple_select_fields(&["id", "title", "published", "views"], None)
        .add_order_by_field("id", OrderDirection::Asc);

    let pairs = articles
        .pairs(session.connection(), "title", None)
        .unwrap();
    assert_eq!(
        pairs,
        vec![
            (Value::BigInt(1), Value::from("First")),
            (Value::BigInt(3), Value::from("Third")),
        ]
    );
}

#[test]
fn export_and_empty_collection_error() {
    let session = session();
    let conn = session.connection();

    let mut published = session.repository(Article::default).unwrap();
    published.set_filter_value("published", 1);
    let json: serde_json::Value =
        serde_json::from_str(&published.export_as_serialized_data(conn).unwrap()).unwrap();
    assert_eq!(json["table"], "cms_articles");
    assert_eq!(json["objects"].as_array().unwrap().len(), 1);
    assert_eq!(json["objects"][0]["attributes"]["title"]["Text"], "First");

    let mut none = session.repository(Article::default).unwrap();
    none.set_ids(&[]);
    match none.export_as_serialized_data(conn) {
        Err(Error::EmptyCollection(err)) => assert_eq!(err.table, "cms_articles"),
        other => panic!("expected empty collection error, got {:?}", other),
    }
}

#[test]
fn sums_counts_and_totals() {
    let session = session();
    let conn = session.connection();

    let mut articles = session.repository(Article::default).unwrap();
    assert_eq!(articles.sum_of_one_field(conn, "views").unwrap(), Value::BigInt(22));

    articles
        .add_order_by_field("id", OrderDirection::Asc)
        .set_limit(2);
    articles.set_require_count_rows_without_limits(true);
    assert!(articles.has_exact_count_of_objects(conn, 2).unwrap());
    assert_eq!(articles.total_selected_rows_without_limit(), Some(3));
    assert!(articles.has_any_object_in_collection(conn).unwrap());

    let first = articles.first_object(conn).unwrap().unwrap();
    assert_eq!(first.title, "First");
    assert_eq!(articles.limit(), 2);
}
