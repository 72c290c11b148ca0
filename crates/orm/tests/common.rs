//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use tessera_orm::{
    Backend, ConnectOptions, Executor, Lifecycle, Row, Session, SessionOptions, SqliteExecutor,
    ValidationErrors, entity,
};

// Common test entities used across multiple test files

entity! {
    table = "authors",
    #[derive(Debug, Default)]
    pub struct Author {
        pub name: String,
        pub age: i32,
        pub active: bool,
    }
    relations {
        has_one profile: Profile => "author_id",
        has_many posts: Post => "author_id",
    }
}

impl Lifecycle for Author {
    fn validate(&self, errors: &mut ValidationErrors) {
        if self.name.is_empty() {
            errors.add("name", "must not be empty");
        }
        if self.age < 0 {
            errors.add("age", "must not be negative");
        }
    }
}

entity! {
    table = "profiles",
    #[derive(Debug, Default)]
    pub struct Profile {
        pub bio: Option<String>,
    }
    relations {
        belongs_to author: Author => "author_id",
    }
}

impl Lifecycle for Profile {}

entity! {
    table = "posts",
    #[derive(Debug, Default)]
    pub struct Post {
        pub title: String,
        pub rating: f64,
    }
    relations {
        belongs_to author: Author => "author_id",
        many_to_many tags: Tag => ("post_tags", "post_id", "tag_id"),
    }
}

impl Lifecycle for Post {}

entity! {
    table = "tags",
    #[derive(Debug, Default)]
    pub struct Tag {
        pub label: String,
    }
    relations {
        many_to_many posts: Post => ("post_tags", "tag_id", "post_id"),
    }
}

impl Lifecycle for Tag {
    fn before_save(&mut self) {
        self.label = self.label.to_lowercase();
    }

    fn after_destroy(&mut self) {
        self.id = 0;
    }
}

entity! {
    table = "messages",
    #[derive(Debug, Default)]
    pub struct Message {
        pub body: String,
        pub sent_on: NaiveDate,
        pub sent_at: DateTime<Utc>,
    }
    relations {
        belongs_to sender: Author => "sender_id",
        belongs_to recipient: Author => "recipient_id",
    }
}

impl Lifecycle for Message {}

const SCHEMA: &str = "
    CREATE TABLE authors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL DEFAULT '',
        age INTEGER NOT NULL DEFAULT 0,
        active BOOLEAN NOT NULL DEFAULT 0
    );
    CREATE TABLE profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bio TEXT,
        author_id INTEGER
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL DEFAULT '',
        rating REAL NOT NULL DEFAULT 0,
        author_id INTEGER
    );
    CREATE TABLE tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE post_tags (
        post_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (post_id, tag_id)
    );
    CREATE TABLE messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        body TEXT NOT NULL DEFAULT '',
        sent_on TEXT NOT NULL DEFAULT '1970-01-01',
        sent_at TEXT NOT NULL DEFAULT '1970-01-01 00:00:00+00:00',
        sender_id INTEGER,
        recipient_id INTEGER
    );
";

/// Executor that records every statement before passing it to `SQLite`.
#[derive(Debug)]
pub struct Recording {
    inner: SqliteExecutor,
    log: Mutex<Vec<String>>,
}

impl Recording {
    /// Statements seen since the last [`Recording::clear`].
    pub fn statements(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Executor for Recording {
    fn query(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        self.log.lock().push(sql.to_string());
        self.inner.query(sql)
    }

    fn execute(&self, sql: &str) -> anyhow::Result<()> {
        self.log.lock().push(sql.to_string());
        self.inner.execute(sql)
    }
}

pub struct Fixture {
    pub session: Session,
    pub log: Arc<Recording>,
}

impl Fixture {
    /// Run `sql` directly, bypassing the session and the log.
    pub fn raw(&self, sql: &str) {
        self.log.inner.execute(sql).unwrap();
    }

    /// Count rows directly.
    pub fn count(&self, table: &str) -> i64 {
        let rows = self.log.inner.query(&format!("SELECT COUNT(*) AS n FROM {table}")).unwrap();
        match rows[0].get("n") {
            Some(tessera_orm::DataType::Int64(Some(n))) => *n,
            other => panic!("unexpected count {other:?}"),
        }
    }
}

/// A fresh in-memory database with the test schema and default options.
pub fn fixture() -> Fixture {
    fixture_with(SessionOptions::default())
}

pub fn fixture_with(options: SessionOptions) -> Fixture {
    init_tracing();

    let inner = SqliteExecutor::connect_with(ConnectOptions {
        database: ":memory:".to_string(),
    })
    .unwrap();
    inner.execute(SCHEMA).unwrap();

    let log = Arc::new(Recording {
        inner,
        log: Mutex::new(Vec::new()),
    });
    let session = Session::builder()
        .executor(Arc::clone(&log) as Arc<dyn Executor>)
        .options(options)
        .build()
        .unwrap();

    Fixture { session, log }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn author(name: &str, age: i32) -> Author {
    Author {
        name: name.to_string(),
        age,
        active: true,
        ..Author::default()
    }
}

pub fn post(title: &str) -> Post {
    Post {
        title: title.to_string(),
        rating: 3.5,
        ..Post::default()
    }
}

pub fn tag(label: &str) -> Tag {
    Tag {
        label: label.to_string(),
        ..Tag::default()
    }
}

/// Drop identifier quotes outside string literals and collapse whitespace, so
/// fragments can be written as `main.authors.name = 'Ann'`.
fn canonical(sql: &str) -> String {
    let mut literal = false;
    let unquoted: String = sql
        .chars()
        .filter(|&ch| {
            if ch == '\'' {
                literal = !literal;
            }
            literal || ch != '"'
        })
        .collect();
    unquoted.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assert that `actual` contains every fragment, in the order given.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let haystack = canonical(actual);
    let mut rest = haystack.as_str();

    for fragment in fragments.iter().map(|fragment| canonical(fragment)) {
        let Some(at) = rest.find(&fragment) else {
            panic!("`{fragment}` not found in order in `{haystack}`");
        };
        rest = &rest[at + fragment.len()..];
    }
}
