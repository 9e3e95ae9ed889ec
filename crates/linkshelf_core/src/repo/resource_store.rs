//! Resource store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the document-style operations the handlers need: filtered find
//!   with sort/skip/limit, single-field set, vote push, delete, count.
//! - Keep SQL details and blocking I/O inside the persistence boundary.
//!
//! # Invariants
//! - Find results are ordered by `created_at DESC`, newest insert first on ties.
//! - Mutations report how many resources they touched; zero is not an error.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{register_regexp_function, DbError};
use crate::model::resource::{Resource, ResourceId, ResourceMeta, VoteKind};
use crate::search::pattern::SearchPattern;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const RESOURCE_SELECT_SQL: &str = "SELECT
    uuid,
    link,
    author,
    title,
    description,
    image,
    created_at
FROM resources";

/// Resource ids bound per vote lookup; stays well under SQLite's
/// host-parameter limit.
const VOTE_LOOKUP_CHUNK: usize = 256;

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "resources",
        &[
            "uuid",
            "link",
            "author",
            "title",
            "description",
            "image",
            "created_at",
        ],
    ),
    ("resource_votes", &["id", "resource_uuid", "kind", "user_id"]),
];

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-layer error.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A previous holder of the connection lock panicked.
    Poisoned,
    /// The blocking task running the query was cancelled or panicked.
    Task(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted resource data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection is not migrated: expected schema version {expected_version}, found {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
            Self::Poisoned => write!(f, "resource store connection lock is poisoned"),
            Self::Task(message) => write!(f, "resource store task failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter and window for [`ResourceStore::find`].
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    /// Matches when the pattern occurs in `link`, `meta.title` or
    /// `meta.description`. `None` matches everything.
    pub pattern: Option<SearchPattern>,
    pub skip: u64,
    /// `None` returns every row after `skip`.
    pub limit: Option<u64>,
}

impl ResourceQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(pattern: SearchPattern) -> Self {
        Self {
            pattern: Some(pattern),
            ..Self::default()
        }
    }

    pub fn window(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Document-store operations over the resource collection.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Persists a new resource including any votes it already carries.
    async fn insert(&self, resource: &Resource) -> StoreResult<()>;
    /// Returns matching resources, newest first.
    async fn find(&self, query: &ResourceQuery) -> StoreResult<Vec<Resource>>;
    /// Replaces `link` on the resource currently addressed by `old_link`.
    async fn set_link(&self, old_link: &str, new_link: &str) -> StoreResult<u64>;
    /// Replaces `author` on the resource addressed by `link`.
    async fn set_author(&self, link: &str, author: &str) -> StoreResult<u64>;
    /// Appends `user_id` to the vote list selected by `kind`.
    async fn push_vote(&self, link: &str, kind: VoteKind, user_id: &str) -> StoreResult<u64>;
    /// Removes the resource addressed by `link` together with its votes.
    async fn delete(&self, link: &str) -> StoreResult<u64>;
    async fn count(&self) -> StoreResult<u64>;
}

/// SQLite-backed resource store.
///
/// The connection sits behind a mutex and every call runs on tokio's
/// blocking pool, so awaiting a store call never stalls the async executor.
#[derive(Clone)]
pub struct SqliteResourceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteResourceStore {
    /// Wraps a migrated connection.
    ///
    /// Connections from [`crate::db::open_db`] are ready as is. Raw
    /// connections migrated through [`crate::db::migrations::apply_migrations`]
    /// are accepted too: foreign keys and `regexp()` are per-connection state,
    /// so both are (re)applied here. Rejects connections that are not fully
    /// migrated or lack the resource tables.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_connection_ready(&conn)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        register_regexp_function(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            op(&mut *guard)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl ResourceStore for SqliteResourceStore {
    async fn insert(&self, resource: &Resource) -> StoreResult<()> {
        let resource = resource.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO resources (
                    uuid,
                    link,
                    author,
                    title,
                    description,
                    image,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    resource.id.to_string(),
                    resource.link,
                    resource.author,
                    resource.meta.title,
                    resource.meta.description,
                    resource.meta.image,
                    resource.created_at,
                ],
            )?;

            let uuid = resource.id.to_string();
            for (kind, voters) in [
                (VoteKind::Up, &resource.upvotes),
                (VoteKind::Down, &resource.downvotes),
            ] {
                for user_id in voters {
                    tx.execute(
                        "INSERT INTO resource_votes (resource_uuid, kind, user_id)
                         VALUES (?1, ?2, ?3);",
                        params![uuid, kind.as_str(), user_id],
                    )?;
                }
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn find(&self, query: &ResourceQuery) -> StoreResult<Vec<Resource>> {
        let query = query.clone();
        self.run(move |conn| find_resources(conn, &query)).await
    }

    async fn set_link(&self, old_link: &str, new_link: &str) -> StoreResult<u64> {
        let old_link = old_link.to_string();
        let new_link = new_link.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE resources SET link = ?2 WHERE link = ?1;",
                params![old_link, new_link],
            )?;
            Ok(changed as u64)
        })
        .await
    }

    async fn set_author(&self, link: &str, author: &str) -> StoreResult<u64> {
        let link = link.to_string();
        let author = author.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE resources SET author = ?2 WHERE link = ?1;",
                params![link, author],
            )?;
            Ok(changed as u64)
        })
        .await
    }

    async fn push_vote(&self, link: &str, kind: VoteKind, user_id: &str) -> StoreResult<u64> {
        let link = link.to_string();
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT INTO resource_votes (resource_uuid, kind, user_id)
                 SELECT uuid, ?2, ?3
                 FROM resources
                 WHERE link = ?1;",
                params![link, kind.as_str(), user_id],
            )?;
            Ok(changed as u64)
        })
        .await
    }

    async fn delete(&self, link: &str) -> StoreResult<u64> {
        let link = link.to_string();
        self.run(move |conn| {
            let changed = conn.execute("DELETE FROM resources WHERE link = ?1;", [link])?;
            Ok(changed as u64)
        })
        .await
    }

    async fn count(&self) -> StoreResult<u64> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM resources;", [], |row| {
                row.get(0)
            })?;
            u64::try_from(count)
                .map_err(|_| StoreError::InvalidData(format!("negative row count `{count}`")))
        })
        .await
    }
}

fn find_resources(conn: &Connection, query: &ResourceQuery) -> StoreResult<Vec<Resource>> {
    let mut sql = format!("{RESOURCE_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(pattern) = query.pattern.as_ref() {
        sql.push_str(
            " AND (link REGEXP ?1
                OR title REGEXP ?1
                OR description REGEXP ?1)",
        );
        bind_values.push(Value::Text(pattern.as_str().to_string()));
    }

    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    match query.limit {
        Some(limit) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            bind_values.push(Value::Integer(to_sql_integer(limit)));
            bind_values.push(Value::Integer(to_sql_integer(query.skip)));
        }
        None if query.skip > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(to_sql_integer(query.skip)));
        }
        None => {}
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut resources = Vec::new();
    while let Some(row) = rows.next()? {
        resources.push(parse_resource_row(row)?);
    }

    attach_votes(conn, &mut resources)?;
    Ok(resources)
}

fn parse_resource_row(row: &Row<'_>) -> StoreResult<Resource> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Resource {
        id: parse_uuid(&uuid_text)?,
        link: row.get("link")?,
        author: row.get("author")?,
        meta: ResourceMeta {
            title: row.get("title")?,
            description: row.get("description")?,
            image: row.get("image")?,
        },
        upvotes: Vec::new(),
        downvotes: Vec::new(),
        created_at: row.get("created_at")?,
    })
}

/// Fills vote lists with one query per [`VOTE_LOOKUP_CHUNK`] resources.
fn attach_votes(conn: &Connection, resources: &mut [Resource]) -> StoreResult<()> {
    for chunk in resources.chunks_mut(VOTE_LOOKUP_CHUNK) {
        let ids: Vec<String> = chunk.iter().map(|resource| resource.id.to_string()).collect();
        let index_by_uuid: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT resource_uuid, kind, user_id
             FROM resource_votes
             WHERE resource_uuid IN ({placeholders})
             ORDER BY id ASC;"
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        while let Some(row) = rows.next()? {
            let uuid: String = row.get(0)?;
            let kind_text: String = row.get(1)?;
            let user_id: String = row.get(2)?;
            let Some(&index) = index_by_uuid.get(uuid.as_str()) else {
                continue;
            };
            match VoteKind::parse(&kind_text) {
                Some(VoteKind::Up) => chunk[index].upvotes.push(user_id),
                Some(VoteKind::Down) => chunk[index].downvotes.push(user_id),
                None => {
                    return Err(StoreError::InvalidData(format!(
                        "invalid vote kind `{kind_text}` in resource_votes.kind"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn parse_uuid(value: &str) -> StoreResult<ResourceId> {
    Uuid::parse_str(value).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{value}` in resources.uuid"))
    })
}

fn to_sql_integer(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
