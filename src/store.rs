use log::{debug, warn};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, ToSql};
use std::convert::TryFrom;
use std::path::Path;
use std::result::Result as Result_;
use thiserror::Error;

use crate::object::{ConversionError, Object, ObjectShape, ObjectShapeWithId, PropValue};
use crate::query::QueryNode;

pub type Result<T, E = StoreError> = Result_<T, E>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not access store")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not de/serialize object")]
    Serialization(#[from] serde_json::Error),

    #[error("could not convert object")]
    Conversion(#[from] ConversionError),
}

/// A store of [`Object`]s, backed by a single SQLite file.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the store at the given path, creating it if necessary.
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        let mut store = Store {
            conn: Connection::open(path.as_ref())?,
        };

        // Make SQLite use a write-ahead instead of a delete-based journal; see
        // [the SQLite documentation](https://www.sqlite.org/wal.html) for more info.
        store.conn.pragma_update(None, "journal_mode", "WAL")?;

        // Check that the JSON1 extension is working.
        store
            .conn
            .prepare("SELECT json(\"{}\")")?
            .query(params![])
            // Explicitly ignore the value.
            .map(|_| {})?;

        Self::add_regexp_function(&store.conn)?;

        store.upgrade_if_needed()?;

        debug!("opened store at {:?}", path.as_ref());

        Ok(store)
    }

    // SQLite's REGEXP operator has no default implementation; word-pattern queries need one.
    fn add_regexp_function(conn: &Connection) -> rusqlite::Result<()> {
        conn.create_scalar_function(
            "regexp",
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let pattern = ctx.get::<String>(0)?;
                let text = ctx.get::<String>(1)?;

                let re = regex::Regex::new(&pattern)
                    .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;

                Ok(re.is_match(&text))
            },
        )
    }

    fn upgrade_if_needed(&mut self) -> Result<()> {
        // We check the version of the database and upgrade it if necessary.
        // Conveniently, this starts at 0 in an empty database.
        let version = self
            .conn
            .prepare("SELECT user_version from pragma_user_version")?
            .query_row(params![], |row| row.get::<usize, i64>(0))? as usize;

        // We use `AUTOINCREMENT` on the objects table so that IDs are not reused.
        let updates = ["
                        CREATE TABLE objects (
                                object_id INTEGER PRIMARY KEY AUTOINCREMENT,
                                properties TEXT
                        );
                "];

        // We set the `user_version` after each update to ensure updates are not applied twice if one
        // in a sequence of updates fails.
        for (version, update) in updates.iter().enumerate().skip(version) {
            debug!("upgrading store to version {}", version + 1);
            self.conn.execute_batch(update)?;
            self.conn
                .pragma_update(None, "user_version", (version + 1) as i64)?;
        }

        Ok(())
    }

    /// Add the given object to the store, returning the ID it was assigned.
    ///
    /// Any `object-id` property left over from a previous read is discarded; the store owns IDs.
    pub fn add(&mut self, mut object: Object) -> Result<i64> {
        object.remove("object-id");
        let object_serialized = serde_json::to_string(&object)?;

        self.conn
            .prepare("INSERT INTO objects(properties) VALUES(?)")?
            .execute(params![object_serialized])?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Add all of the given objects to the store inside a single transaction.
    ///
    /// Either every object is added or (on error) none are.
    pub fn add_many(&mut self, objects: Vec<Object>) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(objects.len());

        {
            let mut insert = tx.prepare("INSERT INTO objects(properties) VALUES(?)")?;

            for mut object in objects {
                object.remove("object-id");
                insert.execute(params![serde_json::to_string(&object)?])?;
                ids.push(tx.last_insert_rowid());
            }
        }

        tx.commit()?;

        Ok(ids)
    }

    /// Overwrite the object with the given ID.
    ///
    /// Returns the number of objects rewritten (0 if the ID does not exist).
    pub fn replace(&mut self, object_id: i64, mut object: Object) -> Result<usize> {
        object.remove("object-id");
        let object_serialized = serde_json::to_string(&object)?;

        Ok(self
            .conn
            .prepare("UPDATE objects SET properties = ? WHERE object_id = ?")?
            .execute(params![object_serialized, object_id])?)
    }

    /// Save a typed shape: insert it if it has no ID yet (writing the fresh ID back into the
    /// shape), overwrite the stored object otherwise.
    ///
    /// If the shape's ID no longer exists in the store, nothing is written.
    pub fn save<T: ObjectShapeWithId + Clone>(&mut self, shape: &mut T) -> Result<()> {
        match shape.get_object_id() {
            Some(object_id) => {
                if self.replace(object_id, shape.clone().into())? == 0 {
                    warn!("no stored object with ID {} to replace", object_id);
                }
            }
            None => {
                let object_id = self.add(shape.clone().into())?;
                shape.set_object_id(object_id);
            }
        }

        Ok(())
    }

    /// A [`Collection`] of every object in the store.
    pub fn all(&self) -> Collection {
        self.collection(QueryNode::Empty)
    }

    /// A [`Collection`] of the objects matching the given query.
    pub fn query(&self, query: impl Into<QueryNode>) -> Collection {
        self.collection(query.into())
    }

    fn collection(&self, node: QueryNode) -> Collection {
        Collection {
            conn: &self.conn,
            node,
            sort: None,
            limit: None,
            fields: None,
        }
    }
}

/// A handle to the set of objects matching a query, produced by [`Store::all`] or
/// [`Store::query`].
///
/// Chain [`sorted_by`](Collection::sorted_by), [`limit`](Collection::limit), and
/// [`fields`](Collection::fields) to refine the result, then finish with one of the terminal
/// operations ([`iter`](Collection::iter), [`first`](Collection::first),
/// [`len`](Collection::len), [`delete`](Collection::delete), [`set`](Collection::set), ...).
pub struct Collection<'a> {
    conn: &'a Connection,
    node: QueryNode,
    sort: Option<String>,
    limit: Option<usize>,
    fields: Option<Vec<String>>,
}

impl<'a> Collection<'a> {
    /// Sort results by the given property (ascending). `object-id` sorts by ID.
    pub fn sorted_by(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self
    }

    /// Return at most `limit` results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Project results down to the given properties. The `object-id` property is always kept.
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    fn select_sql(&self, what: &str) -> (String, Vec<Box<dyn ToSql>>) {
        let (where_clause, params) = self.node.to_sql_clause();
        let mut sql = format!("SELECT {} FROM objects WHERE {}", what, where_clause);

        if let Some(field) = &self.sort {
            let order_expr = if field == "object-id" {
                "object_id".to_string()
            } else {
                format!("json_extract(properties, \"$.{}\")", field)
            };
            sql.push_str(&format!(" ORDER BY {}", order_expr));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        (sql, params)
    }

    /// The number of matching objects (ignoring any [`limit`](Collection::limit)).
    pub fn len(&self) -> Result<usize> {
        let (where_clause, params) = self.node.to_sql_clause();
        let params: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        Ok(self
            .conn
            .prepare(&format!(
                "SELECT COUNT(*) FROM objects WHERE {}",
                where_clause
            ))?
            .query_row(&params[..], |row| row.get::<usize, i64>(0))? as usize)
    }

    /// Whether any objects match.
    pub fn exists(&self) -> Result<bool> {
        Ok(self.len()? > 0)
    }

    /// All matching objects, each with its ID injected under the `object-id` property.
    pub fn iter(&self) -> Result<impl Iterator<Item = Object>> {
        let (sql, params) = self.select_sql("object_id, properties");
        let params: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut statement = self.conn.prepare(&sql)?;
        let rows = statement.query_map(&params[..], |row| {
            Ok((row.get::<usize, i64>(0)?, row.get::<usize, String>(1)?))
        })?;

        let mut objects = Vec::new();

        for row in rows {
            let (object_id, properties) = row?;
            let mut object: Object = serde_json::from_str(&properties)?;
            object.insert("object-id".to_string(), PropValue::Number(object_id));
            objects.push(self.project(object));
        }

        Ok(objects.into_iter())
    }

    /// The first matching object, or [`None`] if nothing matches.
    pub fn first(&self) -> Result<Option<Object>> {
        Ok(self.iter()?.next())
    }

    /// All matching objects, converted to the given shape.
    pub fn iter_as<T: ObjectShape>(&self) -> Result<Vec<T>> {
        self.iter()?
            .map(|object| T::try_from(object).map_err(StoreError::from))
            .collect()
    }

    /// The first matching object converted to the given shape, or [`None`] if nothing matches.
    pub fn first_as<T: ObjectShape>(&self) -> Result<Option<T>> {
        self.first()?
            .map(|object| T::try_from(object).map_err(StoreError::from))
            .transpose()
    }

    /// Set the given properties on every matching object, returning how many were changed.
    pub fn set(&self, mut changes: Object) -> Result<usize> {
        changes.remove("object-id");

        if changes.is_empty() {
            return Ok(0);
        }

        let (where_clause, where_params) = self.node.to_sql_clause();

        let mut properties_expr = "properties".to_string();
        let mut set_params: Vec<Box<dyn ToSql>> = Vec::new();

        for (name, value) in changes {
            // List values are bound as JSON text and must be reparsed to land as arrays.
            let placeholder = match value {
                PropValue::List(_) => "json(?)",
                _ => "?",
            };
            properties_expr = format!(
                "json_set({}, \"$.{}\", {})",
                properties_expr, name, placeholder
            );
            set_params.push(Box::new(value));
        }

        let params: Vec<&dyn ToSql> = set_params
            .iter()
            .chain(where_params.iter())
            .map(|p| p.as_ref())
            .collect();

        Ok(self
            .conn
            .prepare(&format!(
                "UPDATE objects SET properties = {} WHERE {}",
                properties_expr, where_clause
            ))?
            .execute(&params[..])?)
    }

    /// Delete every matching object, returning how many were removed.
    pub fn delete(&self) -> Result<usize> {
        let (where_clause, params) = self.node.to_sql_clause();
        let params: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        Ok(self
            .conn
            .prepare(&format!("DELETE FROM objects WHERE {}", where_clause))?
            .execute(&params[..])?)
    }

    fn project(&self, mut object: Object) -> Object {
        if let Some(fields) = &self.fields {
            object.retain(|name, _| name == "object-id" || fields.iter().any(|f| f == name));
        }

        object
    }
}
