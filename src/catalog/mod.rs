//! The in-memory catalog: databases, tables with their rows and serial
//! counters, views and materialized views.

pub mod view;

pub use view::{referenced_tables, MaterializedView, View};

use crate::error::{Error, Result};
use crate::types::schema::Table;
use crate::types::Row;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A table's schema together with its stored rows and per-column SERIAL
/// counters. Counters are monotonic and never reused, even after DELETE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub schema: Table,
    pub rows: Vec<Row>,
    pub serials: BTreeMap<String, i64>,
}

impl TableData {
    pub fn new(schema: Table) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            serials: BTreeMap::new(),
        }
    }

    /// Takes the next auto-increment value for a SERIAL column.
    pub fn next_serial(&mut self, column: &str) -> i64 {
        let counter = self.serials.entry(column.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// A single database: named tables, views and materialized views. Names
/// are case-sensitive and shared across all three namespaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub tables: BTreeMap<String, TableData>,
    pub views: BTreeMap<String, View>,
    pub materialized: BTreeMap<String, MaterializedView>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
            views: BTreeMap::new(),
            materialized: BTreeMap::new(),
        }
    }

    /// Whether any table, view or materialized view already uses the name.
    pub fn name_in_use(&self, name: &str) -> bool {
        self.tables.contains_key(name)
            || self.views.contains_key(name)
            || self.materialized.contains_key(name)
    }

    /// Creates a table from a validated schema.
    pub fn create_table(&mut self, schema: Table) -> Result<()> {
        if self.name_in_use(&schema.name) {
            return Err(Error::DuplicateTable(schema.name));
        }
        self.tables
            .insert(schema.name.clone(), TableData::new(schema));
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(Error::TableNotFound(name.into()));
        }
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<&TableData> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.into()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut TableData> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.into()))
    }

    pub fn create_view(&mut self, view: View) -> Result<()> {
        if self.name_in_use(&view.name) {
            return Err(Error::DuplicateView(view.name));
        }
        self.views.insert(view.name.clone(), view);
        Ok(())
    }

    pub fn create_materialized_view(&mut self, view: MaterializedView) -> Result<()> {
        if self.name_in_use(&view.name) {
            return Err(Error::DuplicateView(view.name));
        }
        self.materialized.insert(view.name.clone(), view);
        Ok(())
    }

    pub fn drop_view(&mut self, name: &str, materialized: bool) -> Result<()> {
        let removed = if materialized {
            self.materialized.remove(name).is_some()
        } else {
            self.views.remove(name).is_some()
        };
        if !removed {
            return Err(Error::ViewNotFound(name.into()));
        }
        Ok(())
    }

    /// Marks every materialized view whose query reads the given table as
    /// stale. Reads keep serving the cache until an explicit REFRESH.
    pub fn mark_stale(&mut self, table: &str) {
        for view in self.materialized.values_mut() {
            if view.stale {
                continue;
            }
            let mut referenced = BTreeSet::new();
            referenced_tables(&view.query, &mut referenced);
            if referenced.contains(table) {
                view.stale = true;
            }
        }
    }
}

/// The session-wide catalog: all databases plus the current-database
/// handle. Passed into every executor entry point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub databases: BTreeMap<String, Database>,
    pub current: Option<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_database(&mut self, name: &str) -> Result<()> {
        if self.databases.contains_key(name) {
            return Err(Error::DuplicateDatabase(name.into()));
        }
        self.databases
            .insert(name.to_string(), Database::new(name));
        Ok(())
    }

    /// Drops a database; unsets the current-database handle if it pointed
    /// at the dropped one.
    pub fn drop_database(&mut self, name: &str) -> Result<()> {
        if self.databases.remove(name).is_none() {
            return Err(Error::DatabaseNotFound(name.into()));
        }
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        Ok(())
    }

    pub fn set_current(&mut self, name: &str) -> Result<()> {
        if !self.databases.contains_key(name) {
            return Err(Error::DatabaseNotFound(name.into()));
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// The current database, or a state error if none is selected.
    pub fn current(&self) -> Result<&Database> {
        let name = self.current.as_ref().ok_or(Error::NoDatabaseSelected)?;
        self.databases
            .get(name)
            .ok_or_else(|| Error::DatabaseNotFound(name.clone()))
    }

    pub fn current_mut(&mut self) -> Result<&mut Database> {
        let name = self.current.clone().ok_or(Error::NoDatabaseSelected)?;
        self.databases
            .get_mut(&name)
            .ok_or_else(|| Error::DatabaseNotFound(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::Column;
    use crate::types::DataType;

    fn table(name: &str) -> Table {
        Table::new(
            name.into(),
            vec![Column::new("id", DataType::Int)],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_current_database_lifecycle() {
        let mut catalog = Catalog::new();
        assert_eq!(catalog.current().unwrap_err(), Error::NoDatabaseSelected);

        catalog.create_database("d").unwrap();
        assert_eq!(
            catalog.create_database("d"),
            Err(Error::DuplicateDatabase("d".into()))
        );

        catalog.set_current("d").unwrap();
        assert_eq!(catalog.current().unwrap().name, "d");

        catalog.drop_database("d").unwrap();
        assert_eq!(catalog.current().unwrap_err(), Error::NoDatabaseSelected);
    }

    #[test]
    fn test_shared_namespace() {
        let mut db = Database::new("d");
        db.create_table(table("t")).unwrap();
        let view = View {
            name: "t".into(),
            query: Default::default(),
        };
        assert_eq!(db.create_view(view), Err(Error::DuplicateView("t".into())));
    }

    #[test]
    fn test_serial_counter_is_monotonic() {
        let mut data = TableData::new(table("t"));
        assert_eq!(data.next_serial("id"), 1);
        assert_eq!(data.next_serial("id"), 2);
        // Deleting rows never resets the counter.
        data.rows.clear();
        assert_eq!(data.next_serial("id"), 3);
    }
}
