//! Query Executor for MyDB
//!
//! The [`ExecutionEngine`] owns the catalog, the row store and the indexes,
//! and runs one command at a time against them.

use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, warn};

use super::result::{QueryResult, Response};
use crate::catalog::{Catalog, Column, TableSchema};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::sql::Parser;
use crate::storage::{IndexSet, Row, RowStore, Value, NULL};

/// Execution Engine
pub struct ExecutionEngine {
    /// Table schemas
    catalog: Catalog,
    /// Secondary indexes, derived from the row store
    indexes: IndexSet,
    /// Table rows
    store: RowStore,
    /// Where data lives
    config: DatabaseConfig,
}

impl ExecutionEngine {
    /// Create an engine that keeps everything in memory
    pub fn in_memory() -> Self {
        Self {
            catalog: Catalog::new(),
            indexes: IndexSet::new(),
            store: RowStore::in_memory(),
            config: DatabaseConfig::in_memory(),
        }
    }

    /// Open an engine for `config`, loading any existing snapshot and
    /// metadata and rebuilding the indexes from the loaded rows
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let (Some(data_file), Some(meta_file)) = (config.data_file.clone(), config.meta_file())
        else {
            return Ok(Self::in_memory());
        };

        let store = RowStore::open(&data_file)?;
        let catalog = if meta_file.exists() {
            Catalog::load_from_disk(&meta_file)?
        } else {
            Catalog::new()
        };

        let mut stored = store.table_names();
        stored.sort();
        let known = catalog.list_tables();
        if stored != known {
            return Err(Error::CorruptSnapshot(format!(
                "tables in {} ({}) do not match tables in {} ({})",
                data_file.display(),
                stored.join(", "),
                meta_file.display(),
                known.join(", ")
            )));
        }

        let mut engine = Self {
            catalog,
            indexes: IndexSet::new(),
            store,
            config,
        };

        for name in &known {
            let schema = engine.schema(name)?;
            engine.create_table_indexes(&schema)?;
            engine
                .indexes
                .rebuild(name, engine.store.rows(name)?)
                .map_err(|e| Error::CorruptSnapshot(format!("table '{}': {}", name, e)))?;
        }

        info!(
            path = %data_file.display(),
            tables = known.len(),
            "database opened"
        );
        Ok(engine)
    }

    /// Get the catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the indexes
    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    /// Get the row store
    pub fn store(&self) -> &RowStore {
        &self.store
    }

    /// Get the configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Parse and execute one SQL statement, folding any error into the
    /// response envelope
    pub fn run(&mut self, sql: &str) -> Response {
        let result = catch_panic(|| self.execute_sql(sql));
        if let Err(e) = &result {
            debug!(error = %e, "statement failed");
        }
        result.into()
    }

    /// Parse and execute one SQL statement
    pub fn execute_sql(&mut self, sql: &str) -> Result<QueryResult> {
        let command = Parser::new(sql)?.parse()?;
        self.execute(command)
    }

    /// Execute a parsed command
    pub fn execute(&mut self, command: Command) -> Result<QueryResult> {
        debug!(
            command = command.kind(),
            table = command.table_name(),
            "executing"
        );

        match command {
            Command::CreateTable(stmt) => self.execute_create_table(stmt),
            Command::DropTable(stmt) => self.execute_drop_table(stmt),
            Command::Insert(stmt) => self.execute_insert(stmt),
            Command::Select(stmt) => self.execute_select(stmt),
            Command::Update(stmt) => self.execute_update(stmt),
            Command::Delete(stmt) => self.execute_delete(stmt),
        }
    }

    fn schema(&self, table_name: &str) -> Result<TableSchema> {
        self.catalog
            .get_schema(table_name)
            .cloned()
            .ok_or_else(|| Error::UnknownTable(table_name.to_string()))
    }

    fn create_table_indexes(&mut self, schema: &TableSchema) -> Result<()> {
        for column in &schema.indexes {
            self.indexes.create_index(&schema.name, column, true)?;
        }
        Ok(())
    }

    /// Write catalog metadata next to the data file, if there is one
    fn save_catalog(&self) -> Result<()> {
        match self.config.meta_file() {
            Some(path) => self.catalog.save_to_disk(&path),
            None => Ok(()),
        }
    }

    // ========== DDL ==========

    fn execute_create_table(&mut self, stmt: CreateTableStatement) -> Result<QueryResult> {
        let table_name = stmt.table_name;
        if self.catalog.table_exists(&table_name) {
            return Err(Error::DuplicateTable(table_name));
        }

        let columns = stmt
            .columns
            .into_iter()
            .map(|def| Column::new(def.name, def.data_type).nullable(!def.not_null))
            .collect();

        let schema = self.catalog.create_table_schema(
            &table_name,
            columns,
            stmt.primary_key,
            stmt.unique_columns,
        )?;

        if let Err(e) = self.store.create_table(&table_name) {
            self.catalog.drop_schema(&table_name).ok();
            return Err(e);
        }

        let finished = self
            .create_table_indexes(&schema)
            .and_then(|_| self.save_catalog());
        if let Err(e) = finished {
            warn!(table = %table_name, error = %e, "create table failed, rolling back");
            self.indexes.drop_table_indexes(&table_name);
            self.catalog.drop_schema(&table_name).ok();
            if let Err(undo) = self.store.drop_table(&table_name) {
                warn!(table = %table_name, error = %undo, "could not roll back table storage");
            }
            return Err(e);
        }

        info!(table = %table_name, columns = schema.column_count(), "table created");
        Ok(QueryResult::with_message(format!(
            "Table '{}' created successfully",
            table_name
        )))
    }

    fn execute_drop_table(&mut self, stmt: DropTableStatement) -> Result<QueryResult> {
        let table_name = stmt.table_name;
        if !self.catalog.table_exists(&table_name) {
            return Err(Error::UnknownTable(table_name));
        }

        self.store.drop_table(&table_name)?;
        self.catalog.drop_schema(&table_name)?;
        self.indexes.drop_table_indexes(&table_name);
        self.save_catalog()?;

        info!(table = %table_name, "table dropped");
        Ok(QueryResult::with_message(format!(
            "Table '{}' dropped successfully",
            table_name
        )))
    }

    // ========== INSERT ==========

    fn execute_insert(&mut self, stmt: InsertStatement) -> Result<QueryResult> {
        let schema = self.schema(&stmt.table_name)?;

        let row: Row = match stmt.columns {
            Some(columns) => {
                if columns.len() != stmt.values.len() {
                    return Err(Error::ColumnCountMismatch {
                        expected: columns.len(),
                        found: stmt.values.len(),
                    });
                }
                columns.into_iter().zip(stmt.values).collect()
            }
            None => {
                if stmt.values.len() != schema.column_count() {
                    return Err(Error::ColumnCountMismatch {
                        expected: schema.column_count(),
                        found: stmt.values.len(),
                    });
                }
                schema.column_names().into_iter().zip(stmt.values).collect()
            }
        };

        let row = schema.validate_row(&row)?;
        self.check_insert_constraints(&schema, &row)?;

        let position = self.store.insert_row(&schema.name, row.clone())?;
        self.indexes.add_row(&schema.name, &row, position)?;

        Ok(QueryResult::with_affected_rows(
            1,
            format!("Row inserted into '{}'", schema.name),
        ))
    }

    /// Primary key and unique checks for a single new row
    fn check_insert_constraints(&self, schema: &TableSchema, row: &Row) -> Result<()> {
        if let Some(pk) = &schema.primary_key {
            if let Some(value) = self.taken_value(&schema.name, row, pk) {
                return Err(Error::DuplicateKey {
                    table: schema.name.clone(),
                    value: value.to_string(),
                });
            }
        }

        let unique = schema
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|&c| schema.is_unique(c) && schema.primary_key.as_deref() != Some(c));
        for column in unique {
            if let Some(value) = self.taken_value(&schema.name, row, column) {
                return Err(Error::UniqueViolation {
                    table: schema.name.clone(),
                    column: column.to_string(),
                    value: value.to_string(),
                });
            }
        }

        Ok(())
    }

    /// The row's value for `column` if another row already holds it
    fn taken_value<'a>(&self, table: &str, row: &'a Row, column: &str) -> Option<&'a Value> {
        let value = row.get(column)?;
        if value.is_null() || self.indexes.lookup(table, column, value).is_empty() {
            None
        } else {
            Some(value)
        }
    }

    // ========== SELECT ==========

    fn execute_select(&mut self, stmt: SelectStatement) -> Result<QueryResult> {
        let schema = self.schema(&stmt.table_name)?;
        let table = schema.name.as_str();

        let mut rows = match stmt
            .where_clause
            .as_ref()
            .and_then(|condition| self.index_candidates(&schema, condition))
        {
            Some(positions) => {
                let all = self.store.rows(table)?;
                positions
                    .into_iter()
                    .filter_map(|position| all.get(position).cloned())
                    .collect()
            }
            None => self.store.get_all_rows(table)?,
        };

        let mut all_columns = schema.column_names();
        if let Some(join) = &stmt.join {
            let right = self.schema(&join.table_name)?;
            let right_rows = self.store.rows(&right.name)?;
            rows = join_rows(&rows, table, right_rows, &right.name, &join.conditions);
            all_columns = qualified_columns(&schema)
                .chain(qualified_columns(&right))
                .collect();
        }

        if let Some(condition) = &stmt.where_clause {
            rows.retain(|row| matches_condition(row, condition, table));
        }

        let (columns, mut rows) = match stmt.projection {
            Projection::All => (all_columns, rows),
            Projection::Columns(columns) => {
                let projected = rows
                    .iter()
                    .map(|row| project(row, &columns, table))
                    .collect();
                (columns, projected)
            }
        };

        // Sorting sees projected rows only
        if let Some(key) = &stmt.order_by {
            sort_rows(&mut rows, key, table);
        }

        if let Some(limit) = stmt.limit {
            rows.truncate(limit);
        }

        Ok(QueryResult::with_rows(columns, rows))
    }

    /// Row positions from the first `=` comparison on an indexed column of
    /// the base table. `None` means a full scan is needed.
    fn index_candidates(&self, schema: &TableSchema, condition: &Condition) -> Option<Vec<usize>> {
        condition
            .comparisons()
            .into_iter()
            .filter(|c| c.op == ComparisonOperator::Eq)
            .find_map(|c| {
                let column = local_column(&c.column, &schema.name)?;
                if !self.indexes.has_index(&schema.name, column) {
                    return None;
                }
                let key = schema.get_column(column)?.coerce(&c.value).ok()?;
                if key.is_null() {
                    return None;
                }
                debug!(table = %schema.name, column, "using index");
                Some(self.indexes.lookup(&schema.name, column, &key))
            })
    }

    // ========== UPDATE / DELETE ==========

    fn execute_update(&mut self, stmt: UpdateStatement) -> Result<QueryResult> {
        let schema = self.schema(&stmt.table_name)?;
        let table = schema.name.as_str();

        // All changes happen on a copy; nothing is stored until every row passes
        let mut rows = self.store.get_all_rows(table)?;
        let mut updated = 0;

        for row in rows.iter_mut() {
            if let Some(condition) = &stmt.where_clause {
                if !matches_condition(row, condition, table) {
                    continue;
                }
            }

            for assignment in &stmt.assignments {
                row.insert(assignment.column.clone(), assignment.value.clone());
            }
            *row = schema.validate_row(row)?;
            updated += 1;
        }

        self.check_unique(&schema, &rows)?;
        self.store.update_rows(table, rows)?;
        self.indexes.rebuild(table, self.store.rows(table)?)?;

        Ok(QueryResult::with_affected_rows(
            updated,
            format!("Updated {} row(s)", updated),
        ))
    }

    /// Unique checks over a whole candidate row sequence
    fn check_unique(&self, schema: &TableSchema, rows: &[Row]) -> Result<()> {
        self.indexes
            .check_unique(&schema.name, rows)
            .map_err(|e| match e {
                Error::UniqueViolation {
                    table,
                    column,
                    value,
                } if schema.primary_key.as_deref() == Some(column.as_str()) => {
                    Error::DuplicateKey { table, value }
                }
                other => other,
            })
    }

    fn execute_delete(&mut self, stmt: DeleteStatement) -> Result<QueryResult> {
        let schema = self.schema(&stmt.table_name)?;
        let table = schema.name.as_str();

        let rows = self.store.get_all_rows(table)?;
        let original_count = rows.len();

        let remaining: Vec<Row> = match &stmt.where_clause {
            Some(condition) => rows
                .into_iter()
                .filter(|row| !matches_condition(row, condition, table))
                .collect(),
            None => Vec::new(),
        };
        let deleted = original_count - remaining.len();

        self.store.update_rows(table, remaining)?;
        self.indexes.rebuild(table, self.store.rows(table)?)?;

        Ok(QueryResult::with_affected_rows(
            deleted,
            format!("Deleted {} row(s)", deleted),
        ))
    }
}

/// Run `f`, reporting a panic as [`Error::Internal`] instead of unwinding
fn catch_panic<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let cause = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "statement panicked".to_string());
        warn!(%cause, "statement panicked");
        Err(Error::Internal(cause))
    })
}

// ========== Row helpers ==========

/// Column name of `reference` within `table`: bare names pass through,
/// `table.col` is stripped, other qualifiers do not belong to `table`
fn local_column<'a>(reference: &'a str, table: &str) -> Option<&'a str> {
    match reference.split_once('.') {
        Some((qualifier, column)) if qualifier == table => Some(column),
        Some(_) => None,
        None => Some(reference),
    }
}

/// Look a column reference up in a row: exact key first, then the other
/// spelling of a base table column (`base.col` for `col` and back)
fn resolve<'a>(row: &'a Row, reference: &str, table: &str) -> Option<&'a Value> {
    row.get(reference).or_else(|| match reference.split_once('.') {
        Some((qualifier, column)) if qualifier == table => row.get(column),
        Some(_) => None,
        None => row.get(&format!("{}.{}", table, reference)),
    })
}

/// Evaluate a WHERE tree. Missing columns read as NULL.
fn matches_condition(row: &Row, condition: &Condition, table: &str) -> bool {
    match condition {
        Condition::Comparison(c) => {
            let actual = resolve(row, &c.column, table).unwrap_or(&NULL);
            evaluate_comparison(actual, c.op, &c.value)
        }
        Condition::And(children) => children
            .iter()
            .all(|child| matches_condition(row, child, table)),
    }
}

/// Ordering operators need two non-null, order-comparable values.
/// Anything else is false.
fn evaluate_comparison(actual: &Value, op: ComparisonOperator, expected: &Value) -> bool {
    let ordering = actual.compare(expected);
    match op {
        ComparisonOperator::Eq => ordering == Some(Ordering::Equal),
        ComparisonOperator::Neq => ordering != Some(Ordering::Equal),
        _ if actual.is_null() || expected.is_null() => false,
        ComparisonOperator::Lt => ordering == Some(Ordering::Less),
        ComparisonOperator::Gt => ordering == Some(Ordering::Greater),
        ComparisonOperator::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        ComparisonOperator::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}

/// Value of a join reference in a row of `table`; NULL when the reference
/// names another table or a missing column
fn join_value<'a>(row: &'a Row, reference: &str, table: &str) -> &'a Value {
    local_column(reference, table)
        .and_then(|column| row.get(column))
        .unwrap_or(&NULL)
}

/// Nested-loop equi-join. Combined rows are keyed `table.column`.
fn join_rows(
    left_rows: &[Row],
    left_table: &str,
    right_rows: &[Row],
    right_table: &str,
    conditions: &[JoinCondition],
) -> Vec<Row> {
    let is_right = |reference: &str| {
        reference
            .split_once('.')
            .is_some_and(|(qualifier, _)| qualifier == right_table)
    };

    // Orient each condition as (left table reference, right table reference)
    let oriented: Vec<(&str, &str)> = conditions
        .iter()
        .map(|c| {
            if is_right(&c.left) && !is_right(&c.right) {
                (c.right.as_str(), c.left.as_str())
            } else {
                (c.left.as_str(), c.right.as_str())
            }
        })
        .collect();

    let mut result = Vec::new();
    for left in left_rows {
        for right in right_rows {
            let matched = oriented.iter().all(|(l, r)| {
                join_value(left, l, left_table).sql_eq(join_value(right, r, right_table))
            });

            if matched {
                let mut combined = Row::with_capacity(left.len() + right.len());
                for (column, value) in left {
                    combined.insert(format!("{}.{}", left_table, column), value.clone());
                }
                for (column, value) in right {
                    combined.insert(format!("{}.{}", right_table, column), value.clone());
                }
                result.push(combined);
            }
        }
    }
    result
}

fn qualified_columns(schema: &TableSchema) -> impl Iterator<Item = String> + '_ {
    schema
        .columns
        .iter()
        .map(move |column| format!("{}.{}", schema.name, column.name))
}

/// Stable ascending sort on one column. Missing keys sort as empty text.
/// If any key cannot be ordered against the others the order is kept.
fn sort_rows(rows: &mut Vec<Row>, key: &str, table: &str) {
    let keys: Vec<Value> = rows
        .iter()
        .map(|row| {
            resolve(row, key, table)
                .cloned()
                .unwrap_or_else(|| Value::Text(String::new()))
        })
        .collect();

    let Some(first) = keys.first() else {
        return;
    };
    if keys.iter().any(|k| first.compare(k).is_none()) {
        debug!(column = key, "ORDER BY keys are not comparable, keeping row order");
        return;
    }

    let mut keyed: Vec<(Value, Row)> = keys.into_iter().zip(rows.drain(..)).collect();
    keyed.sort_by(|a, b| a.0.compare(&b.0).unwrap_or(Ordering::Equal));
    rows.extend(keyed.into_iter().map(|(_, row)| row));
}

/// Pick the listed columns; missing ones project as NULL
fn project(row: &Row, columns: &[String], table: &str) -> Row {
    columns
        .iter()
        .map(|column| {
            let value = resolve(row, column, table).cloned().unwrap_or(Value::Null);
            (column.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_users() -> ExecutionEngine {
        let mut engine = ExecutionEngine::in_memory();
        engine
            .execute_sql(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(20) NOT NULL, \
                 email VARCHAR(50) UNIQUE, age INTEGER)",
            )
            .unwrap();
        for sql in [
            "INSERT INTO users VALUES (1, 'Alice', 'a@x.com', 30)",
            "INSERT INTO users VALUES (2, 'Bob', 'b@x.com', 25)",
            "INSERT INTO users VALUES (3, 'Carol', NULL, 35)",
        ] {
            engine.execute_sql(sql).unwrap();
        }
        engine
    }

    fn ids(result: &QueryResult) -> Vec<Value> {
        result
            .rows
            .as_ref()
            .unwrap()
            .iter()
            .map(|row| row["id"].clone())
            .collect()
    }

    #[test]
    fn test_create_table() {
        let mut engine = ExecutionEngine::in_memory();

        let result = engine
            .execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY, code VARCHAR UNIQUE)")
            .unwrap();
        assert_eq!(result.message, "Table 't' created successfully");
        assert!(engine.indexes().has_index("t", "id"));
        assert!(engine.indexes().has_index("t", "code"));

        let err = engine.execute_sql("CREATE TABLE t (x INTEGER)").unwrap_err();
        assert!(matches!(err, Error::DuplicateTable(_)));
    }

    #[test]
    fn test_primary_key_and_unique_share_one_index() {
        let mut engine = ExecutionEngine::in_memory();
        engine
            .execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY UNIQUE)")
            .unwrap();
        assert_eq!(engine.indexes().table_indexes("t").count(), 1);
    }

    #[test]
    fn test_insert_and_select() {
        let mut engine = engine_with_users();

        let result = engine.execute_sql("SELECT * FROM users").unwrap();
        assert_eq!(result.message, "Found 3 row(s)");
        assert_eq!(
            result.columns.as_ref().unwrap(),
            &vec!["id", "name", "email", "age"]
        );
        assert_eq!(
            ids(&result),
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
    }

    #[test]
    fn test_insert_coerces_values() {
        let mut engine = ExecutionEngine::in_memory();
        engine
            .execute_sql("CREATE TABLE t (n INTEGER, f FLOAT, b BOOLEAN, s VARCHAR(5))")
            .unwrap();
        engine
            .execute_sql("INSERT INTO t VALUES ('5', 2, 'yes', 42)")
            .unwrap();

        let result = engine.execute_sql("SELECT * FROM t").unwrap();
        let row = &result.rows.unwrap()[0];
        assert_eq!(row["n"], Value::Integer(5));
        assert_eq!(row["f"], Value::Float(2.0));
        assert_eq!(row["b"], Value::Boolean(true));
        assert_eq!(row["s"], Value::Text("42".to_string()));
    }

    #[test]
    fn test_insert_errors() {
        let mut engine = engine_with_users();

        let cases: Vec<(&str, fn(&Error) -> bool)> = vec![
            ("INSERT INTO users VALUES (1, 'Dup', 'd@x.com', 1)", |e| {
                matches!(e, Error::DuplicateKey { .. })
            }),
            ("INSERT INTO users VALUES (9, 'Dup', 'a@x.com', 1)", |e| {
                matches!(e, Error::UniqueViolation { .. })
            }),
            ("INSERT INTO users VALUES (9, 'Short')", |e| {
                matches!(e, Error::ColumnCountMismatch { expected: 4, found: 2 })
            }),
            ("INSERT INTO users (id) VALUES (9)", |e| {
                matches!(e, Error::MissingColumn(_))
            }),
            ("INSERT INTO users (id, name, nick) VALUES (9, 'x', 'y')", |e| {
                matches!(e, Error::UnknownColumn(_))
            }),
            ("INSERT INTO users VALUES ('abc', 'x', NULL, 1)", |e| {
                matches!(e, Error::TypeMismatch { .. })
            }),
            ("INSERT INTO users VALUES (9, 'a name that is far too long', NULL, 1)", |e| {
                matches!(e, Error::LengthExceeded { .. })
            }),
            ("INSERT INTO users VALUES (9, NULL, NULL, 1)", |e| {
                matches!(e, Error::NotNullViolation(_))
            }),
            ("INSERT INTO nope VALUES (1)", |e| {
                matches!(e, Error::UnknownTable(_))
            }),
        ];

        for (sql, check) in cases {
            let err = engine.execute_sql(sql).unwrap_err();
            assert!(check(&err), "unexpected error for {sql}: {err:?}");
        }
        assert_eq!(engine.store().row_count("users").unwrap(), 3);
    }

    #[test]
    fn test_where_filters() {
        let mut engine = engine_with_users();

        let result = engine.execute_sql("SELECT * FROM users WHERE id = 2").unwrap();
        assert_eq!(ids(&result), vec![Value::Integer(2)]);

        let result = engine
            .execute_sql("SELECT * FROM users WHERE age >= 30 AND name != 'Carol'")
            .unwrap();
        assert_eq!(ids(&result), vec![Value::Integer(1)]);

        // Incomparable types are simply false
        let result = engine
            .execute_sql("SELECT * FROM users WHERE name > 5")
            .unwrap();
        assert!(result.rows.unwrap().is_empty());

        let result = engine
            .execute_sql("SELECT * FROM users WHERE users.email = NULL")
            .unwrap();
        assert_eq!(ids(&result), vec![Value::Integer(3)]);
    }

    #[test]
    fn test_index_lookup_matches_scan() {
        let mut engine = engine_with_users();

        let indexed = engine
            .execute_sql("SELECT * FROM users WHERE email = 'b@x.com' AND age = 25")
            .unwrap();
        assert_eq!(ids(&indexed), vec![Value::Integer(2)]);

        // Literal text is not equal to an integer, with or without the index
        let result = engine.execute_sql("SELECT * FROM users WHERE id = '2'").unwrap();
        assert!(result.rows.unwrap().is_empty());

        let result = engine.execute_sql("SELECT * FROM users WHERE id = 2.0").unwrap();
        assert_eq!(ids(&result), vec![Value::Integer(2)]);
    }

    #[test]
    fn test_order_by_and_limit() {
        let mut engine = engine_with_users();

        let result = engine
            .execute_sql("SELECT id, age FROM users ORDER BY age LIMIT 2")
            .unwrap();
        assert_eq!(ids(&result), vec![Value::Integer(2), Value::Integer(1)]);
        assert_eq!(result.columns.unwrap(), vec!["id", "age"]);

        // age is not selected, so every key is empty and the order is kept
        let result = engine
            .execute_sql("SELECT id, name FROM users ORDER BY age LIMIT 2")
            .unwrap();
        assert_eq!(ids(&result), vec![Value::Integer(1), Value::Integer(2)]);

        // NULL emails cannot be ordered against text: order is kept
        let result = engine
            .execute_sql("SELECT * FROM users ORDER BY email")
            .unwrap();
        assert_eq!(
            ids(&result),
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );

        let result = engine.execute_sql("SELECT * FROM users LIMIT 0").unwrap();
        assert!(result.rows.unwrap().is_empty());
    }

    #[test]
    fn test_projection_missing_column_is_null() {
        let mut engine = engine_with_users();

        let result = engine
            .execute_sql("SELECT name, nickname FROM users WHERE id = 1")
            .unwrap();
        let row = &result.rows.unwrap()[0];
        assert_eq!(row["name"], Value::Text("Alice".to_string()));
        assert_eq!(row["nickname"], Value::Null);
    }

    #[test]
    fn test_join() {
        let mut engine = engine_with_users();
        engine
            .execute_sql("CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title VARCHAR)")
            .unwrap();
        engine
            .execute_sql("INSERT INTO posts VALUES (10, 2, 'Hello')")
            .unwrap();

        let result = engine
            .execute_sql(
                "SELECT users.name, posts.title FROM users \
                 JOIN posts ON posts.user_id = users.id",
            )
            .unwrap();
        let rows = result.rows.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["users.name"], Value::Text("Bob".to_string()));
        assert_eq!(rows[0]["posts.title"], Value::Text("Hello".to_string()));

        let result = engine
            .execute_sql("SELECT * FROM users JOIN posts ON users.id = posts.user_id")
            .unwrap();
        let columns = result.columns.unwrap();
        assert_eq!(columns.len(), 7);
        assert_eq!(columns[0], "users.id");
        assert_eq!(columns[4], "posts.id");
    }

    #[test]
    fn test_join_with_where_on_both_tables() {
        let mut engine = engine_with_users();
        engine
            .execute_sql("CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title VARCHAR)")
            .unwrap();
        for sql in [
            "INSERT INTO posts VALUES (10, 1, 'First')",
            "INSERT INTO posts VALUES (11, 1, 'Second')",
            "INSERT INTO posts VALUES (12, 2, 'Third')",
        ] {
            engine.execute_sql(sql).unwrap();
        }

        let result = engine
            .execute_sql(
                "SELECT name, posts.title FROM users JOIN posts ON users.id = posts.user_id \
                 WHERE id = 1 AND posts.title = 'Second' ORDER BY posts.id",
            )
            .unwrap();
        let rows = result.rows.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::Text("Alice".to_string()));
        assert_eq!(rows[0]["posts.title"], Value::Text("Second".to_string()));
    }

    #[test]
    fn test_update() {
        let mut engine = engine_with_users();

        let result = engine
            .execute_sql("UPDATE users SET age = '40' WHERE id = 1")
            .unwrap();
        assert_eq!(result.message, "Updated 1 row(s)");

        let result = engine.execute_sql("SELECT age FROM users WHERE id = 1").unwrap();
        assert_eq!(result.rows.unwrap()[0]["age"], Value::Integer(40));

        let result = engine.execute_sql("UPDATE users SET age = 1").unwrap();
        assert_eq!(result.affected_rows, 3);
    }

    #[test]
    fn test_update_failure_leaves_rows_unchanged() {
        let mut engine = engine_with_users();
        let before = engine.store().get_all_rows("users").unwrap();

        let err = engine.execute_sql("UPDATE users SET age = 'old'").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));

        let err = engine.execute_sql("UPDATE users SET id = 7").unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));

        let err = engine
            .execute_sql("UPDATE users SET email = 'a@x.com' WHERE id = 2")
            .unwrap_err();
        assert!(matches!(err, Error::UniqueViolation { .. }));

        assert_eq!(engine.store().get_all_rows("users").unwrap(), before);
    }

    #[test]
    fn test_update_keeps_indexes_in_sync() {
        let mut engine = engine_with_users();
        engine
            .execute_sql("UPDATE users SET id = 20 WHERE id = 2")
            .unwrap();

        assert!(engine
            .indexes()
            .lookup("users", "id", &Value::Integer(2))
            .is_empty());
        assert_eq!(
            engine.indexes().lookup("users", "id", &Value::Integer(20)),
            vec![1]
        );
        engine
            .execute_sql("INSERT INTO users VALUES (2, 'New', NULL, 1)")
            .unwrap();
    }

    #[test]
    fn test_delete() {
        let mut engine = engine_with_users();

        let result = engine.execute_sql("DELETE FROM users WHERE age < 31").unwrap();
        assert_eq!(result.message, "Deleted 2 row(s)");
        assert_eq!(engine.store().row_count("users").unwrap(), 1);
        assert_eq!(
            engine.indexes().lookup("users", "id", &Value::Integer(3)),
            vec![0]
        );

        let result = engine.execute_sql("DELETE FROM users").unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(engine.store().row_count("users").unwrap(), 0);
    }

    #[test]
    fn test_drop_table() {
        let mut engine = engine_with_users();

        let result = engine.execute_sql("DROP TABLE users").unwrap();
        assert_eq!(result.message, "Table 'users' dropped successfully");
        assert!(!engine.store().table_exists("users"));
        assert!(!engine.indexes().has_index("users", "id"));

        let err = engine.execute_sql("SELECT * FROM users").unwrap_err();
        assert!(err.is_not_found());
        let err = engine.execute_sql("DROP TABLE users").unwrap_err();
        assert!(matches!(err, Error::UnknownTable(_)));
    }

    #[test]
    fn test_run_never_fails() {
        let mut engine = ExecutionEngine::in_memory();

        let response = engine.run("EXPLAIN SELECT 1");
        assert!(!response.success);
        assert_eq!(response.message, "Unsupported command: EXPLAIN");

        let response = engine.run("SELECT * FROM missing");
        assert!(!response.success);
        assert!(response.data.is_none());
    }

    #[test]
    fn test_panics_become_internal_errors() {
        let result: Result<QueryResult> = catch_panic(|| panic!("index out of range"));
        assert!(matches!(&result, Err(Error::Internal(cause)) if cause == "index out of range"));

        let result: Result<QueryResult> = catch_panic(|| panic!("row {} vanished", 7));
        let response = Response::from(result);
        assert!(!response.success);
        assert_eq!(response.message, "Internal error: row 7 vanished");

        let result = catch_panic(|| Ok(QueryResult::with_message("fine")));
        assert!(result.is_ok());
    }
}
