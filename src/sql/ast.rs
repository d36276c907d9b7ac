//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the commands produced by the parser. Each command is
//! consumed once by the executor.

use crate::catalog::DataType;
use crate::storage::Value;
use std::fmt;

/// A parsed SQL command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// DROP TABLE statement
    DropTable(DropTableStatement),
    /// INSERT statement
    Insert(InsertStatement),
    /// SELECT statement
    Select(SelectStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// DELETE statement
    Delete(DeleteStatement),
}

impl Command {
    /// Statement kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Command::CreateTable(_) => "CREATE TABLE",
            Command::DropTable(_) => "DROP TABLE",
            Command::Insert(_) => "INSERT",
            Command::Select(_) => "SELECT",
            Command::Update(_) => "UPDATE",
            Command::Delete(_) => "DELETE",
        }
    }

    /// Table the command targets
    pub fn table_name(&self) -> &str {
        match self {
            Command::CreateTable(s) => &s.table_name,
            Command::DropTable(s) => &s.table_name,
            Command::Insert(s) => &s.table_name,
            Command::Select(s) => &s.table_name,
            Command::Update(s) => &s.table_name,
            Command::Delete(s) => &s.table_name,
        }
    }
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// Column definitions
    pub columns: Vec<ColumnDef>,
    /// Primary key column (the first one declared)
    pub primary_key: Option<String>,
    /// Columns declared UNIQUE, in declaration order
    pub unique_columns: Vec<String>,
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// NOT NULL constraint
    pub not_null: bool,
}

/// DROP TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    /// Table name
    pub table_name: String,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name
    pub table_name: String,
    /// Column names (optional)
    pub columns: Option<Vec<String>>,
    /// One tuple of values
    pub values: Vec<Value>,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Select list
    pub projection: Projection,
    /// Base table
    pub table_name: String,
    /// JOIN clause
    pub join: Option<Join>,
    /// WHERE clause
    pub where_clause: Option<Condition>,
    /// ORDER BY column (always ascending)
    pub order_by: Option<String>,
    /// LIMIT clause
    pub limit: Option<usize>,
}

/// The select list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// All columns (*)
    All,
    /// Listed columns, kept verbatim (`t.col` stays qualified)
    Columns(Vec<String>),
}

/// JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Table to join
    pub table_name: String,
    /// Equality conditions, all of which must hold
    pub conditions: Vec<JoinCondition>,
}

/// One `left = right` join condition
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    /// Left column reference
    pub left: String,
    /// Right column reference
    pub right: String,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table name
    pub table_name: String,
    /// SET clause (column = value pairs)
    pub assignments: Vec<Assignment>,
    /// WHERE clause
    pub where_clause: Option<Condition>,
}

/// Column assignment (for UPDATE)
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Column name
    pub column: String,
    /// New value
    pub value: Value,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table name
    pub table_name: String,
    /// WHERE clause
    pub where_clause: Option<Condition>,
}

/// WHERE condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single comparison
    Comparison(Comparison),
    /// Every child must hold
    And(Vec<Condition>),
}

impl Condition {
    /// Every comparison leaf, in source order
    pub fn comparisons(&self) -> Vec<&Comparison> {
        match self {
            Condition::Comparison(c) => vec![c],
            Condition::And(children) => children.iter().flat_map(|c| c.comparisons()).collect(),
        }
    }
}

/// `column <op> literal`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Column reference, possibly qualified
    pub column: String,
    /// Comparison operator
    pub op: ComparisonOperator,
    /// Literal to compare against
    pub value: Value,
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Neq => "!=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Gte => ">=",
        };
        write!(f, "{}", s)
    }
}
