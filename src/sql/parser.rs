//! SQL Parser
//!
//! This module parses SQL tokens into a [`Command`]. It is a hand-written
//! recursive-descent parser with one function per statement kind.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::catalog::DataType;
use crate::error::{Error, Result};
use crate::storage::Value;
use tracing::warn;

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse exactly one statement, with an optional trailing semicolon
    pub fn parse(&mut self) -> Result<Command> {
        let command = self.parse_statement()?;

        // Consume optional semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        }

        if !self.is_at_end() {
            return Err(malformed(format!(
                "unexpected {} after end of statement",
                self.current()
            )));
        }

        Ok(command)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Command> {
        match self.current() {
            Token::Select => self.parse_select().map(Command::Select),
            Token::Insert => self.parse_insert().map(Command::Insert),
            Token::Update => self.parse_update().map(Command::Update),
            Token::Delete => self.parse_delete().map(Command::Delete),
            Token::Create => self.parse_create_table().map(Command::CreateTable),
            Token::Drop => self.parse_drop_table().map(Command::DropTable),
            Token::Eof | Token::Semicolon => Err(malformed("empty statement")),
            other => Err(Error::UnsupportedCommand(other.to_string().to_uppercase())),
        }
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let projection = if self.check(&Token::Asterisk) {
            self.advance();
            Projection::All
        } else {
            let mut columns = vec![self.parse_column_ref("column name")?];
            while self.check(&Token::Comma) {
                self.advance();
                columns.push(self.parse_column_ref("column name")?);
            }
            Projection::Columns(columns)
        };

        self.expect(&Token::From)?;
        let table_name = self.expect_identifier("table name")?;

        // JOIN clause
        let join = if self.is_join_keyword() {
            Some(self.parse_join()?)
        } else {
            None
        };
        if self.is_join_keyword() {
            return Err(malformed("only one JOIN is supported"));
        }

        // WHERE clause
        let where_clause = self.parse_optional_where()?;

        // ORDER BY clause
        let order_by = if self.check(&Token::Order) {
            self.advance();
            self.expect(&Token::By)?;
            let column = self.parse_column_ref("ORDER BY column")?;
            match self.current() {
                Token::Asc => self.advance(),
                Token::Desc => return Err(malformed("descending order is not supported")),
                _ => {}
            }
            if self.check(&Token::Comma) {
                return Err(malformed("ORDER BY takes a single column"));
            }
            Some(column)
        } else {
            None
        };

        // LIMIT clause
        let limit = if self.check(&Token::Limit) {
            self.advance();
            let n = self.expect_integer("LIMIT count")?;
            let n = usize::try_from(n)
                .map_err(|_| malformed(format!("LIMIT must be non-negative, got {}", n)))?;
            Some(n)
        } else {
            None
        };

        Ok(SelectStatement {
            projection,
            table_name,
            join,
            where_clause,
            order_by,
            limit,
        })
    }

    fn is_join_keyword(&self) -> bool {
        self.check(&Token::Join) || self.check(&Token::Inner)
    }

    fn parse_join(&mut self) -> Result<Join> {
        if self.check(&Token::Inner) {
            self.advance();
        }
        self.expect(&Token::Join)?;

        let table_name = self.expect_identifier("JOIN table name")?;
        self.expect(&Token::On)?;

        let mut conditions = Vec::new();
        loop {
            let left = self.parse_column_ref("JOIN column")?;
            if !self.check(&Token::Eq) {
                return Err(malformed(format!(
                    "JOIN conditions must use =, found {}",
                    self.current()
                )));
            }
            self.advance();
            let right = self.parse_column_ref("JOIN column")?;
            conditions.push(JoinCondition { left, right });

            if !self.check(&Token::And) {
                break;
            }
            self.advance();
        }

        if self.check(&Token::Or) {
            return Err(malformed("OR is not supported"));
        }

        Ok(Join {
            table_name,
            conditions,
        })
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier("table name")?;

        // Optional column list
        let columns = if self.check(&Token::LParen) {
            self.advance();
            let cols = self.parse_identifier_list("column name")?;
            self.expect(&Token::RParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect(&Token::Values)?;
        self.expect(&Token::LParen)?;
        let mut values = vec![self.parse_literal()?];
        while self.check(&Token::Comma) {
            self.advance();
            values.push(self.parse_literal()?);
        }
        self.expect(&Token::RParen)?;

        if self.check(&Token::Comma) {
            return Err(malformed("only one VALUES tuple per INSERT is supported"));
        }

        if let Some(cols) = &columns {
            if cols.len() != values.len() {
                return Err(Error::ColumnCountMismatch {
                    expected: cols.len(),
                    found: values.len(),
                });
            }
        }

        Ok(InsertStatement {
            table_name,
            columns,
            values,
        })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;

        let table_name = self.expect_identifier("table name")?;

        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier("column name")?;
            self.expect(&Token::Eq)?;
            let value = self.parse_literal()?;
            assignments.push(Assignment { column, value });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = self.parse_optional_where()?;

        Ok(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        })
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier("table name")?;
        let where_clause = self.parse_optional_where()?;

        Ok(DeleteStatement {
            table_name,
            where_clause,
        })
    }

    // ========== CREATE / DROP TABLE ==========

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Create)?;
        self.expect(&Token::Table)?;

        let table_name = self.expect_identifier("table name")?;

        self.expect(&Token::LParen)?;

        let mut columns = Vec::new();
        let mut primary_key: Option<String> = None;
        let mut unique_columns: Vec<String> = Vec::new();

        loop {
            let (column, is_primary, is_unique) = self.parse_column_def()?;

            if is_primary {
                match &primary_key {
                    None => primary_key = Some(column.name.clone()),
                    Some(first) => {
                        warn!(
                            table = %table_name,
                            column = %column.name,
                            primary_key = %first,
                            "multiple PRIMARY KEY columns, treating this one as UNIQUE"
                        );
                        if !unique_columns.contains(&column.name) {
                            unique_columns.push(column.name.clone());
                        }
                    }
                }
            }
            if is_unique && !unique_columns.contains(&column.name) {
                unique_columns.push(column.name.clone());
            }
            columns.push(column);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
            primary_key,
            unique_columns,
        })
    }

    /// Parse `<name> <TYPE>[(<n>)] [PRIMARY KEY] [UNIQUE] [NOT NULL] [NULL]`
    ///
    /// Returns the column with its PRIMARY KEY and UNIQUE flags.
    fn parse_column_def(&mut self) -> Result<(ColumnDef, bool, bool)> {
        let name = self.expect_identifier("column name")?;
        let data_type = self.parse_data_type(&name)?;

        let mut not_null = false;
        let mut primary_key = false;
        let mut unique = false;

        loop {
            match self.current() {
                Token::Primary => {
                    self.advance();
                    self.expect(&Token::Key)?;
                    primary_key = true;
                }
                Token::Unique => {
                    self.advance();
                    unique = true;
                }
                Token::Not => {
                    self.advance();
                    self.expect(&Token::Null)?;
                    not_null = true;
                }
                Token::Null => {
                    self.advance();
                    not_null = false;
                }
                Token::Comma | Token::RParen => break,
                other => {
                    return Err(malformed(format!(
                        "unexpected {} in definition of column '{}'",
                        other, name
                    )))
                }
            }
        }

        Ok((
            ColumnDef {
                name,
                data_type,
                not_null,
            },
            primary_key,
            unique,
        ))
    }

    fn parse_data_type(&mut self, column: &str) -> Result<DataType> {
        let type_name = match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                name
            }
            other => {
                return Err(malformed(format!(
                    "expected type for column '{}', found {}",
                    column, other
                )))
            }
        };

        let length = if self.check(&Token::LParen) {
            self.advance();
            let n = self.expect_integer("VARCHAR length")?;
            self.expect(&Token::RParen)?;
            let n = usize::try_from(n)
                .map_err(|_| malformed(format!("invalid length {} for column '{}'", n, column)))?;
            Some(n)
        } else {
            None
        };

        match DataType::from_name(&type_name, length) {
            Some(DataType::Varchar(n)) => Ok(DataType::Varchar(n)),
            Some(_) if length.is_some() => Err(malformed(format!(
                "type {} does not take a length",
                type_name.to_uppercase()
            ))),
            Some(data_type) => Ok(data_type),
            None => Err(malformed(format!(
                "unknown type '{}' for column '{}'",
                type_name, column
            ))),
        }
    }

    fn parse_drop_table(&mut self) -> Result<DropTableStatement> {
        self.expect(&Token::Drop)?;
        self.expect(&Token::Table)?;

        let table_name = self.expect_identifier("table name")?;
        Ok(DropTableStatement { table_name })
    }

    // ========== WHERE Conditions ==========

    fn parse_optional_where(&mut self) -> Result<Option<Condition>> {
        if !self.check(&Token::Where) {
            return Ok(None);
        }
        self.advance();
        self.parse_condition().map(Some)
    }

    /// `<cmp> [AND <cmp>]*`
    fn parse_condition(&mut self) -> Result<Condition> {
        let mut comparisons = vec![self.parse_comparison()?];

        loop {
            match self.current() {
                Token::And => {
                    self.advance();
                    comparisons.push(self.parse_comparison()?);
                }
                Token::Or => return Err(malformed("OR is not supported")),
                _ => break,
            }
        }

        if comparisons.len() == 1 {
            Ok(comparisons.remove(0))
        } else {
            Ok(Condition::And(comparisons))
        }
    }

    fn parse_comparison(&mut self) -> Result<Condition> {
        match self.current() {
            Token::LParen => return Err(malformed("parentheses are not supported in WHERE")),
            Token::Not => return Err(malformed("NOT is not supported in WHERE")),
            _ => {}
        }

        let column = self.parse_column_ref("column in WHERE")?;

        let op = match self.current() {
            Token::Eq => ComparisonOperator::Eq,
            Token::Neq => ComparisonOperator::Neq,
            Token::Lt => ComparisonOperator::Lt,
            Token::Gt => ComparisonOperator::Gt,
            Token::Lte => ComparisonOperator::Lte,
            Token::Gte => ComparisonOperator::Gte,
            other => {
                return Err(malformed(format!(
                    "expected comparison operator after '{}', found {}",
                    column, other
                )))
            }
        };
        self.advance();

        let value = self.parse_literal()?;

        Ok(Condition::Comparison(Comparison { column, op, value }))
    }

    // ========== Literals and Names ==========

    /// Quoted text, numbers, TRUE/FALSE, NULL, or a bare word taken as text
    fn parse_literal(&mut self) -> Result<Value> {
        let value = match self.current().clone() {
            Token::StringLiteral(s) => Value::Text(s),
            Token::IntegerLiteral(n) => Value::Integer(n),
            Token::FloatLiteral(n) => Value::Float(n),
            Token::True => Value::Boolean(true),
            Token::False => Value::Boolean(false),
            Token::Null => Value::Null,
            Token::Identifier(word) | Token::RawNumber(word) => Value::Text(word),
            other => return Err(malformed(format!("expected a value, found {}", other))),
        };
        self.advance();
        Ok(value)
    }

    /// `col` or `table.col`, returned verbatim
    fn parse_column_ref(&mut self, what: &str) -> Result<String> {
        let first = self.expect_identifier(what)?;
        if self.check(&Token::Dot) {
            self.advance();
            let column = self.expect_identifier(what)?;
            return Ok(format!("{}.{}", first, column));
        }
        Ok(first)
    }

    fn parse_identifier_list(&mut self, what: &str) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();

        loop {
            identifiers.push(self.expect_identifier(what)?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(malformed(format!(
                "expected {}, found {}",
                token,
                self.current()
            )))
        }
    }

    /// Names may be bare or quoted
    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) | Token::StringLiteral(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(malformed(format!("expected {}, found {}", what, other))),
        }
    }

    fn expect_integer(&mut self, what: &str) -> Result<i64> {
        match self.current().clone() {
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(n)
            }
            other => Err(malformed(format!("expected {}, found {}", what, other))),
        }
    }
}

fn malformed(message: impl Into<String>) -> Error {
    Error::MalformedStatement(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Result<Command> {
        Parser::new(sql)?.parse()
    }

    #[test]
    fn test_parse_simple_select() {
        match parse("SELECT * FROM users").unwrap() {
            Command::Select(s) => {
                assert_eq!(s.projection, Projection::All);
                assert_eq!(s.table_name, "users");
                assert!(s.join.is_none());
                assert!(s.where_clause.is_none());
            }
            _ => panic!("Expected SELECT"),
        }
    }

    #[test]
    fn test_parse_select_with_clauses() {
        let sql = "select users.name, age from users where age >= 18 and name != 'bob' \
                   order by age asc limit 10;";
        match parse(sql).unwrap() {
            Command::Select(s) => {
                assert_eq!(
                    s.projection,
                    Projection::Columns(vec!["users.name".to_string(), "age".to_string()])
                );
                let where_clause = s.where_clause.unwrap();
                let leaves = where_clause.comparisons();
                assert_eq!(leaves.len(), 2);
                assert_eq!(leaves[0].op, ComparisonOperator::Gte);
                assert_eq!(leaves[1].value, Value::Text("bob".to_string()));
                assert_eq!(s.order_by.as_deref(), Some("age"));
                assert_eq!(s.limit, Some(10));
            }
            _ => panic!("Expected SELECT"),
        }
    }

    #[test]
    fn test_parse_join() {
        let sql = "SELECT users.name, posts.title FROM users \
                   INNER JOIN posts ON users.id = posts.user_id WHERE users.id = 1";
        match parse(sql).unwrap() {
            Command::Select(s) => {
                let join = s.join.unwrap();
                assert_eq!(join.table_name, "posts");
                assert_eq!(
                    join.conditions,
                    vec![JoinCondition {
                        left: "users.id".to_string(),
                        right: "posts.user_id".to_string(),
                    }]
                );
                assert!(s.where_clause.is_some());
            }
            _ => panic!("Expected SELECT"),
        }
    }

    #[test]
    fn test_parse_create_table() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100) NOT NULL, \
                   email varchar(100) UNIQUE, score FLOAT, active BOOL NULL)";
        match parse(sql).unwrap() {
            Command::CreateTable(s) => {
                assert_eq!(s.table_name, "users");
                assert_eq!(s.columns.len(), 5);
                assert_eq!(s.columns[0].data_type, DataType::Integer);
                assert!(!s.columns[0].not_null);
                assert_eq!(s.columns[1].data_type, DataType::Varchar(Some(100)));
                assert!(s.columns[1].not_null);
                assert_eq!(s.columns[4].data_type, DataType::Boolean);
                assert_eq!(s.primary_key.as_deref(), Some("id"));
                assert_eq!(s.unique_columns, vec!["email".to_string()]);
            }
            _ => panic!("Expected CREATE TABLE"),
        }
    }

    #[test]
    fn test_second_primary_key_becomes_unique() {
        match parse("CREATE TABLE t (a INTEGER PRIMARY KEY, b INTEGER PRIMARY KEY)").unwrap() {
            Command::CreateTable(s) => {
                assert_eq!(s.primary_key.as_deref(), Some("a"));
                assert_eq!(s.unique_columns, vec!["b".to_string()]);
            }
            _ => panic!("Expected CREATE TABLE"),
        }
    }

    #[test]
    fn test_parse_insert() {
        match parse("INSERT INTO users (id, name) VALUES (1, 'John')").unwrap() {
            Command::Insert(s) => {
                assert_eq!(s.table_name, "users");
                assert_eq!(
                    s.columns,
                    Some(vec!["id".to_string(), "name".to_string()])
                );
                assert_eq!(s.values, vec![Value::Integer(1), Value::Text("John".into())]);
            }
            _ => panic!("Expected INSERT"),
        }

        match parse(r#"INSERT INTO t VALUES (2.5, TRUE, NULL, "dq", bare)"#).unwrap() {
            Command::Insert(s) => {
                assert_eq!(s.columns, None);
                assert_eq!(
                    s.values,
                    vec![
                        Value::Float(2.5),
                        Value::Boolean(true),
                        Value::Null,
                        Value::Text("dq".into()),
                        Value::Text("bare".into()),
                    ]
                );
            }
            _ => panic!("Expected INSERT"),
        }
    }

    #[test]
    fn test_oversized_integer_is_text() {
        match parse("INSERT INTO t VALUES (99999999999999999999, -5)").unwrap() {
            Command::Insert(s) => assert_eq!(
                s.values,
                vec![
                    Value::Text("99999999999999999999".into()),
                    Value::Integer(-5)
                ]
            ),
            _ => panic!("Expected INSERT"),
        }
    }

    #[test]
    fn test_insert_column_count_mismatch() {
        let result = parse("INSERT INTO users (id, name) VALUES (1)");
        assert!(matches!(
            result,
            Err(Error::ColumnCountMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_parse_update() {
        match parse("UPDATE users SET name = 'Jane', age = 30 WHERE id = 1").unwrap() {
            Command::Update(s) => {
                assert_eq!(s.table_name, "users");
                assert_eq!(s.assignments.len(), 2);
                assert_eq!(s.assignments[1].value, Value::Integer(30));
                assert!(s.where_clause.is_some());
            }
            _ => panic!("Expected UPDATE"),
        }
    }

    #[test]
    fn test_parse_delete_and_drop() {
        match parse("DELETE FROM users").unwrap() {
            Command::Delete(s) => {
                assert_eq!(s.table_name, "users");
                assert!(s.where_clause.is_none());
            }
            _ => panic!("Expected DELETE"),
        }

        match parse("drop table users;").unwrap() {
            Command::DropTable(s) => assert_eq!(s.table_name, "users"),
            _ => panic!("Expected DROP TABLE"),
        }
    }

    #[test]
    fn test_unsupported_command() {
        assert!(matches!(
            parse("ALTER TABLE users ADD x INTEGER"),
            Err(Error::UnsupportedCommand(verb)) if verb == "ALTER"
        ));
        assert!(matches!(parse(""), Err(Error::MalformedStatement(_))));
        assert!(matches!(parse("   ;"), Err(Error::MalformedStatement(_))));
    }

    #[test]
    fn test_malformed_statements() {
        let cases = [
            "SELECT * users",
            "SELECT * FROM a WHERE x = 1 OR y = 2",
            "SELECT * FROM a WHERE (x = 1)",
            "SELECT * FROM a ORDER BY x DESC",
            "SELECT * FROM a JOIN b ON a.id = b.id JOIN c ON b.id = c.id",
            "SELECT * FROM a LIMIT -1",
            "INSERT INTO a VALUES (1), (2)",
            "INSERT INTO a (x) VALUES",
            "CREATE TABLE a (x BLOB)",
            "CREATE TABLE a (x INTEGER(5))",
            "UPDATE a x = 1",
            "DELETE FROM",
            "SELECT * FROM a extra",
        ];

        for sql in cases {
            assert!(
                matches!(parse(sql), Err(Error::MalformedStatement(_))),
                "expected MalformedStatement for {sql}"
            );
        }
    }

    #[test]
    fn test_error_names_missing_piece() {
        let err = parse("SELECT * users").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed statement: expected FROM, found users"
        );

        let err = parse("DROP TABLE").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed statement: expected table name, found end of input"
        );
    }
}
