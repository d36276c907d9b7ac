//! SQL Token definitions
//!
//! This module defines all tokens that can appear in SQL statements.

use std::fmt;

/// SQL Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    Create,
    Drop,
    Table,

    Select,
    Insert,
    Update,
    Delete,
    Into,
    Values,
    Set,
    From,
    Where,

    And,
    Or,
    Not,
    On,
    Join,
    Inner,

    Order,
    By,
    Asc,
    Desc,
    Limit,

    Primary,
    Key,
    Unique,
    Null,

    True,
    False,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single- or double-quoted)
    StringLiteral(String),
    /// Identifier (table name, column name, type name, bare word)
    Identifier(String),
    /// Number too large to parse, kept as written
    RawNumber(String),

    // ========== Operators ==========
    /// =
    Eq,
    /// <> or !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// -
    Minus,
    /// *
    Asterisk,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // ========== Special ==========
    /// End of input
    Eof,
}

/// Keyword spellings, matched case-insensitively
const KEYWORDS: &[(&str, Token)] = &[
    ("CREATE", Token::Create),
    ("DROP", Token::Drop),
    ("TABLE", Token::Table),
    ("SELECT", Token::Select),
    ("INSERT", Token::Insert),
    ("UPDATE", Token::Update),
    ("DELETE", Token::Delete),
    ("INTO", Token::Into),
    ("VALUES", Token::Values),
    ("SET", Token::Set),
    ("FROM", Token::From),
    ("WHERE", Token::Where),
    ("AND", Token::And),
    ("OR", Token::Or),
    ("NOT", Token::Not),
    ("ON", Token::On),
    ("JOIN", Token::Join),
    ("INNER", Token::Inner),
    ("ORDER", Token::Order),
    ("BY", Token::By),
    ("ASC", Token::Asc),
    ("DESC", Token::Desc),
    ("LIMIT", Token::Limit),
    ("PRIMARY", Token::Primary),
    ("KEY", Token::Key),
    ("UNIQUE", Token::Unique),
    ("NULL", Token::Null),
    ("TRUE", Token::True),
    ("FALSE", Token::False),
];

impl Token {
    /// Try to parse a keyword from a word
    pub fn from_keyword(word: &str) -> Option<Token> {
        KEYWORDS
            .iter()
            .find(|(spelling, _)| spelling.eq_ignore_ascii_case(word))
            .map(|(_, token)| token.clone())
    }

    /// Upper-case spelling if this token is a keyword
    pub fn keyword(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, token)| token == self)
            .map(|(spelling, _)| *spelling)
    }

    /// Check if this token starts a statement
    pub fn is_verb(&self) -> bool {
        matches!(
            self,
            Token::Create
                | Token::Drop
                | Token::Select
                | Token::Insert
                | Token::Update
                | Token::Delete
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Token::IntegerLiteral(n) => return write!(f, "{}", n),
            Token::FloatLiteral(n) => return write!(f, "{}", n),
            Token::StringLiteral(s) => return write!(f, "'{}'", s),
            Token::Identifier(s) => return f.write_str(s),
            Token::RawNumber(s) => return f.write_str(s),
            Token::Eq => "=",
            Token::Neq => "<>",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Lte => "<=",
            Token::Gte => ">=",
            Token::Minus => "-",
            Token::Asterisk => "*",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Dot => ".",
            Token::Eof => "end of input",
            keyword => keyword.keyword().unwrap_or("?"),
        };
        f.write_str(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parsing() {
        assert_eq!(Token::from_keyword("SELECT"), Some(Token::Select));
        assert_eq!(Token::from_keyword("select"), Some(Token::Select));
        assert_eq!(Token::from_keyword("SeLeCt"), Some(Token::Select));
        assert_eq!(Token::from_keyword("integer"), None);
        assert_eq!(Token::from_keyword("unknown"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::Primary.to_string(), "PRIMARY");
        assert_eq!(Token::Primary.keyword(), Some("PRIMARY"));
        assert_eq!(Token::Neq.to_string(), "<>");
        assert_eq!(Token::StringLiteral("a b".into()).to_string(), "'a b'");
        assert_eq!(Token::Eof.to_string(), "end of input");
        assert_eq!(Token::Comma.keyword(), None);
    }

    #[test]
    fn test_is_verb() {
        assert!(Token::Select.is_verb());
        assert!(Token::Drop.is_verb());
        assert!(!Token::Table.is_verb());
        assert!(!Token::IntegerLiteral(42).is_verb());
    }
}
