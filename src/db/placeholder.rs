//! Neutral placeholder rewriting.
//!
//! Callers write every statement with `?` as the positional placeholder. Before
//! dispatch each relational adapter rewrites them into its dialect. The scanner
//! walks the statement once and leaves string literals, quoted identifiers,
//! comments and dollar-quoted bodies untouched, so a `?` inside `'what?'` is
//! never treated as a parameter.

use crate::db::Dialect;
use crate::error::{DbError, DbResult};

/// A statement rewritten for one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenSql {
    pub sql: String,
    /// Number of placeholders found, in order of appearance.
    pub placeholders: usize,
    /// True when the statement has a `RETURNING` keyword outside literals.
    pub returning: bool,
}

/// Rewrite neutral placeholders and check they line up with `param_count`.
pub fn prepare(sql: &str, dialect: Dialect, param_count: usize) -> DbResult<RewrittenSql> {
    let rewritten = rewrite(sql, dialect);
    if rewritten.placeholders != param_count {
        return Err(DbError::invalid_input(format!(
            "Statement has {} placeholder(s) but {} parameter(s) were supplied",
            rewritten.placeholders, param_count
        )));
    }
    Ok(rewritten)
}

/// Rewrite neutral `?` placeholders into `dialect` placeholders.
pub fn rewrite(sql: &str, dialect: Dialect) -> RewrittenSql {
    let mut scanner = Scanner {
        chars: sql.chars().collect(),
        pos: 0,
        out: String::with_capacity(sql.len() + 16),
        dialect,
        placeholders: 0,
        returning: false,
    };
    scanner.run();
    RewrittenSql {
        sql: scanner.out,
        placeholders: scanner.placeholders,
        returning: scanner.returning,
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    out: String,
    dialect: Dialect,
    placeholders: usize,
    returning: bool,
}

impl Scanner {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek(0) {
            self.out.push(c);
            self.pos += 1;
        }
    }

    fn run(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                '\'' => self.quoted('\'', self.dialect.backslash_escapes()),
                '"' => self.quoted('"', false),
                '`' if self.dialect == Dialect::MySql => self.quoted('`', false),
                '-' if self.peek(1) == Some('-') => self.line_comment(),
                '#' if self.dialect == Dialect::MySql => self.line_comment(),
                '/' if self.peek(1) == Some('*') => self.block_comment(),
                '$' if self.dialect == Dialect::Postgres => self.dollar(),
                '?' => {
                    self.placeholders += 1;
                    let placeholder = self.dialect.placeholder(self.placeholders);
                    self.out.push_str(&placeholder);
                    self.pos += 1;
                }
                c if c.is_alphabetic() || c == '_' => self.word(),
                _ => self.bump(),
            }
        }
    }

    /// Copy a quoted run; a doubled quote character is an escaped quote.
    fn quoted(&mut self, quote: char, backslash: bool) {
        self.bump();
        while let Some(c) = self.peek(0) {
            if backslash && c == '\\' {
                self.bump();
                self.bump();
                continue;
            }
            self.bump();
            if c == quote {
                if self.peek(0) == Some(quote) {
                    self.bump();
                    continue;
                }
                return;
            }
        }
    }

    fn line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            self.bump();
            if c == '\n' {
                return;
            }
        }
    }

    fn block_comment(&mut self) {
        self.bump();
        self.bump();
        while self.peek(0).is_some() {
            if self.peek(0) == Some('*') && self.peek(1) == Some('/') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
    }

    /// `$$ body $$` and `$tag$ body $tag$`; anything else (`$1`) is copied as-is.
    fn dollar(&mut self) {
        let mut end = self.pos + 1;
        while let Some(c) = self.chars.get(end).copied() {
            if c.is_alphanumeric() || c == '_' {
                end += 1;
            } else {
                break;
            }
        }
        let tag_is_valid = self
            .chars
            .get(self.pos + 1)
            .is_some_and(|c| !c.is_ascii_digit());
        if self.chars.get(end) != Some(&'$') || !(tag_is_valid || end == self.pos + 1) {
            self.bump();
            return;
        }

        let delimiter: Vec<char> = self.chars[self.pos..=end].to_vec();
        for _ in 0..delimiter.len() {
            self.bump();
        }
        while self.peek(0).is_some() {
            if self.chars[self.pos..].starts_with(&delimiter) {
                for _ in 0..delimiter.len() {
                    self.bump();
                }
                return;
            }
            self.bump();
        }
    }

    fn word(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            let continues = c.is_alphanumeric()
                || c == '_'
                || (c == '$' && self.dialect == Dialect::Postgres);
            if !continues {
                break;
            }
            self.bump();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        if word.eq_ignore_ascii_case("returning") {
            self.returning = true;
        }
        // Postgres escape string: E'it\'s'
        if self.dialect == Dialect::Postgres
            && word.eq_ignore_ascii_case("e")
            && self.peek(0) == Some('\'')
        {
            self.quoted('\'', true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_numbering_past_nine() {
        let sql = format!(
            "INSERT INTO t VALUES ({})",
            vec!["?"; 12].join(", ")
        );
        let out = rewrite(&sql, Dialect::Postgres);
        assert_eq!(out.placeholders, 12);
        assert!(out.sql.contains("$9, $10, $11, $12"));
        assert!(!out.sql.contains('?'));
    }

    #[test]
    fn test_mysql_and_sqlite_keep_question_marks() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = ?";
        assert_eq!(rewrite(sql, Dialect::MySql).sql, sql);
        assert_eq!(rewrite(sql, Dialect::SQLite).sql, sql);
        assert_eq!(rewrite(sql, Dialect::SQLite).placeholders, 2);
    }

    #[test]
    fn test_string_literals_are_skipped() {
        let out = rewrite(
            "SELECT 'what?', 'it''s ?' FROM t WHERE a = ?",
            Dialect::Postgres,
        );
        assert_eq!(out.sql, "SELECT 'what?', 'it''s ?' FROM t WHERE a = $1");
        assert_eq!(out.placeholders, 1);
    }

    #[test]
    fn test_quoted_identifiers_and_comments_are_skipped() {
        let out = rewrite(
            "SELECT \"col?\" FROM t -- trailing ?\nWHERE a = ? /* ? */ AND b = ?",
            Dialect::Postgres,
        );
        assert_eq!(
            out.sql,
            "SELECT \"col?\" FROM t -- trailing ?\nWHERE a = $1 /* ? */ AND b = $2"
        );

        let out = rewrite("SELECT `x?` FROM t # note?\nWHERE a = ?", Dialect::MySql);
        assert_eq!(out.placeholders, 1);
    }

    #[test]
    fn test_mysql_backslash_escape() {
        let out = rewrite(r"SELECT 'a\'?' , ?", Dialect::MySql);
        assert_eq!(out.placeholders, 1);
        // Standard SQL: backslash is a plain character, the quote ends the literal.
        let out = rewrite(r"SELECT 'a\', ?", Dialect::SQLite);
        assert_eq!(out.placeholders, 1);
    }

    #[test]
    fn test_postgres_dollar_quoting() {
        let out = rewrite(
            "CREATE FUNCTION f() RETURNS int AS $$ SELECT ? $$ LANGUAGE sql; SELECT ?",
            Dialect::Postgres,
        );
        assert_eq!(out.placeholders, 1);
        assert!(out.sql.ends_with("SELECT $1"));

        let out = rewrite("SELECT $body$ ? $body$, ?", Dialect::Postgres);
        assert_eq!(out.placeholders, 1);
        assert!(out.sql.ends_with(", $1"));
    }

    #[test]
    fn test_existing_positional_markers_untouched() {
        let out = rewrite("SELECT $1", Dialect::Postgres);
        assert_eq!(out.sql, "SELECT $1");
        assert_eq!(out.placeholders, 0);
    }

    #[test]
    fn test_postgres_escape_string() {
        let out = rewrite(r"SELECT E'it\'s ?', ?", Dialect::Postgres);
        assert_eq!(out.placeholders, 1);
    }

    #[test]
    fn test_returning_detection() {
        assert!(rewrite("INSERT INTO t (a) VALUES (?) RETURNING id", Dialect::SQLite).returning);
        assert!(!rewrite("INSERT INTO t (a) VALUES ('returning')", Dialect::SQLite).returning);
        assert!(!rewrite("UPDATE t SET returning_flag = 1", Dialect::Postgres).returning);
    }

    #[test]
    fn test_prepare_checks_parameter_count() {
        assert!(prepare("SELECT ?", Dialect::SQLite, 1).is_ok());
        let err = prepare("SELECT ?, ?", Dialect::SQLite, 1).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[test]
    fn test_unterminated_literal_does_not_panic() {
        let out = rewrite("SELECT 'abc ?", Dialect::Postgres);
        assert_eq!(out.placeholders, 0);
        let out = rewrite("SELECT $$ ?", Dialect::Postgres);
        assert_eq!(out.placeholders, 0);
        let out = rewrite("SELECT /* ?", Dialect::MySql);
        assert_eq!(out.placeholders, 0);
    }
}
