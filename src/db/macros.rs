//! Relational dialects and dispatch macros.
//!
//! `Dialect` carries the per-engine SQL differences (placeholder syntax,
//! identifier quoting, LIMIT/OFFSET quirks). The macro below expands the
//! repetitive `match` over pool variants at compile time.

use crate::config::BackendKind;

/// SQL dialect of a relational backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    SQLite,
}

impl Dialect {
    /// Dialect for a backend kind; `None` for the document backend.
    pub fn for_backend(backend: BackendKind) -> Option<Self> {
        match backend {
            BackendKind::Postgres => Some(Self::Postgres),
            BackendKind::MySql => Some(Self::MySql),
            BackendKind::Sqlite => Some(Self::SQLite),
            BackendKind::Mongo => None,
        }
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            Self::Postgres => BackendKind::Postgres,
            Self::MySql => BackendKind::MySql,
            Self::SQLite => BackendKind::Sqlite,
        }
    }

    /// Native placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::MySql | Self::SQLite => "?".to_string(),
        }
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
            Self::Postgres | Self::SQLite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// LIMIT literal used when only an OFFSET was requested.
    pub fn unbounded_limit(&self) -> Option<&'static str> {
        match self {
            Self::Postgres => None,
            Self::MySql => Some("18446744073709551615"),
            Self::SQLite => Some("-1"),
        }
    }

    /// Whether backslash escapes inside string literals.
    pub(crate) fn backslash_escapes(&self) -> bool {
        matches!(self, Self::MySql)
    }
}

/// Macro for generating relational dispatch match arms.
///
/// This macro generates match arms for `DbPool` (or `DbTransaction`) variants,
/// reducing the need to manually write repetitive match statements.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbPool, pool, p => p.close().await);
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($enum:ident, $value:expr, $p:ident => $body:expr) => {
        match $value {
            $enum::MySql($p) => $body,
            $enum::Postgres($p) => $body,
            $enum::SQLite($p) => $body,
        }
    };
}

pub use impl_db_dispatch;
