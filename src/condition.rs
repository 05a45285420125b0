//! Backend-neutral filter, sort and pagination translation.
//!
//! A [`Condition`] is an ordered list of `field <op> value` predicates, AND-ed
//! together. It renders either as a relational fragment with neutral `?`
//! placeholders (ready for [`Adapter::query`](crate::db::Adapter::query)) or as a
//! native document filter.
//!
//! Placeholders and parameters are always emitted in the same traversal order,
//! which is the insertion order of the predicates.
//!
//! ```
//! use dbkit::condition::{Condition, FindOptions, SortDirection};
//! use dbkit::db::Dialect;
//!
//! let condition = Condition::new().gt("age", 20);
//! let options = FindOptions::new().sort("age", SortDirection::Desc).limit(3);
//! let stmt = dbkit::condition::select_statement(Dialect::Postgres, "users", &[], &condition, &options);
//! assert_eq!(stmt.text, r#"SELECT * FROM "users" WHERE "age" > ? ORDER BY "age" DESC LIMIT 3"#);
//! assert_eq!(stmt.params.len(), 1);
//! ```

use crate::config::BackendKind;
use crate::db::Dialect;
use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use serde_json::{Map, Value as JsonValue};

/// Comparison operators understood by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Like,
}

impl Operator {
    /// Parse an operator key; the `$` prefix is optional.
    pub fn parse(key: &str) -> Option<Self> {
        match key.strip_prefix('$').unwrap_or(key) {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            "like" => Some(Self::Like),
            _ => None,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "IN",
            Self::Like => "LIKE",
        }
    }

    fn document_key(&self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::Like => "$regex",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    One(QueryParam),
    Many(Vec<QueryParam>),
}

/// One `field <op> value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    operand: Operand,
}

impl Predicate {
    /// Values bound by this predicate, in placeholder order.
    pub fn values(&self) -> &[QueryParam] {
        match &self.operand {
            Operand::One(value) => std::slice::from_ref(value),
            Operand::Many(values) => values,
        }
    }
}

/// A statement or command paired with its positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub text: String,
    pub params: Vec<QueryParam>,
}

/// Ordered conjunction of predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    predicates: Vec<Predicate>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, field: impl Into<String>, op: Operator, operand: Operand) -> Self {
        self.predicates.push(Predicate {
            field: field.into(),
            op,
            operand,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.push(field, Operator::Eq, Operand::One(value.into()))
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.push(field, Operator::Ne, Operand::One(value.into()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.push(field, Operator::Gt, Operand::One(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.push(field, Operator::Gte, Operand::One(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.push(field, Operator::Lt, Operand::One(value.into()))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.push(field, Operator::Lte, Operand::One(value.into()))
    }

    pub fn is_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<QueryParam>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(field, Operator::In, Operand::Many(values))
    }

    /// SQL `LIKE` pattern (`%` and `_` wildcards).
    pub fn like(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.push(
            field,
            Operator::Like,
            Operand::One(QueryParam::String(pattern.into())),
        )
    }

    /// Parse a condition object, keeping its key order.
    ///
    /// A field maps to a literal (equality) or to an object of operators:
    ///
    /// ```text
    /// {"status": "active", "age": {"gte": 18, "lt": 65}, "role": {"$in": ["a", "b"]}}
    /// ```
    pub fn from_json(value: &JsonValue) -> DbResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| DbError::invalid_input("Condition must be a JSON object"))?;

        let mut condition = Self::new();
        for (field, spec) in object {
            let JsonValue::Object(ops) = spec else {
                condition = condition.eq(field.as_str(), spec.clone());
                continue;
            };
            if ops.is_empty() {
                return Err(DbError::invalid_input(format!(
                    "Condition for field '{}' has no operators",
                    field
                )));
            }
            for (key, operand) in ops {
                let op = Operator::parse(key).ok_or_else(|| {
                    DbError::invalid_input(format!(
                        "Unknown operator '{}' for field '{}'",
                        key, field
                    ))
                })?;
                condition = match op {
                    Operator::In => {
                        let JsonValue::Array(items) = operand else {
                            return Err(DbError::invalid_input(format!(
                                "Operator 'in' for field '{}' needs an array",
                                field
                            )));
                        };
                        condition.is_in(field.as_str(), items.iter().cloned())
                    }
                    Operator::Like => {
                        let JsonValue::String(pattern) = operand else {
                            return Err(DbError::invalid_input(format!(
                                "Operator 'like' for field '{}' needs a string",
                                field
                            )));
                        };
                        condition.like(field.as_str(), pattern.as_str())
                    }
                    op => condition.push(
                        field.as_str(),
                        op,
                        Operand::One(QueryParam::from(operand.clone())),
                    ),
                };
            }
        }
        Ok(condition)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render the predicate expression (no `WHERE` keyword). Empty when unconditioned.
    pub fn to_sql(&self, dialect: Dialect) -> Statement {
        let mut params = Vec::new();
        let parts: Vec<String> = self
            .predicates
            .iter()
            .map(|predicate| render_predicate(dialect, predicate, &mut params))
            .collect();
        Statement {
            text: parts.join(" AND "),
            params,
        }
    }

    /// `WHERE ...` fragment, or an empty statement when unconditioned.
    pub fn where_clause(&self, dialect: Dialect) -> Statement {
        let mut stmt = self.to_sql(dialect);
        if !stmt.text.is_empty() {
            stmt.text.insert_str(0, "WHERE ");
        }
        stmt
    }

    /// Native document filter with the given find options.
    pub fn to_document(&self, options: &FindOptions) -> DocumentQuery {
        DocumentQuery::build(self, options)
    }

    /// Build a complete read for `backend`: a SELECT for relational backends,
    /// a `find` command for the document backend.
    pub fn translate(
        &self,
        backend: BackendKind,
        table: &str,
        options: &FindOptions,
    ) -> Statement {
        match Dialect::for_backend(backend) {
            Some(dialect) => select_statement(dialect, table, &[], self, options),
            None => self.to_document(options).find_statement(table),
        }
    }
}

fn render_predicate(dialect: Dialect, predicate: &Predicate, params: &mut Vec<QueryParam>) -> String {
    let column = quote_path(dialect, &predicate.field);
    match (&predicate.op, &predicate.operand) {
        (Operator::Eq, Operand::One(QueryParam::Null)) => format!("{} IS NULL", column),
        (Operator::Ne, Operand::One(QueryParam::Null)) => format!("{} IS NOT NULL", column),
        (Operator::In, Operand::Many(values)) if values.is_empty() => "1 = 0".to_string(),
        (op, Operand::Many(values)) => {
            params.extend(values.iter().cloned());
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("{} {} ({})", column, op.sql(), placeholders)
        }
        (op, Operand::One(value)) => {
            params.push(value.clone());
            format!("{} {} ?", column, op.sql())
        }
    }
}

/// Quote a possibly dotted identifier (`schema.table`) part by part.
fn quote_path(dialect: Dialect, path: &str) -> String {
    path.split('.')
        .map(|part| dialect.quote_identifier(part))
        .collect::<Vec<_>>()
        .join(".")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse `asc`/`desc` (any case) or `1`/`-1`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) if s.eq_ignore_ascii_case("asc") => Some(Self::Asc),
            JsonValue::String(s) if s.eq_ignore_ascii_case("desc") => Some(Self::Desc),
            JsonValue::Number(n) => match n.as_i64() {
                Some(1) => Some(Self::Asc),
                Some(-1) => Some(Self::Desc),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Sort and pagination.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub sort: Vec<(String, SortDirection)>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Parse `{"sort": {"age": "desc"}, "limit": 3, "skip": 10}`.
    pub fn from_json(value: &JsonValue) -> DbResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| DbError::invalid_input("Find options must be a JSON object"))?;

        let mut options = Self::new();
        for (key, value) in object {
            match key.as_str() {
                "sort" => {
                    let sort = value.as_object().ok_or_else(|| {
                        DbError::invalid_input("`sort` must map fields to asc or desc")
                    })?;
                    for (field, direction) in sort {
                        let direction = SortDirection::from_json(direction).ok_or_else(|| {
                            DbError::invalid_input(format!(
                                "Invalid sort direction for field '{}'",
                                field
                            ))
                        })?;
                        options.sort.push((field.clone(), direction));
                    }
                }
                "limit" => options.limit = Some(non_negative(key, value)?),
                "skip" | "offset" => options.skip = Some(non_negative(key, value)?),
                other => {
                    return Err(DbError::invalid_input(format!(
                        "Unknown find option '{}'",
                        other
                    )));
                }
            }
        }
        Ok(options)
    }

    /// `ORDER BY`, `LIMIT` and `OFFSET` fragments, in that order, space separated.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut parts = Vec::new();
        if !self.sort.is_empty() {
            let order: Vec<String> = self
                .sort
                .iter()
                .map(|(field, direction)| {
                    let keyword = match direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{} {}", quote_path(dialect, field), keyword)
                })
                .collect();
            parts.push(format!("ORDER BY {}", order.join(", ")));
        }
        match (self.limit, self.skip, dialect.unbounded_limit()) {
            (Some(limit), _, _) => parts.push(format!("LIMIT {}", limit)),
            (None, Some(_), Some(unbounded)) => parts.push(format!("LIMIT {}", unbounded)),
            _ => {}
        }
        if let Some(skip) = self.skip {
            parts.push(format!("OFFSET {}", skip));
        }
        parts.join(" ")
    }
}

fn non_negative(key: &str, value: &JsonValue) -> DbResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| DbError::invalid_input(format!("`{}` must be a non-negative integer", key)))
}

/// Build `SELECT <columns> FROM <table> [WHERE ..] [ORDER BY ..] [LIMIT ..] [OFFSET ..]`.
///
/// An empty `columns` slice selects `*`.
pub fn select_statement(
    dialect: Dialect,
    table: &str,
    columns: &[&str],
    condition: &Condition,
    options: &FindOptions,
) -> Statement {
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|column| quote_path(dialect, column))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut text = format!("SELECT {} FROM {}", projection, quote_path(dialect, table));
    let filter = condition.where_clause(dialect);
    if !filter.text.is_empty() {
        text.push(' ');
        text.push_str(&filter.text);
    }
    let tail = options.to_sql(dialect);
    if !tail.is_empty() {
        text.push(' ');
        text.push_str(&tail);
    }
    Statement {
        text,
        params: filter.params,
    }
}

/// Convert a `LIKE` pattern into an anchored regular expression.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^'
            | '$' => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }
    regex.push('$');
    regex
}

fn render_operand(operand: &Operand, emit: &mut dyn FnMut(&QueryParam) -> JsonValue) -> JsonValue {
    match operand {
        Operand::One(value) => emit(value),
        Operand::Many(values) => JsonValue::Array(values.iter().map(|value| emit(value)).collect()),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FieldFilter {
    Equals(QueryParam),
    Operators(Vec<(&'static str, Operand)>),
}

/// Native document rendering of a condition plus find options.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    fields: Vec<(String, FieldFilter)>,
    /// Predicates that collide with an operator already set on the same field.
    overflow: Vec<(String, &'static str, Operand)>,
    sort: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    skip: Option<u64>,
}

impl DocumentQuery {
    fn build(condition: &Condition, options: &FindOptions) -> Self {
        let mut fields: Vec<(String, FieldFilter)> = Vec::new();
        let mut overflow = Vec::new();

        for predicate in &condition.predicates {
            let key = predicate.op.document_key();
            let operand = match (&predicate.op, &predicate.operand) {
                (Operator::Like, Operand::One(QueryParam::String(pattern))) => {
                    Operand::One(QueryParam::String(like_to_regex(pattern)))
                }
                (_, operand) => operand.clone(),
            };

            let existing = fields.iter_mut().find(|(field, _)| *field == predicate.field);
            match existing {
                None => {
                    let filter = match (predicate.op, operand) {
                        // Object values would be read as operator documents
                        (Operator::Eq, Operand::One(value @ QueryParam::Json(_))) => {
                            FieldFilter::Operators(vec![("$eq", Operand::One(value))])
                        }
                        (Operator::Eq, Operand::One(value)) => FieldFilter::Equals(value),
                        (_, operand) => FieldFilter::Operators(vec![(key, operand)]),
                    };
                    fields.push((predicate.field.clone(), filter));
                }
                Some((_, filter)) => {
                    if let FieldFilter::Equals(value) = filter {
                        *filter =
                            FieldFilter::Operators(vec![("$eq", Operand::One(value.clone()))]);
                    }
                    if let FieldFilter::Operators(ops) = filter {
                        if ops.iter().any(|(k, _)| *k == key) {
                            overflow.push((predicate.field.clone(), key, operand));
                        } else {
                            ops.push((key, operand));
                        }
                    }
                }
            }
        }

        Self {
            fields,
            overflow,
            sort: options.sort.clone(),
            limit: options.limit,
            skip: options.skip,
        }
    }

    fn render_filter(&self, emit: &mut dyn FnMut(&QueryParam) -> JsonValue) -> Map<String, JsonValue> {
        let mut filter = Map::new();
        for (field, field_filter) in &self.fields {
            let value = match field_filter {
                FieldFilter::Equals(value) => emit(value),
                FieldFilter::Operators(ops) => {
                    let mut doc = Map::new();
                    for (key, operand) in ops {
                        doc.insert((*key).to_string(), render_operand(operand, emit));
                    }
                    JsonValue::Object(doc)
                }
            };
            filter.insert(field.clone(), value);
        }

        if !self.overflow.is_empty() {
            let extra: Vec<JsonValue> = self
                .overflow
                .iter()
                .map(|(field, key, operand)| {
                    let mut inner = Map::new();
                    inner.insert((*key).to_string(), render_operand(operand, emit));
                    let mut outer = Map::new();
                    outer.insert(field.clone(), JsonValue::Object(inner));
                    JsonValue::Object(outer)
                })
                .collect();
            filter.insert("$and".to_string(), JsonValue::Array(extra));
        }
        filter
    }

    /// Filter document with values inline.
    pub fn filter(&self) -> JsonValue {
        JsonValue::Object(self.render_filter(&mut |value| value.to_json()))
    }

    /// Sort document (`1` ascending, `-1` descending), if any.
    pub fn sort(&self) -> Option<JsonValue> {
        if self.sort.is_empty() {
            return None;
        }
        let sort: Map<String, JsonValue> = self
            .sort
            .iter()
            .map(|(field, direction)| {
                let order = match direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                };
                (field.clone(), JsonValue::from(order))
            })
            .collect();
        Some(JsonValue::Object(sort))
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    fn command(&self, collection: &str, filter: Map<String, JsonValue>) -> JsonValue {
        let mut command = Map::new();
        command.insert("find".to_string(), JsonValue::from(collection));
        command.insert("filter".to_string(), JsonValue::Object(filter));
        if let Some(sort) = self.sort() {
            command.insert("sort".to_string(), sort);
        }
        if let Some(skip) = self.skip {
            command.insert("skip".to_string(), JsonValue::from(skip));
        }
        if let Some(limit) = self.limit {
            command.insert("limit".to_string(), JsonValue::from(limit));
        }
        JsonValue::Object(command)
    }

    /// `find` command with values inline.
    pub fn find_command(&self, collection: &str) -> JsonValue {
        self.command(collection, self.render_filter(&mut |value| value.to_json()))
    }

    /// `find` command with a `"?"` placeholder per value and the matching parameters.
    pub fn find_statement(&self, collection: &str) -> Statement {
        let mut params = Vec::new();
        let filter = self.render_filter(&mut |value| {
            params.push(value.clone());
            JsonValue::from("?")
        });
        Statement {
            text: self.command(collection, filter).to_string(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gt_with_sort_and_limit() {
        let condition = Condition::from_json(&json!({"age": {"gt": 20}})).unwrap();
        let options = FindOptions::new().sort("age", SortDirection::Desc).limit(3);
        let stmt = select_statement(Dialect::MySql, "users", &[], &condition, &options);
        assert_eq!(
            stmt.text,
            "SELECT * FROM `users` WHERE `age` > ? ORDER BY `age` DESC LIMIT 3"
        );
        assert_eq!(stmt.params, vec![QueryParam::Int(20)]);
    }

    #[test]
    fn test_params_follow_key_order() {
        let condition = Condition::from_json(&json!({
            "name": "ann",
            "age": {"$gte": 18, "lt": 65},
            "role": {"in": ["admin", "staff"]},
        }))
        .unwrap();
        let stmt = condition.where_clause(Dialect::SQLite);
        assert_eq!(
            stmt.text,
            r#"WHERE "name" = ? AND "age" >= ? AND "age" < ? AND "role" IN (?, ?)"#
        );
        assert_eq!(
            stmt.params,
            vec![
                QueryParam::from("ann"),
                QueryParam::Int(18),
                QueryParam::Int(65),
                QueryParam::from("admin"),
                QueryParam::from("staff"),
            ]
        );
    }

    #[test]
    fn test_null_and_empty_in() {
        let condition = Condition::new()
            .eq("deleted_at", QueryParam::Null)
            .ne("email", QueryParam::Null)
            .is_in("id", Vec::<i64>::new());
        let stmt = condition.to_sql(Dialect::Postgres);
        assert_eq!(
            stmt.text,
            r#""deleted_at" IS NULL AND "email" IS NOT NULL AND 1 = 0"#
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = Condition::from_json(&json!({"age": {"between": [1, 2]}})).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert!(Condition::from_json(&json!({"id": {"in": 3}})).is_err());
        assert!(Condition::from_json(&json!([1])).is_err());
    }

    #[test]
    fn test_offset_without_limit() {
        let options = FindOptions::new().skip(5);
        assert_eq!(options.to_sql(Dialect::Postgres), "OFFSET 5");
        assert_eq!(
            options.to_sql(Dialect::MySql),
            "LIMIT 18446744073709551615 OFFSET 5"
        );
        assert_eq!(options.to_sql(Dialect::SQLite), "LIMIT -1 OFFSET 5");
    }

    #[test]
    fn test_identifier_quoting() {
        let condition = Condition::new().eq("we\"ird", 1);
        assert_eq!(
            condition.to_sql(Dialect::Postgres).text,
            r#""we""ird" = ?"#
        );
        let stmt = select_statement(
            Dialect::Postgres,
            "app.users",
            &["id", "name"],
            &Condition::new(),
            &FindOptions::new(),
        );
        assert_eq!(stmt.text, r#"SELECT "id", "name" FROM "app"."users""#);
    }

    #[test]
    fn test_document_filter_wraps_json_equality() {
        let condition = Condition::new()
            .eq("profile", json!({"$ne": null}))
            .eq("name", "bob");
        let query = condition.to_document(&FindOptions::new());
        assert_eq!(
            query.filter(),
            json!({
                "profile": {"$eq": {"$ne": null}},
                "name": "bob",
            })
        );

        let sql = condition.to_sql(Dialect::Postgres);
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn test_document_filter() {
        let condition = Condition::new()
            .gt("age", 20)
            .eq("status", "active")
            .lt("age", 65)
            .like("name", "a%_b.");
        let query = condition.to_document(&FindOptions::new().sort("age", SortDirection::Desc).limit(3));
        assert_eq!(
            query.filter(),
            json!({
                "age": {"$gt": 20, "$lt": 65},
                "status": "active",
                "name": {"$regex": "^a.*.b\\.$"},
            })
        );
        assert_eq!(query.sort(), Some(json!({"age": -1})));
        assert_eq!(
            query.find_command("users"),
            json!({
                "find": "users",
                "filter": query.filter(),
                "sort": {"age": -1},
                "limit": 3,
            })
        );
    }

    #[test]
    fn test_document_statement_placeholders_follow_document_order() {
        let condition = Condition::new().gt("age", 20).eq("status", "?").lt("age", 65);
        let stmt = condition
            .to_document(&FindOptions::new())
            .find_statement("users");
        let command: JsonValue = serde_json::from_str(&stmt.text).unwrap();
        assert_eq!(
            command["filter"],
            json!({"age": {"$gt": "?", "$lt": "?"}, "status": "?"})
        );
        assert_eq!(
            stmt.params,
            vec![QueryParam::Int(20), QueryParam::Int(65), QueryParam::from("?")]
        );
    }

    #[test]
    fn test_repeated_operator_goes_to_and() {
        let condition = Condition::new().ne("tag", "a").ne("tag", "b").eq("x", 1).eq("x", 2);
        let filter = condition.to_document(&FindOptions::new()).filter();
        assert_eq!(
            filter,
            json!({
                "tag": {"$ne": "a"},
                "x": {"$eq": 1},
                "$and": [{"tag": {"$ne": "b"}}, {"x": {"$eq": 2}}],
            })
        );
    }

    #[test]
    fn test_translate_dispatches_on_backend() {
        let condition = Condition::new().eq("id", 7);
        let sql = condition.translate(BackendKind::Postgres, "users", &FindOptions::new());
        assert_eq!(sql.text, r#"SELECT * FROM "users" WHERE "id" = ?"#);
        let doc = condition.translate(BackendKind::Mongo, "users", &FindOptions::new());
        assert!(doc.text.starts_with(r#"{"find":"users""#));
        assert_eq!(doc.params, vec![QueryParam::Int(7)]);
    }

    #[test]
    fn test_find_options_from_json() {
        let options =
            FindOptions::from_json(&json!({"sort": {"age": "DESC", "name": 1}, "limit": 3, "skip": 6}))
                .unwrap();
        assert_eq!(
            options.sort,
            vec![
                ("age".to_string(), SortDirection::Desc),
                ("name".to_string(), SortDirection::Asc)
            ]
        );
        assert_eq!(options.limit, Some(3));
        assert_eq!(options.skip, Some(6));
        assert!(FindOptions::from_json(&json!({"limit": -1})).is_err());
    }
}
