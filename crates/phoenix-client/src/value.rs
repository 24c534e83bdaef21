//! Values, result sets and metadata shared by all backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `java.sql.Types` codes reported by the Query Server in column signatures.
pub mod sql_types {
    pub const BOOLEAN: i32 = 16;
    pub const TINYINT: i32 = -6;
    pub const SMALLINT: i32 = 5;
    pub const INTEGER: i32 = 4;
    pub const BIGINT: i32 = -5;
    pub const FLOAT: i32 = 6;
    pub const DOUBLE: i32 = 8;
    pub const DECIMAL: i32 = 3;
    pub const CHAR: i32 = 1;
    pub const VARCHAR: i32 = 12;
    pub const DATE: i32 = 91;
    pub const TIME: i32 = 92;
    pub const TIMESTAMP: i32 = 93;
}

/// A single typed value, used both for parameters and for result cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Boolean(bool),
    Integer(i32),
    BigInt(i64),
    Double(f64),
    Varchar(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Varchar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(i64::from(*i)),
            SqlValue::BigInt(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "null"),
            SqlValue::Boolean(b) => write!(f, "{b}"),
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::BigInt(i) => write!(f, "{i}"),
            SqlValue::Double(d) => write!(f, "{d}"),
            SqlValue::Varchar(s) => write!(f, "{s}"),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Varchar(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Varchar(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

/// Nullability as reported by `ResultSetMetaData.isNullable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nullability {
    NoNulls,
    Nullable,
    Unknown,
}

impl From<i32> for Nullability {
    fn from(code: i32) -> Self {
        match code {
            0 => Nullability::NoNulls,
            1 => Nullability::Nullable,
            _ => Nullability::Unknown,
        }
    }
}

impl fmt::Display for Nullability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nullability::NoNulls => write!(f, "NO"),
            Nullability::Nullable => write!(f, "YES"),
            Nullability::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Description of one result-set column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub label: String,
    /// `java.sql.Types` code, see [`sql_types`].
    pub type_id: i32,
    pub type_name: String,
    pub table_name: String,
    pub schema_name: String,
    pub precision: i32,
    pub scale: i32,
    pub nullable: Nullability,
}

/// A fully materialised query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a column by name, case-insensitive like Phoenix identifiers.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name) || c.label.eq_ignore_ascii_case(name))
    }

    /// Value of a named column in a given row.
    pub fn get(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }
}

/// Filter for [`crate::Connection::tables`], mirroring
/// `DatabaseMetaData.getTables(catalog, schemaPattern, tableNamePattern, types)`.
///
/// Patterns use SQL `LIKE` syntax (`%` and `_`). `None` means "match all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    pub catalog: Option<String>,
    pub schema_pattern: Option<String>,
    pub table_pattern: Option<String>,
    pub table_types: Vec<String>,
}

impl TableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.schema_pattern = Some(pattern.into());
        self
    }

    pub fn table_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.table_pattern = Some(pattern.into());
        self
    }

    pub fn table_type(mut self, table_type: impl Into<String>) -> Self {
        self.table_types.push(table_type.into());
        self
    }
}

/// One row of the `getTables` metadata result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub table_type: String,
}

impl TableInfo {
    /// `schema.table`, or just `table` for the default schema.
    pub fn qualified_name(&self) -> String {
        match self.schema.as_deref() {
            Some(schema) if !schema.is_empty() => format!("{schema}.{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Match a value against a SQL `LIKE` pattern (`%` any run, `_` any one char).
///
/// Matching is case-insensitive since unquoted Phoenix identifiers are
/// upper-cased by the server.
pub fn like_match(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.to_ascii_uppercase().chars().collect();
    let value: Vec<char> = value.to_ascii_uppercase().chars().collect();

    let (mut p, mut v) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some(p);
            p += 1;
            resume = v;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            v = resume;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '%' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_match() {
        assert!(like_match("%", "anything"));
        assert!(like_match("DEMO%", "DEMO_AD"));
        assert!(like_match("demo%", "DEMO"));
        assert!(like_match("LOADTEST_%", "LOADTEST_1"));
        assert!(like_match("T_ST", "TEST"));
        assert!(!like_match("DEMO%", "SYSTEM"));
        assert!(!like_match("T_ST", "TEEST"));
        assert!(like_match("%AD", "DEMO_AD"));
        assert!(!like_match("", "x"));
        assert!(like_match("", ""));
    }

    #[test]
    fn test_qualified_name() {
        let t = TableInfo {
            catalog: None,
            schema: Some("DEMO".to_string()),
            name: "AAAA".to_string(),
            table_type: "TABLE".to_string(),
        };
        assert_eq!(t.qualified_name(), "DEMO.AAAA");

        let t = TableInfo {
            schema: Some(String::new()),
            ..t
        };
        assert_eq!(t.qualified_name(), "AAAA");
    }

    #[test]
    fn test_result_set_lookup() {
        let column = |name: &str| ColumnMetadata {
            name: name.to_string(),
            label: name.to_string(),
            type_id: sql_types::VARCHAR,
            type_name: "VARCHAR".to_string(),
            table_name: "TEST".to_string(),
            schema_name: String::new(),
            precision: 0,
            scale: 0,
            nullable: Nullability::Nullable,
        };
        let rs = ResultSet {
            columns: vec![column("MYKEY"), column("MYCOLUMN")],
            rows: vec![vec![SqlValue::Integer(1), SqlValue::from("Hello")]],
        };
        assert_eq!(rs.column_count(), 2);
        assert_eq!(rs.get(0, "mycolumn"), Some(&SqlValue::from("Hello")));
        assert_eq!(rs.get(1, "mycolumn"), None);
        assert_eq!(rs.get(0, "missing"), None);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(SqlValue::Integer(7).as_i64(), Some(7));
        assert_eq!(SqlValue::from("x").as_str(), Some("x"));
        assert!(SqlValue::Null.is_null());
        assert_eq!(Nullability::from(0), Nullability::NoNulls);
        assert_eq!(Nullability::from(2), Nullability::Unknown);
    }
}
