//! SQL templates for the load test tables.

use loadtest_generator::Row;
use phoenix_client::{ClientError, PreparedStatement, SqlValue};

/// Default prefix of the per-lane table names.
pub const DEFAULT_TABLE_PREFIX: &str = "loadtest_";

/// Default prefix of the per-lane tenant ids.
pub const DEFAULT_TENANT_PREFIX: &str = "test";

/// Number of `?` placeholders in the upsert.
pub const UPSERT_PARAMETER_COUNT: usize = 6;

/// Table written by lane `lane_id`.
pub fn table_name(prefix: &str, lane_id: usize) -> String {
    format!("{prefix}{lane_id}")
}

/// Tenant the consumer of lane `lane_id` connects as.
pub fn tenant_id(prefix: &str, lane_id: usize) -> String {
    format!("{prefix}{lane_id}")
}

/// Idempotent DDL for one lane table.
///
/// The table is salted and multi-tenant; `tenantid` is the leading primary
/// key column and is filled from the connection's tenant.
pub fn create_table_sql(table: &str) -> String {
    format!(
        "create table if not exists {table} (\
         tenantid varchar not null, \
         id bigint not null, \
         name varchar, \
         createts timestamp, \
         updatets timestamp, \
         sessionid bigint, \
         description varchar, \
         constraint pk primary key (tenantid, id, name)) \
         SALT_BUCKETS=3, MULTI_TENANT=true"
    )
}

/// Parameterised upsert of one row, without the tenant column.
pub fn upsert_sql(table: &str) -> String {
    format!(
        "upsert into {table} (id, name, createts, updatets, sessionid, description) \
         values (?,?,?,?,?,?)"
    )
}

/// The six upsert parameters of `row`, in placeholder order.
pub fn row_parameters(row: &Row) -> [SqlValue; UPSERT_PARAMETER_COUNT] {
    [
        SqlValue::BigInt(row.id),
        SqlValue::Varchar(row.name.clone()),
        SqlValue::Timestamp(row.created_at),
        SqlValue::Timestamp(row.updated_at),
        SqlValue::BigInt(row.session_id),
        SqlValue::Varchar(row.description.clone()),
    ]
}

/// Bind `row` to a statement prepared from [`upsert_sql`].
pub fn bind_row<S: PreparedStatement>(statement: &mut S, row: &Row) -> Result<(), ClientError> {
    for (i, value) in row_parameters(row).into_iter().enumerate() {
        statement.bind(i + 1, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadtest_generator::RowGenerator;

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("loadtest_0");

        assert!(sql.starts_with("create table if not exists loadtest_0 ("));
        assert!(sql.contains("tenantid varchar not null, id bigint not null, name varchar"));
        assert!(sql.contains("constraint pk primary key (tenantid, id, name))"));
        assert!(sql.ends_with("SALT_BUCKETS=3, MULTI_TENANT=true"));
    }

    #[test]
    fn test_upsert_sql() {
        let sql = upsert_sql("loadtest_1");
        assert_eq!(
            sql,
            "upsert into loadtest_1 (id, name, createts, updatets, sessionid, description) \
             values (?,?,?,?,?,?)"
        );
        assert_eq!(sql.matches('?').count(), UPSERT_PARAMETER_COUNT);
    }

    #[test]
    fn test_names() {
        assert_eq!(table_name(DEFAULT_TABLE_PREFIX, 3), "loadtest_3");
        assert_eq!(tenant_id(DEFAULT_TENANT_PREFIX, 3), "test3");
    }

    #[test]
    fn test_row_parameters_order() {
        let row = RowGenerator::new(7).generate(42);
        let params = row_parameters(&row);

        assert_eq!(params[0], SqlValue::BigInt(42));
        assert_eq!(params[1], SqlValue::Varchar(row.name.clone()));
        assert_eq!(params[2], SqlValue::Timestamp(row.created_at));
        assert_eq!(params[3], SqlValue::Timestamp(row.updated_at));
        assert_eq!(params[4], SqlValue::BigInt(row.session_id));
        assert_eq!(params[5], SqlValue::Varchar(row.description.clone()));
    }
}
