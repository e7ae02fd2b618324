//! Catalog queries per engine.

use tablecat_domain::Engine;

use super::value::SqlValue;

/// Statement and bound parameters listing up to `limit` tables from the
/// engine's catalog, as `(table_id, table_name)` pairs in catalog order.
pub fn query_list_tables(engine: Engine, limit: i64) -> (&'static str, Vec<SqlValue>) {
    let sql = match engine {
        Engine::Postgresql => {
            "SELECT
                oid::bigint AS table_id,
                relname::text AS table_name
            FROM
                pg_class
            LIMIT
                $1"
        }
        Engine::Mysql => {
            "SELECT
                ROW_NUMBER() OVER () AS table_id,
                t.TABLE_NAME AS table_name
            FROM
                information_schema.tables AS t
            WHERE
                t.TABLE_SCHEMA = DATABASE()
            LIMIT
                ?"
        }
    };
    (sql, vec![SqlValue::Int(limit)])
}
