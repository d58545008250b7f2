//! SQL statement building for the relational backend
//!
//! Every resource table has the same layout:
//!
//! | column | type |
//! |---|---|
//! | `id` | `UUID PRIMARY KEY` |
//! | `status` | `VARCHAR(16)` |
//! | `createdate` | `TIMESTAMPTZ` |
//! | `lastmodifieddate` | `TIMESTAMPTZ` |
//! | `deletedate` | `TIMESTAMPTZ NULL` |
//! | `data` | `JSONB` (the full record document) |
//!
//! Filters compare the text form of a column (`id::text`, `status`, or
//! `data->>'field'`) with text parameters, so every bound value is the
//! [`FieldValue::semantic_key`] of the condition value.

use crate::core::error::{ApiResult, SelectionError};
use crate::core::field::FieldValue;
use crate::core::params::ParameterDeduplicator;
use crate::core::query::{Condition, QueryOptions};
use crate::core::resource::{ID_FIELD, ResourceDescriptor, STATUS_FIELD};

/// A statement and its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl SqlStatement {
    /// Parameters in bind order as text
    pub fn text_params(&self) -> Vec<String> {
        self.params.iter().map(FieldValue::semantic_key).collect()
    }
}

/// Text expression for a document field
pub fn column_expr(field: &str) -> String {
    match field {
        ID_FIELD => "id::text".to_string(),
        STATUS_FIELD => "status".to_string(),
        other => format!("(data->>'{}')", other.replace('\'', "''")),
    }
}

/// WHERE clause (without the keyword) for conditions plus the live-row filter
pub fn where_clause(
    descriptor: &ResourceDescriptor,
    conditions: &[Condition],
    include_deleted: bool,
    params: &mut ParameterDeduplicator,
) -> ApiResult<String> {
    let mut predicates = Vec::new();
    if !include_deleted {
        predicates.push("status <> 'deleted'".to_string());
    }

    for condition in conditions {
        let field = condition.field();
        if !descriptor.allows_field(field) {
            return Err(SelectionError::InvalidFilterField {
                field: field.to_string(),
            }
            .into());
        }
        let column = column_expr(field);
        match condition {
            Condition::Eq { value, .. } => {
                let position = params.add_parameter(value.clone());
                predicates.push(format!("{} = ${}", column, position));
            }
            Condition::AnyOf { values, .. } if values.is_empty() => {
                predicates.push("FALSE".to_string());
            }
            Condition::AnyOf { values, .. } => {
                let placeholders = params
                    .add_parameters(values.iter().cloned())
                    .into_iter()
                    .map(|position| format!("${}", position))
                    .collect::<Vec<_>>()
                    .join(", ");
                predicates.push(format!("{} IN ({})", column, placeholders));
            }
        }
    }

    Ok(if predicates.is_empty() {
        "TRUE".to_string()
    } else {
        predicates.join(" AND ")
    })
}

/// Page of documents ordered by id
pub fn select_page(
    descriptor: &ResourceDescriptor,
    conditions: &[Condition],
    options: &QueryOptions,
    include_deleted: bool,
) -> ApiResult<SqlStatement> {
    let mut params = ParameterDeduplicator::new();
    let predicate = where_clause(descriptor, conditions, include_deleted, &mut params)?;
    Ok(SqlStatement {
        sql: format!(
            "SELECT data FROM {} WHERE {} ORDER BY id ASC LIMIT {} OFFSET {}",
            descriptor.table, predicate, options.limit, options.offset
        ),
        params: params.parameters(),
    })
}

/// Count of matching rows, ignoring paging
pub fn count_matching(
    descriptor: &ResourceDescriptor,
    conditions: &[Condition],
    include_deleted: bool,
) -> ApiResult<SqlStatement> {
    let mut params = ParameterDeduplicator::new();
    let predicate = where_clause(descriptor, conditions, include_deleted, &mut params)?;
    Ok(SqlStatement {
        sql: format!("SELECT COUNT(*) FROM {} WHERE {}", descriptor.table, predicate),
        params: params.parameters(),
    })
}

/// Live row by natural key, optionally locked for update
pub fn select_by_natural_key(
    descriptor: &ResourceDescriptor,
    key: &[FieldValue],
    for_update: bool,
) -> SqlStatement {
    let mut params = ParameterDeduplicator::new();
    let mut predicates = vec!["status <> 'deleted'".to_string()];
    for (field, value) in descriptor.natural_key.iter().zip(key) {
        let position = params.add_parameter(value.clone());
        predicates.push(format!("{} = ${}", column_expr(field), position));
    }
    SqlStatement {
        sql: format!(
            "SELECT data FROM {} WHERE {}{}",
            descriptor.table,
            predicates.join(" AND "),
            if for_update { " FOR UPDATE" } else { "" }
        ),
        params: params.parameters(),
    }
}

/// Row by id (`$1` is the id)
pub fn select_by_id(descriptor: &ResourceDescriptor, for_update: bool) -> String {
    format!(
        "SELECT data FROM {} WHERE id = $1{}",
        descriptor.table,
        if for_update { " FOR UPDATE" } else { "" }
    )
}

/// Insert of a full row (`$1..$6` = id, status, createdate, lastmodifieddate, deletedate, data)
pub fn insert_row(descriptor: &ResourceDescriptor) -> String {
    format!(
        "INSERT INTO {} (id, status, createdate, lastmodifieddate, deletedate, data) \
         VALUES ($1, $2, $3, $4, $5, $6)",
        descriptor.table
    )
}

/// Replacement of a full row, same parameters as [`insert_row`]
pub fn update_row(descriptor: &ResourceDescriptor) -> String {
    format!(
        "UPDATE {} SET status = $2, createdate = $3, lastmodifieddate = $4, \
         deletedate = $5, data = $6 WHERE id = $1",
        descriptor.table
    )
}

/// Name of the primary-key constraint on a resource table
pub fn primary_key_name(descriptor: &ResourceDescriptor) -> String {
    format!("{}_pkey", descriptor.table)
}

/// Name of the partial unique index over the natural key
pub fn natural_key_index_name(descriptor: &ResourceDescriptor) -> String {
    format!("ux_{}_natural_key", descriptor.table)
}

/// Client message for a unique violation reported on `constraint`
pub fn unique_conflict_message(descriptor: &ResourceDescriptor, constraint: Option<&str>) -> String {
    if constraint == Some(primary_key_name(descriptor).as_str()) {
        format!("A {} record with the same id already exists", descriptor.name)
    } else {
        format!(
            "A {} record with the same natural key already exists",
            descriptor.name
        )
    }
}

/// DDL for one resource table and its indexes (idempotent)
///
/// The natural key is unique among rows whose status is not `deleted`.
pub fn create_table(descriptor: &ResourceDescriptor) -> Vec<String> {
    let table = descriptor.table;
    let key_columns = descriptor
        .natural_key
        .iter()
        .map(|field| column_expr(field))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id UUID CONSTRAINT {} PRIMARY KEY,
                status VARCHAR(16) NOT NULL DEFAULT 'active',
                createdate TIMESTAMPTZ NOT NULL,
                lastmodifieddate TIMESTAMPTZ NOT NULL,
                deletedate TIMESTAMPTZ NULL,
                data JSONB NOT NULL,
                CHECK (lastmodifieddate >= createdate),
                CHECK (status <> 'deleted' OR deletedate IS NOT NULL)
            )",
            table,
            primary_key_name(descriptor)
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({}) WHERE status <> 'deleted'",
            natural_key_index_name(descriptor),
            table,
            key_columns
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS ix_{}_status ON {} (status)",
            table, table
        ),
    ]
}
