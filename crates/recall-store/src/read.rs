//! Read path: per-partition reads, the hybrid timestamp merge, and search.

use libsql::{Value, params_from_iter};
use recall_types::{HistoryRecord, Mode, Partition, SearchOptions};
use tracing::debug;
use uuid::Uuid;

use crate::db::{self, now_secs};
use crate::{HistoryClient, Result, StoreError};

/// Recency bound on the hybrid cross-partition union: 7 days.
///
/// Deliberately a constant rather than configuration; see DESIGN.md.
pub const HYBRID_WINDOW_SECS: i64 = 7 * 24 * 3600;

/// Normalized column list, identical across the three partitions so union
/// rows have a uniform shape regardless of source. Missing columns are
/// NULL-filled; every branch tags its rows with the source partition.
fn partition_select(partition: Partition) -> &'static str {
    match partition {
        Partition::Global => {
            "SELECT id, command, response, machine_id, user_id, timestamp, session_id, \
             tokens_used, execution_time_ms, tags, NULL AS context, NULL AS error_code, \
             'global' AS source FROM history_global"
        }
        Partition::User => {
            "SELECT id, command, response, machine_id, user_id, timestamp, session_id, \
             tokens_used, NULL AS execution_time_ms, NULL AS tags, context, NULL AS error_code, \
             'user' AS source FROM history_user"
        }
        Partition::Machine => {
            "SELECT id, command, response, machine_id, user_id, timestamp, session_id, \
             NULL AS tokens_used, NULL AS execution_time_ms, NULL AS tags, NULL AS context, \
             error_code, 'machine' AS source FROM history_machine"
        }
    }
}

/// Case-insensitive substring filter over command and response text.
const SEARCH_FILTER: &str = "(lower(command) LIKE ? OR lower(response) LIKE ?)";

fn parse_partition(s: &str) -> Option<Partition> {
    match s {
        "global" => Some(Partition::Global),
        "user" => Some(Partition::User),
        "machine" => Some(Partition::Machine),
        _ => None,
    }
}

fn row_to_record(row: &libsql::Row) -> Result<HistoryRecord> {
    let id = db::text(row, 0)?;
    let tags = match db::opt_text(row, 9)? {
        Some(raw) => serde_json::from_str(&raw).ok(),
        None => None,
    };
    Ok(HistoryRecord {
        id: Uuid::parse_str(&id)
            .map_err(|e| StoreError::Decode(format!("bad row id '{}': {}", id, e)))?,
        command: db::text(row, 1)?,
        response: db::opt_text(row, 2)?,
        machine_id: db::opt_text(row, 3)?,
        user_id: db::opt_text(row, 4)?,
        timestamp: db::integer(row, 5)?,
        session_id: db::opt_text(row, 6)?,
        tokens_used: db::opt_integer(row, 7)?,
        execution_time_ms: db::opt_integer(row, 8)?,
        tags,
        context: db::opt_text(row, 10)?,
        error_code: db::opt_integer(row, 11)?,
        source: db::opt_text(row, 12)?.as_deref().and_then(parse_partition),
    })
}

/// One branch of a (possibly unioned) read: normalized select + WHERE
/// conditions + positional params.
struct Branch {
    partition: Partition,
    conditions: Vec<&'static str>,
    params: Vec<Value>,
}

impl Branch {
    fn sql(&self) -> String {
        let base = partition_select(self.partition);
        if self.conditions.is_empty() {
            base.to_string()
        } else {
            format!("{} WHERE {}", base, self.conditions.join(" AND "))
        }
    }
}

fn assemble(branches: Vec<Branch>, limit: Option<u32>, offset: Option<u32>) -> (String, Vec<Value>) {
    let mut params: Vec<Value> = Vec::new();
    let selects: Vec<String> = branches
        .into_iter()
        .map(|branch| {
            let sql = branch.sql();
            params.extend(branch.params);
            sql
        })
        .collect();
    let mut sql = selects.join(" UNION ALL ");
    sql.push_str(" ORDER BY timestamp DESC");
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(limit as i64));
        if let Some(offset) = offset {
            sql.push_str(" OFFSET ?");
            params.push(Value::Integer(offset as i64));
        }
    }
    (sql, params)
}

impl HistoryClient {
    /// Most-recent-first page of history in the current mode.
    ///
    /// Hybrid mode unions the three partitions over the last
    /// [`HYBRID_WINDOW_SECS`], tags rows with their source, and merges by
    /// timestamp descending before paginating. The user branch requires a
    /// resolved user and is skipped otherwise.
    pub async fn get_history(&self, limit: u32, offset: u32) -> Result<Vec<HistoryRecord>> {
        let branches = self.scope_branches(self.mode(), None)?;
        self.run_history_query(branches, Some(limit), Some(offset)).await
    }

    /// Case-insensitive substring search over command and response text.
    ///
    /// Scope defaults to the client's current mode; `options.mode` overrides
    /// it per call without touching controller state. No implicit result
    /// bound beyond `options.limit`.
    pub async fn search_history(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<HistoryRecord>> {
        let scope = options.mode.unwrap_or(self.mode());
        let pattern = format!("%{}%", query.to_lowercase());
        let branches = self.scope_branches(scope, Some(&pattern))?;
        self.run_history_query(branches, options.limit, None).await
    }

    /// Build the branch set for a mode, optionally with the search filter.
    fn scope_branches(&self, scope: Mode, search: Option<&str>) -> Result<Vec<Branch>> {
        let search_params = |params: &mut Vec<Value>| {
            if let Some(pattern) = search {
                params.push(Value::Text(pattern.to_string()));
                params.push(Value::Text(pattern.to_string()));
            }
        };
        let with_filter = |mut conditions: Vec<&'static str>| {
            if search.is_some() {
                conditions.push(SEARCH_FILTER);
            }
            conditions
        };

        let branches = match scope {
            Mode::Global => {
                let mut params = Vec::new();
                search_params(&mut params);
                vec![Branch {
                    partition: Partition::Global,
                    conditions: with_filter(vec![]),
                    params,
                }]
            }
            Mode::User => {
                let user_id = self
                    .user_id()
                    .ok_or(StoreError::ModeRequiresUser)?
                    .to_string();
                let mut params = vec![Value::Text(user_id)];
                search_params(&mut params);
                vec![Branch {
                    partition: Partition::User,
                    conditions: with_filter(vec!["user_id = ?"]),
                    params,
                }]
            }
            Mode::Machine => {
                let mut params = vec![Value::Text(self.machine_id().to_string())];
                search_params(&mut params);
                vec![Branch {
                    partition: Partition::Machine,
                    conditions: with_filter(vec!["machine_id = ?"]),
                    params,
                }]
            }
            Mode::Hybrid => {
                let cutoff = now_secs() - HYBRID_WINDOW_SECS;
                let mut branches = Vec::new();

                let mut params = vec![Value::Integer(cutoff)];
                search_params(&mut params);
                branches.push(Branch {
                    partition: Partition::Global,
                    conditions: with_filter(vec!["timestamp >= ?"]),
                    params,
                });

                // No resolved user: the user branch yields empty, so skip it.
                if let Some(user_id) = self.user_id() {
                    let mut params =
                        vec![Value::Text(user_id.to_string()), Value::Integer(cutoff)];
                    search_params(&mut params);
                    branches.push(Branch {
                        partition: Partition::User,
                        conditions: with_filter(vec!["user_id = ?", "timestamp >= ?"]),
                        params,
                    });
                }

                let mut params = vec![
                    Value::Text(self.machine_id().to_string()),
                    Value::Integer(cutoff),
                ];
                search_params(&mut params);
                branches.push(Branch {
                    partition: Partition::Machine,
                    conditions: with_filter(vec!["machine_id = ?", "timestamp >= ?"]),
                    params,
                });

                branches
            }
        };
        Ok(branches)
    }

    async fn run_history_query(
        &self,
        branches: Vec<Branch>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<HistoryRecord>> {
        let (sql, params) = assemble(branches, limit, offset);
        let mut rows = self
            .connection()
            .query(&sql, params_from_iter(params))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        debug!(target: "recall::read", rows = records.len(), "history read");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_single_branch() {
        let branch = Branch {
            partition: Partition::Global,
            conditions: vec![],
            params: vec![],
        };
        let (sql, params) = assemble(vec![branch], Some(10), Some(0));
        assert!(sql.starts_with("SELECT id, command"));
        assert!(sql.ends_with("ORDER BY timestamp DESC LIMIT ? OFFSET ?"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_assemble_union_keeps_param_order() {
        let branches = vec![
            Branch {
                partition: Partition::Global,
                conditions: vec!["timestamp >= ?"],
                params: vec![Value::Integer(100)],
            },
            Branch {
                partition: Partition::Machine,
                conditions: vec!["machine_id = ?", "timestamp >= ?"],
                params: vec![Value::Text("m1".into()), Value::Integer(100)],
            },
        ];
        let (sql, params) = assemble(branches, None, None);
        assert_eq!(sql.matches("UNION ALL").count(), 1);
        assert!(!sql.contains("LIMIT"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_partition_selects_share_column_shape() {
        for partition in [Partition::Global, Partition::User, Partition::Machine] {
            let sql = partition_select(partition);
            for column in ["tokens_used", "execution_time_ms", "tags", "context", "error_code", "source"] {
                assert!(sql.contains(column), "{} missing {}", partition, column);
            }
        }
    }
}
