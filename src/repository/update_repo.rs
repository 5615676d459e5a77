// ==========================================
// 电压控制申请系统 - 申请更新流仓储
// ==========================================
// 表: solicitation_updates
// stream_id 单调递增, 作为通知令牌
// ==========================================

use crate::domain::{SolicitationUpdate, UpdateKind};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};

pub struct SolicitationUpdateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SolicitationUpdateRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录一条更新
    ///
    /// # 返回
    /// - `Ok(stream_id)`
    pub fn record(
        &self,
        solicitation_id: i64,
        user_id: Option<&str>,
        kind: UpdateKind,
        content: &JsonValue,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO solicitation_updates (solicitation_id, user_id, type, content)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![solicitation_id, user_id, kind.as_str(), content.to_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 读取 (from_token, to_token] 区间的更新, 按 stream_id 升序
    pub fn find_between(&self, from_token: i64, to_token: i64) -> RepositoryResult<Vec<SolicitationUpdate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT stream_id, solicitation_id, user_id, type, content
            FROM solicitation_updates
            WHERE stream_id > ?1 AND stream_id <= ?2
            ORDER BY stream_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![from_token, to_token], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(stream_id, solicitation_id, user_id, kind, content)| {
                let kind = UpdateKind::from_str(&kind).ok_or_else(|| {
                    RepositoryError::corrupt("solicitation_updates", stream_id, format!("未知类型: {}", kind))
                })?;
                let content: JsonValue = serde_json::from_str(&content).map_err(|e| {
                    RepositoryError::corrupt("solicitation_updates", stream_id, e.to_string())
                })?;
                Ok(SolicitationUpdate {
                    stream_id,
                    solicitation_id,
                    user_id,
                    kind,
                    content,
                })
            })
            .collect()
    }

    /// 当前最大令牌 (空流为 0)
    pub fn current_token(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let token: Option<i64> =
            conn.query_row("SELECT MAX(stream_id) FROM solicitation_updates", [], |row| row.get(0))?;
        Ok(token.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> (Arc<Mutex<Connection>>, i64) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO voltage_control_solicitation (equipment, action, substation_code, company_code, amount, requester_id) \
             VALUES ('SYNCHRONOUS', 'ADJUST', 'MOS', 'CTEEP', 5, 'user_ons')",
            [],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        (Arc::new(Mutex::new(conn)), id)
    }

    #[test]
    fn test_tokens_are_monotonic() {
        let (conn, id) = setup();
        let repo = SolicitationUpdateRepository::new(conn);
        assert_eq!(repo.current_token().unwrap(), 0);

        let t1 = repo
            .record(id, Some("user_ons"), UpdateKind::Created, &json!({"status": "NEW"}))
            .unwrap();
        let t2 = repo
            .record(id, None, UpdateKind::StatusChanged, &json!({"status": "LATE"}))
            .unwrap();
        assert!(t2 > t1);
        assert_eq!(repo.current_token().unwrap(), t2);

        let updates = repo.find_between(t1, t2).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].kind, UpdateKind::StatusChanged);
        assert_eq!(updates[0].content["status"], "LATE");
        assert!(updates[0].user_id.is_none());
    }
}
