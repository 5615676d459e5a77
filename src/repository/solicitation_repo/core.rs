use crate::domain::{
    CurrentStatusMarker, NewSolicitation, SolicitationGroup, SolicitationStatus,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// SolicitationRepository - 申请事件日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct SolicitationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SolicitationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 创建单个申请 (信封 + 初始事件, 同一事务)
    ///
    /// # 返回
    /// - `Ok(id)`: 新申请 id
    pub fn create_solicitation(
        &self,
        new: &NewSolicitation,
        creator_id: &str,
        initial_status: SolicitationStatus,
        ts: i64,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let id = insert_envelope(&tx, new, creator_id, None)?;
        insert_event(&tx, id, Some(creator_id), initial_status, ts, None)?;

        tx.commit()?;
        Ok(id)
    }

    /// 创建批次 (批次行 + 全部信封 + 初始事件, 同一事务)
    ///
    /// 任一写入失败则整批回滚
    pub fn create_batch(
        &self,
        group: &SolicitationGroup,
        items: &[NewSolicitation],
        initial_status: SolicitationStatus,
        ts: i64,
    ) -> RepositoryResult<Vec<i64>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO solicitation_group (group_id, requester_id, creation_total_time, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                group.group_id,
                group.requester_id,
                group.creation_total_time,
                group.created_at,
            ],
        )?;

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let id = insert_envelope(&tx, item, &group.requester_id, Some(&group.group_id))?;
            insert_event(&tx, id, Some(&group.requester_id), initial_status, ts, None)?;
            ids.push(id);
        }

        tx.commit()?;
        Ok(ids)
    }

    /// 无条件追加事件
    ///
    /// # 返回
    /// - `Ok(event_id)`
    /// - `Err(NotFound)`: 申请不存在
    pub fn append_event(
        &self,
        id: i64,
        actor: Option<&str>,
        status: SolicitationStatus,
        ts: i64,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !envelope_exists(&tx, id)? {
            return Err(RepositoryError::not_found("Solicitation", id));
        }
        let event_id = insert_event(&tx, id, actor, status, ts, None)?;

        tx.commit()?;
        Ok(event_id)
    }

    /// 乐观并发追加事件
    ///
    /// 在 IMMEDIATE 事务内重读头事件, 与 expected 不一致时
    /// 返回 OptimisticLockFailure, 不写入
    pub fn append_event_if_current(
        &self,
        id: i64,
        expected: CurrentStatusMarker,
        actor: Option<&str>,
        status: SolicitationStatus,
        ts: i64,
        justification: Option<&str>,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let actual_head = head_event_id(&tx, id)?
            .ok_or_else(|| RepositoryError::not_found("Solicitation", id))?;
        if actual_head != expected.head_event_id {
            return Err(RepositoryError::OptimisticLockFailure {
                solicitation_id: id,
                expected_head: expected.head_event_id,
                actual_head,
            });
        }

        let event_id = insert_event(&tx, id, actor, status, ts, justification)?;
        tx.commit()?;

        tracing::debug!(
            solicitation_id = id,
            event_id,
            status = status.as_str(),
            "事件已追加"
        );
        Ok(event_id)
    }
}

// ==========================================
// 事务内辅助函数
// ==========================================

fn insert_envelope(
    conn: &Connection,
    new: &NewSolicitation,
    requester_id: &str,
    group_id: Option<&str>,
) -> RepositoryResult<i64> {
    let p = &new.params;
    conn.execute(
        r#"
        INSERT INTO voltage_control_solicitation (
            equipment, action, substation_code, company_code,
            amount, voltage, staggered, voltage_primary, voltage_secondary,
            requester_id, group_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            new.equipment.as_str(),
            new.action.as_str(),
            new.substation_code,
            new.company_code,
            p.amount(),
            p.voltage().map(|v| v.as_str()),
            p.staggered(),
            p.voltage_primary().map(|v| v.as_str()),
            p.voltage_secondary().map(|v| v.as_str()),
            requester_id,
            group_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_event(
    conn: &Connection,
    solicitation_id: i64,
    actor: Option<&str>,
    status: SolicitationStatus,
    ts: i64,
    justification: Option<&str>,
) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO solicitation_event (solicitation_id, actor, status, time_stamp, justification)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![solicitation_id, actor, status.as_str(), ts, justification],
    )?;
    Ok(conn.last_insert_rowid())
}

fn envelope_exists(conn: &Connection, id: i64) -> RepositoryResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM voltage_control_solicitation WHERE id = ?1",
            params![id],
            |_row| Ok(true),
        )
        .optional()?;
    Ok(found.unwrap_or(false))
}

pub(super) fn head_event_id(conn: &Connection, id: i64) -> RepositoryResult<Option<i64>> {
    let head = conn
        .query_row(
            r#"
            SELECT event_id FROM solicitation_event
            WHERE solicitation_id = ?1
            ORDER BY time_stamp DESC, event_id DESC
            LIMIT 1
            "#,
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(head)
}
