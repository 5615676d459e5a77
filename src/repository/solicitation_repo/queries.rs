use super::SolicitationRepository;
use crate::domain::{
    EquipmentType, PageRequest, Solicitation, SolicitationAction, SolicitationEvent,
    SolicitationFilter, SolicitationParams, SolicitationState, SolicitationStatus,
    SolicitationView, SortParam, SortView, VoltageLevel,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

// 头事件: 最大 (time_stamp, event_id)
const HEAD_EVENT_JOIN: &str = r#"
    JOIN solicitation_event h ON h.event_id = (
        SELECT e.event_id FROM solicitation_event e
        WHERE e.solicitation_id = s.id
        ORDER BY e.time_stamp DESC, e.event_id DESC
        LIMIT 1
    )
"#;

const ENVELOPE_COLUMNS: &str = r#"
    s.id, s.equipment, s.action, s.substation_code, s.company_code,
    s.amount, s.voltage, s.staggered, s.voltage_primary, s.voltage_secondary,
    s.requester_id, s.group_id
"#;

/// 信封原始行 (字符串列尚未解析)
struct EnvelopeRow {
    id: i64,
    equipment: String,
    action: String,
    substation_code: String,
    company_code: String,
    amount: Option<i64>,
    voltage: Option<String>,
    staggered: Option<bool>,
    voltage_primary: Option<String>,
    voltage_secondary: Option<String>,
    requester_id: String,
    group_id: Option<String>,
}

fn map_envelope_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EnvelopeRow> {
    Ok(EnvelopeRow {
        id: row.get(0)?,
        equipment: row.get(1)?,
        action: row.get(2)?,
        substation_code: row.get(3)?,
        company_code: row.get(4)?,
        amount: row.get(5)?,
        voltage: row.get(6)?,
        staggered: row.get(7)?,
        voltage_primary: row.get(8)?,
        voltage_secondary: row.get(9)?,
        requester_id: row.get(10)?,
        group_id: row.get(11)?,
    })
}

impl EnvelopeRow {
    fn into_solicitation(self) -> RepositoryResult<Solicitation> {
        let id = self.id;
        let corrupt =
            move |msg: String| RepositoryError::corrupt("voltage_control_solicitation", id, msg);

        let equipment = EquipmentType::from_str(&self.equipment)
            .ok_or_else(|| corrupt(format!("未知设备类型: {}", self.equipment)))?;
        let action = SolicitationAction::from_str(&self.action)
            .ok_or_else(|| corrupt(format!("未知操作: {}", self.action)))?;

        let level = |col: &Option<String>| -> RepositoryResult<Option<VoltageLevel>> {
            match col {
                None => Ok(None),
                Some(s) => VoltageLevel::from_str(s)
                    .map(Some)
                    .ok_or_else(|| corrupt(format!("未知电压等级: {}", s))),
            }
        };

        let params = SolicitationParams::from_columns(
            equipment,
            self.amount,
            level(&self.voltage)?,
            self.staggered,
            level(&self.voltage_primary)?,
            level(&self.voltage_secondary)?,
        )
        .ok_or_else(|| corrupt(format!("参数列与设备类型不一致: {}", equipment)))?;

        Ok(Solicitation {
            id,
            equipment,
            action,
            substation_code: self.substation_code,
            company_code: self.company_code,
            params,
            requester_id: self.requester_id,
            group_id: self.group_id,
        })
    }
}

fn load_events(conn: &Connection, id: i64) -> RepositoryResult<Vec<SolicitationEvent>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT event_id, solicitation_id, actor, status, time_stamp, justification
        FROM solicitation_event
        WHERE solicitation_id = ?1
        ORDER BY time_stamp DESC, event_id DESC
        "#,
    )?;

    let rows = stmt
        .query_map(params![id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(event_id, solicitation_id, actor, status, time_stamp, justification)| {
            let status = SolicitationStatus::from_str(&status).ok_or_else(|| {
                RepositoryError::corrupt("solicitation_event", event_id, format!("未知状态: {}", status))
            })?;
            Ok(SolicitationEvent {
                event_id,
                solicitation_id,
                actor,
                status,
                time_stamp,
                justification,
            })
        })
        .collect()
}

fn status_list(statuses: &[SolicitationStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 按查看方视图生成状态桶排序表达式
///
/// 桶序号升序; 桶内按头事件时间, 终态桶取负值实现由新到旧
fn bucket_order_by(view: SortView) -> Vec<String> {
    let buckets = view.buckets();

    let mut rank = String::from("CASE");
    let mut ts = String::from("CASE");
    for (idx, bucket) in buckets.iter().enumerate() {
        let list = status_list(bucket.statuses);
        rank.push_str(&format!(" WHEN h.status IN ({}) THEN {}", list, idx));
        if bucket.newest_first {
            ts.push_str(&format!(" WHEN h.status IN ({}) THEN h.time_stamp * -1", list));
        }
    }
    rank.push_str(&format!(" ELSE {} END ASC", buckets.len()));
    ts.push_str(" ELSE h.time_stamp END ASC");

    vec![rank, ts]
}

impl SolicitationRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 由事件推导当前状态
    ///
    /// 申请不存在时返回 None
    pub fn current_state(&self, id: i64) -> RepositoryResult<Option<SolicitationState>> {
        let conn = self.get_conn()?;
        let events = load_events(&conn, id)?;
        Ok(SolicitationState::derive(events))
    }

    /// 查询申请 (信封 + 当前状态)
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<SolicitationView>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "SELECT {} FROM voltage_control_solicitation s WHERE s.id = ?1",
            ENVELOPE_COLUMNS
        );
        let row = conn.query_row(&sql, params![id], map_envelope_row).optional()?;
        let Some(row) = row else {
            return Ok(None);
        };

        let solicitation = row.into_solicitation()?;
        let state = SolicitationState::derive(load_events(&conn, id)?).ok_or_else(|| {
            RepositoryError::corrupt("voltage_control_solicitation", id, "申请没有任何事件")
        })?;
        Ok(Some(SolicitationView::new(solicitation, state)))
    }

    /// 列表查询
    ///
    /// # 参数
    /// - filter: 公司 / 变电站集合 / 分组表 / 排除超时
    /// - page: from_id (含) + limit
    /// - view: 查看方排序视图
    /// - sort: 排序提示 (为空时仅按状态桶)
    pub fn query(
        &self,
        filter: &SolicitationFilter,
        page: PageRequest,
        view: SortView,
        sort: &[SortParam],
    ) -> RepositoryResult<Vec<SolicitationView>> {
        let conn = self.get_conn()?;

        let mut sql = format!(
            r#"
            SELECT {}
            FROM voltage_control_solicitation s
            {}
            JOIN (
                SELECT solicitation_id, MIN(time_stamp) AS created_at
                FROM solicitation_event
                GROUP BY solicitation_id
            ) c ON c.solicitation_id = s.id
            WHERE 1 = 1
            "#,
            ENVELOPE_COLUMNS, HEAD_EVENT_JOIN
        );
        let mut params: Vec<Value> = Vec::new();

        if let Some(company) = &filter.company_code {
            sql.push_str(" AND s.company_code = ?");
            params.push(Value::Text(company.clone()));
        }

        if !filter.substations.is_empty() {
            let placeholders = std::iter::repeat("?")
                .take(filter.substations.len())
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" AND s.substation_code IN ({})", placeholders));
            for code in &filter.substations {
                params.push(Value::Text(code.clone()));
            }
        }

        if let Some(table) = &filter.table_code {
            sql.push_str(
                r#"
                AND EXISTS (
                    SELECT 1 FROM substation sub
                    WHERE sub.code = s.substation_code
                      AND sub.company_code = s.company_code
                      AND sub.table_code = ?
                )
                "#,
            );
            params.push(Value::Text(table.clone()));
        }

        if filter.exclude_expired {
            sql.push_str(" AND h.status <> 'LATE'");
        }

        if let Some(from_id) = page.from_id {
            sql.push_str(" AND s.id >= ?");
            params.push(Value::Integer(from_id));
        }

        let mut order_by: Vec<String> = Vec::new();
        if sort.is_empty() {
            order_by.extend(bucket_order_by(view));
        } else {
            for hint in sort {
                match hint {
                    SortParam::Status => order_by.extend(bucket_order_by(view)),
                    SortParam::CreationTime => order_by.push("c.created_at DESC".to_string()),
                    SortParam::Substation => order_by.push("s.substation_code ASC".to_string()),
                }
            }
        }
        order_by.push("s.id ASC".to_string());

        sql.push_str(&format!(" ORDER BY {} LIMIT ?", order_by.join(", ")));
        params.push(Value::Integer(page.limit as i64));

        tracing::debug!(view = ?view, params = params.len(), "申请列表查询");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), map_envelope_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            let solicitation = row.into_solicitation()?;
            let state = SolicitationState::derive(load_events(&conn, id)?).ok_or_else(|| {
                RepositoryError::corrupt("voltage_control_solicitation", id, "申请没有任何事件")
            })?;
            views.push(SolicitationView::new(solicitation, state));
        }
        Ok(views)
    }

    /// 当前状态为 ACCEPTED 且头事件早于 cutoff 的申请 id
    pub fn find_stale_accepted(&self, cutoff: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;

        let sql = format!(
            r#"
            SELECT s.id
            FROM voltage_control_solicitation s
            {}
            WHERE h.status = 'ACCEPTED' AND h.time_stamp < ?1
            ORDER BY s.id ASC
            "#,
            HEAD_EVENT_JOIN
        );

        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![cutoff], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}
