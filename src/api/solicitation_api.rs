// ==========================================
// 电压控制申请系统 - 申请工作流 API
// ==========================================
// 职责: 批量创建、状态变更、超时标记、查询
// 本身不持有持久状态; 校验与授权在任何写入之前完成
// ==========================================

mod query;
mod status;
mod submit;
mod sweep;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::api::dto::{
    ListRequest, ListResponse, SolicitationBatch, StatusChangeResponse, SubmitResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::config::EngineConfig;
use crate::domain::{Company, SolicitationStatus, UpdateKind};
use crate::engine::clock::Clock;
use crate::engine::directory::{IdentityDirectory, SubstationDirectory};
use crate::engine::events::{NotificationBus, SolicitationNotification};
use crate::engine::transition::{TransitionAuthority, TransitionRole};
use crate::engine::validator::EquipmentValidator;
use crate::repository::error::RepositoryError;
use crate::repository::{SolicitationRepository, SolicitationUpdateRepository};

/// 一次已写入的状态迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AppliedTransition {
    pub event_id: i64,
    pub from: SolicitationStatus, // 实际写入时的头状态 (重试后为最新状态)
}

// ==========================================
// SolicitationApi - 申请工作流 API
// ==========================================
pub struct SolicitationApi {
    solicitation_repo: Arc<SolicitationRepository>,
    update_repo: Arc<SolicitationUpdateRepository>,
    substations: Arc<dyn SubstationDirectory>,
    identities: Arc<dyn IdentityDirectory>,
    notification_bus: Arc<dyn NotificationBus>,
    validator: EquipmentValidator,
    authority: Arc<TransitionAuthority>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl SolicitationApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        solicitation_repo: Arc<SolicitationRepository>,
        update_repo: Arc<SolicitationUpdateRepository>,
        substations: Arc<dyn SubstationDirectory>,
        identities: Arc<dyn IdentityDirectory>,
        notification_bus: Arc<dyn NotificationBus>,
        authority: Arc<TransitionAuthority>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            solicitation_repo,
            update_repo,
            substations,
            identities,
            notification_bus,
            validator: EquipmentValidator::new(),
            authority,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ==========================================
    // 状态迁移 (乐观并发, 冲突重试一次)
    // ==========================================

    /// 对一个申请执行状态迁移
    ///
    /// # 返回
    /// - Ok(AppliedTransition): 新事件及迁移前状态
    /// - Err(StateConflict(Concurrent)): 重试后仍冲突
    pub(crate) fn apply_transition(
        &self,
        id: i64,
        actor: Option<&str>,
        role: TransitionRole,
        requested: SolicitationStatus,
        justification: Option<&str>,
    ) -> ApiResult<AppliedTransition> {
        let mut retried = false;
        loop {
            let state = self
                .solicitation_repo
                .current_state(id)?
                .ok_or_else(|| ApiError::NotFound(format!("Solicitation {} not found.", id)))?;

            let now = self.clock.now();
            self.authority
                .check(state.status, requested, role, state.created_at, now)?;

            // 事件时间不早于头事件, 保证新事件成为当前状态
            let ts = now.max(state.updated_at);
            match self.solicitation_repo.append_event_if_current(
                id,
                state.marker(),
                actor,
                requested,
                ts,
                justification,
            ) {
                Ok(event_id) => {
                    tracing::info!(
                        solicitation_id = id,
                        from = state.status.as_str(),
                        to = requested.as_str(),
                        role = role.as_str(),
                        "申请状态已变更"
                    );
                    return Ok(AppliedTransition {
                        event_id,
                        from: state.status,
                    });
                }
                Err(RepositoryError::OptimisticLockFailure { .. }) if !retried => {
                    tracing::warn!(solicitation_id = id, "并发修改冲突, 基于最新状态重试");
                    retried = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // ==========================================
    // 通知 (失败只记录日志, 不回滚)
    // ==========================================

    /// 记录更新流并发布通知
    ///
    /// # 返回
    /// - Some(token): 更新已记录
    /// - None: 记录失败 (已记录日志)
    pub(crate) fn record_and_notify(
        &self,
        solicitation_id: i64,
        user_id: Option<&str>,
        kind: UpdateKind,
        content: JsonValue,
        recipients: Option<Vec<String>>,
    ) -> Option<i64> {
        let token = match self
            .update_repo
            .record(solicitation_id, user_id, kind, &content)
        {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(solicitation_id, error = %e, "更新流记录失败");
                return None;
            }
        };

        if let Err(e) = self
            .notification_bus
            .publish(SolicitationNotification::new(token, recipients))
        {
            tracing::warn!(solicitation_id, token, error = %e, "通知发布失败");
        }
        Some(token)
    }

    /// 通知接收人: 审核公司用户 + ONS 用户
    ///
    /// 目录查询失败时返回 None (广播)
    pub(crate) async fn recipients_for(&self, company_code: &str) -> Option<Vec<String>> {
        let mut users = BTreeSet::new();
        for company in [company_code, Company::Ons.as_str()] {
            match self.identities.users_of(company).await {
                Ok(list) => users.extend(list),
                Err(e) => {
                    tracing::warn!(company, error = %e, "接收人查询失败, 改为广播");
                    return None;
                }
            }
        }
        Some(users.into_iter().collect())
    }
}
