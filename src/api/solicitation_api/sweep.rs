use super::*;

impl SolicitationApi {
    // ==========================================
    // 超时标记
    // ==========================================

    /// 把超过 late_after 仍停留在 ACCEPTED 的申请标记为 LATE
    ///
    /// 以 System 角色、无操作人迁移; 已被他人推进的申请记录日志后跳过,
    /// 因此重复执行是幂等的
    ///
    /// # 返回
    /// - Ok(ids): 本次标记为 LATE 的申请
    /// - Err(Store / Collaborator): 存储失败时中止, 不吞错误
    pub fn mark_late_accepted(&self) -> ApiResult<Vec<i64>> {
        let now = self.clock.now();
        let cutoff = now - self.config.late_after_secs;
        let candidates = self.solicitation_repo.find_stale_accepted(cutoff)?;

        let mut marked = Vec::with_capacity(candidates.len());
        for id in candidates {
            match self.apply_transition(
                id,
                None,
                TransitionRole::System,
                SolicitationStatus::Late,
                None,
            ) {
                Ok(_) => {
                    marked.push(id);
                    self.notify_marked_late(id);
                }
                // 已被他人推进 / 已删除: 跳过
                Err(
                    e @ (ApiError::StateConflict { .. }
                    | ApiError::Unauthorized(_)
                    | ApiError::NotFound(_)),
                ) => {
                    tracing::warn!(solicitation_id = id, error = %e, "超时标记被拒绝, 跳过");
                }
                Err(e) => {
                    tracing::error!(solicitation_id = id, error = %e, "超时标记失败, 本轮中止");
                    return Err(e);
                }
            }
        }

        if !marked.is_empty() {
            tracing::info!(count = marked.len(), cutoff, "超时申请已标记为 LATE");
        }
        Ok(marked)
    }

    fn notify_marked_late(&self, id: i64) {
        let company_code = match self.solicitation_repo.find_by_id(id) {
            Ok(Some(view)) => Some(view.solicitation.company_code),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(solicitation_id = id, error = %e, "读取申请失败, 通知内容不含公司");
                None
            }
        };

        let content = serde_json::json!({
            "id": id,
            "status": SolicitationStatus::Late.as_str(),
            "previous_status": SolicitationStatus::Accepted.as_str(),
            "company_code": company_code,
        });
        self.record_and_notify(id, None, UpdateKind::StatusChanged, content, None);
    }
}
