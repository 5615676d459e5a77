use super::*;

impl SolicitationApi {
    // ==========================================
    // 状态变更
    // ==========================================

    /// 变更申请状态
    ///
    /// # 参数
    /// - id: 申请 id
    /// - actor_id: 操作人 (公司由身份目录解析)
    /// - requested_status: 目标状态名
    /// - justification: 可选说明
    ///
    /// # 错误
    /// - NotFound: 申请不存在
    /// - Validation: 未知状态名
    /// - Unauthorized: 该公司无权迁移到目标状态
    /// - Forbidden: 输电公司操作其他公司的申请
    /// - StateConflict: NoOp / InvalidTransition / Expired / Concurrent
    pub async fn change_status(
        &self,
        id: i64,
        actor_id: &str,
        requested_status: &str,
        justification: Option<String>,
    ) -> ApiResult<StatusChangeResponse> {
        let company = self
            .identities
            .company_of(actor_id)
            .await
            .map_err(|e| ApiError::Collaborator(e.to_string()))?
            .ok_or_else(|| ApiError::Unauthorized("User does not belong to any company.".to_string()))?;

        let view = self
            .solicitation_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Solicitation {} not found.", id)))?;

        let requested = SolicitationStatus::from_str(requested_status.trim()).ok_or_else(|| {
            ApiError::validation(format!("Invalid status '{}'.", requested_status))
        })?;

        let role = TransitionRole::for_company(&company);
        if role == TransitionRole::Transmission && view.solicitation.company_code != company {
            return Err(ApiError::Forbidden(
                "User can only access the solicitations of your company".to_string(),
            ));
        }

        let justification = justification
            .map(|j| j.trim().to_string())
            .filter(|j| !j.is_empty());

        let applied =
            self.apply_transition(id, Some(actor_id), role, requested, justification.as_deref())?;

        let recipients = self.recipients_for(&view.solicitation.company_code).await;
        let content = serde_json::json!({
            "id": id,
            "status": requested.as_str(),
            "previous_status": applied.from.as_str(),
            "company_code": view.solicitation.company_code,
            "substation": view.solicitation.substation_code,
            "justification": justification,
        });
        let stream_token = self.record_and_notify(
            id,
            Some(actor_id),
            UpdateKind::StatusChanged,
            content,
            recipients,
        );

        Ok(StatusChangeResponse {
            solicitation_id: id,
            status: requested,
            stream_token,
        })
    }
}
