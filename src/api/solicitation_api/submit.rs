use super::*;

use futures::future::try_join_all;

use crate::domain::{NewSolicitation, SolicitationGroup};

impl SolicitationApi {
    // ==========================================
    // 批量创建
    // ==========================================

    /// 批量创建申请
    ///
    /// # 参数
    /// - requester_id: 发起人
    /// - requester_company: 发起人所属公司 (必须为 ONS)
    /// - batch: 原始请求
    ///
    /// # 返回
    /// - Ok(SubmitResponse): 批次 id + 新申请 id (与请求顺序一致)
    /// - Err(ApiError): 任一项校验失败则整批不写入
    pub async fn submit_batch(
        &self,
        requester_id: &str,
        requester_company: &str,
        batch: SolicitationBatch,
    ) -> ApiResult<SubmitResponse> {
        if Company::from_str(requester_company) != Some(Company::Ons) {
            return Err(ApiError::Unauthorized("User should to belong ONS.".to_string()));
        }
        if batch.creation_total_time < 0 {
            return Err(ApiError::validation("Invalid creation total time value."));
        }
        if batch.solicitations.is_empty() {
            return Err(ApiError::validation("No solicitation informed."));
        }

        // 1. 参数校验
        let items = batch
            .solicitations
            .iter()
            .map(|raw| self.validator.validate(raw))
            .collect::<Result<Vec<NewSolicitation>, _>>()?;

        // 2. 变电站校验 (写入之前完成)
        self.ensure_substations_exist(&items).await?;

        // 3. 同一事务持久化
        let now = self.clock.now();
        let group = SolicitationGroup {
            group_id: uuid::Uuid::new_v4().to_string(),
            requester_id: requester_id.to_string(),
            creation_total_time: batch.creation_total_time,
            created_at: now,
        };
        let ids = self
            .solicitation_repo
            .create_batch(&group, &items, SolicitationStatus::New, now)?;

        tracing::info!(
            group_id = %group.group_id,
            requester_id,
            count = ids.len(),
            "申请批次已创建"
        );

        // 4. 每个申请一条通知
        for (id, item) in ids.iter().zip(items.iter()) {
            let recipients = self.recipients_for(&item.company_code).await;
            let content = serde_json::json!({
                "id": id,
                "status": SolicitationStatus::New.as_str(),
                "company_code": item.company_code,
                "substation": item.substation_code,
                "equipment": item.equipment.as_str(),
                "action": item.action.as_str(),
                "group_id": group.group_id,
            });
            self.record_and_notify(*id, Some(requester_id), UpdateKind::Created, content, recipients);
        }

        Ok(SubmitResponse {
            group_id: group.group_id,
            ids,
            message: crate::api::dto::CREATED_MESSAGE.to_string(),
        })
    }

    async fn ensure_substations_exist(&self, items: &[NewSolicitation]) -> ApiResult<()> {
        let pairs: BTreeSet<(&str, &str)> = items
            .iter()
            .map(|i| (i.company_code.as_str(), i.substation_code.as_str()))
            .collect();

        let checks = pairs.iter().map(|&(company, substation)| async move {
            self.substations
                .exists(company, substation)
                .await
                .map(|found| (company, substation, found))
        });
        let results = try_join_all(checks)
            .await
            .map_err(|e| ApiError::Collaborator(e.to_string()))?;

        if let Some((company, substation, _)) = results.into_iter().find(|(_, _, found)| !found) {
            return Err(ApiError::NotFound(format!(
                "Substation '{}' not found for company '{}'.",
                substation, company
            )));
        }
        Ok(())
    }
}
