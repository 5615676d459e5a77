use super::*;

use futures::future::try_join_all;

use crate::domain::{PageRequest, SolicitationFilter, SolicitationUpdate, SolicitationView, SortParam, SortView};

const FORBIDDEN_OTHER_COMPANY: &str = "User can only access the solicitations of your company";

impl SolicitationApi {
    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询单个申请
    ///
    /// 非 ONS 查看方只能看到本公司的申请
    pub fn get_solicitation(&self, viewer_company: &str, id: i64) -> ApiResult<SolicitationView> {
        let view = self
            .solicitation_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Solicitation {} not found.", id)))?;

        if viewer_company != Company::Ons.as_str() && view.solicitation.company_code != viewer_company {
            return Err(ApiError::Forbidden(FORBIDDEN_OTHER_COMPANY.to_string()));
        }
        Ok(view)
    }

    /// 列表查询
    ///
    /// # 公司规则
    /// - company_code 未知 → NotFound("Company not found")
    /// - 非 ONS 查看方请求其他公司 → Forbidden
    /// - 非 ONS 查看方未指定公司 → Validation("Company code not informed")
    /// - table_code / substations 需指定公司且存在
    pub async fn list_solicitations(
        &self,
        viewer_company: &str,
        request: ListRequest,
    ) -> ApiResult<ListResponse> {
        let is_operator = viewer_company == Company::Ons.as_str();

        let company_code = match request.company_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                if Company::from_str(code).is_none() {
                    return Err(ApiError::NotFound("Company not found".to_string()));
                }
                if !is_operator && code != viewer_company {
                    return Err(ApiError::Forbidden(FORBIDDEN_OTHER_COMPANY.to_string()));
                }
                Some(code.to_string())
            }
            _ if !is_operator => {
                return Err(ApiError::validation("Company code not informed"));
            }
            _ => None,
        };

        let table_code = request
            .table_code
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let substations: Vec<String> = request
            .substations
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if table_code.is_some() || !substations.is_empty() {
            let company = company_code
                .as_deref()
                .ok_or_else(|| ApiError::validation("Company code not informed"))?;
            self.ensure_filter_references_exist(company, table_code.as_deref(), &substations)
                .await?;
        }

        let sort = request
            .sort
            .iter()
            .map(|s| {
                SortParam::from_str(s.trim())
                    .ok_or_else(|| ApiError::validation(format!("Invalid sort parameter '{}'.", s)))
            })
            .collect::<ApiResult<Vec<_>>>()?;

        let limit = request
            .limit
            .unwrap_or(self.config.list_default_limit)
            .clamp(1, self.config.list_max_limit);

        let filter = SolicitationFilter {
            company_code,
            substations,
            table_code,
            exclude_expired: request.exclude_expired,
        };
        let page = PageRequest {
            from_id: request.from_id,
            limit,
        };

        let solicitations = self.solicitation_repo.query(
            &filter,
            page,
            SortView::for_company(viewer_company),
            &sort,
        )?;

        tracing::debug!(viewer_company, count = solicitations.len(), "申请列表已返回");
        Ok(ListResponse {
            count: solicitations.len(),
            solicitations,
        })
    }

    async fn ensure_filter_references_exist(
        &self,
        company: &str,
        table_code: Option<&str>,
        substations: &[String],
    ) -> ApiResult<()> {
        if let Some(table) = table_code {
            let found = self
                .substations
                .table_exists(company, table)
                .await
                .map_err(|e| ApiError::Collaborator(e.to_string()))?;
            if !found {
                return Err(ApiError::NotFound("Table not found".to_string()));
            }
        }

        let checks = substations.iter().map(|code| async move {
            self.substations
                .exists(company, code)
                .await
                .map(|found| (code, found))
        });
        let results = try_join_all(checks)
            .await
            .map_err(|e| ApiError::Collaborator(e.to_string()))?;
        if let Some((code, _)) = results.into_iter().find(|(_, found)| !found) {
            return Err(ApiError::NotFound(format!("Substation '{}' not found.", code)));
        }
        Ok(())
    }

    // ==========================================
    // 更新流
    // ==========================================

    /// 读取 (from_token, to_token] 区间内用户可见的更新
    ///
    /// 非 ONS 用户只能看到本公司申请的更新
    pub async fn updates_since(
        &self,
        user_id: &str,
        from_token: i64,
        to_token: i64,
    ) -> ApiResult<Vec<SolicitationUpdate>> {
        if to_token < from_token {
            return Err(ApiError::validation("Invalid stream token range."));
        }

        let company = self
            .identities
            .company_of(user_id)
            .await
            .map_err(|e| ApiError::Collaborator(e.to_string()))?
            .ok_or_else(|| ApiError::Unauthorized("User does not belong to any company.".to_string()))?;

        let updates = self.update_repo.find_between(from_token, to_token)?;
        if company == Company::Ons.as_str() {
            return Ok(updates);
        }
        Ok(updates
            .into_iter()
            .filter(|u| u.content.get("company_code").and_then(|c| c.as_str()) == Some(company.as_str()))
            .collect())
    }

    pub fn current_stream_token(&self) -> ApiResult<i64> {
        Ok(self.update_repo.current_token()?)
    }
}
