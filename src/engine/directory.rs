// ==========================================
// 电压控制申请系统 - 外部目录协作者
// ==========================================
// 变电站目录 / 用户身份目录 (只读)
// ==========================================

use async_trait::async_trait;
use std::error::Error;

pub type DirectoryError = Box<dyn Error + Send + Sync>;

/// 变电站参考数据
#[async_trait]
pub trait SubstationDirectory: Send + Sync {
    /// 变电站是否存在且属于该公司
    async fn exists(&self, company_code: &str, substation_code: &str) -> Result<bool, DirectoryError>;

    /// 变电站分组表是否存在且属于该公司
    async fn table_exists(&self, company_code: &str, table_code: &str) -> Result<bool, DirectoryError>;
}

/// 用户所属公司
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn company_of(&self, user_id: &str) -> Result<Option<String>, DirectoryError>;

    /// 公司下的用户 (用于通知接收人)
    async fn users_of(&self, company_code: &str) -> Result<Vec<String>, DirectoryError>;
}
