// ==========================================
// 电压控制申请系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod solicitation_repo;
pub mod substation_repo;
pub mod update_repo;
pub mod user_company_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use solicitation_repo::SolicitationRepository;
pub use substation_repo::SubstationRepository;
pub use update_repo::SolicitationUpdateRepository;
pub use user_company_repo::UserCompanyRepository;
