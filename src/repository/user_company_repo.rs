// ==========================================
// 电压控制申请系统 - 用户公司归属仓储
// ==========================================
// 表: user_company
// ==========================================

use crate::engine::directory::{DirectoryError, IdentityDirectory};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct UserCompanyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserCompanyRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 设置用户所属公司
    pub fn assign(&self, user_id: &str, company_code: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO user_company (user_id, company_code) VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET company_code = excluded.company_code
            "#,
            params![user_id, company_code],
        )?;
        Ok(())
    }

    pub fn find_company(&self, user_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let company = conn
            .query_row(
                "SELECT company_code FROM user_company WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(company)
    }

    pub fn list_users(&self, company_code: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT user_id FROM user_company WHERE company_code = ?1 ORDER BY user_id")?;
        let users = stmt
            .query_map(params![company_code], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(users)
    }
}

#[async_trait]
impl IdentityDirectory for UserCompanyRepository {
    async fn company_of(&self, user_id: &str) -> Result<Option<String>, DirectoryError> {
        Ok(self.find_company(user_id)?)
    }

    async fn users_of(&self, company_code: &str) -> Result<Vec<String>, DirectoryError> {
        Ok(self.list_users(company_code)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_and_lookup() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let repo = UserCompanyRepository::new(Arc::new(Mutex::new(conn)));

        repo.assign("user_a", "CTEEP").unwrap();
        repo.assign("user_b", "CTEEP").unwrap();
        repo.assign("user_c", "ONS").unwrap();
        repo.assign("user_b", "CHESF").unwrap();

        assert_eq!(repo.find_company("user_a").unwrap().as_deref(), Some("CTEEP"));
        assert_eq!(repo.find_company("nobody").unwrap(), None);
        assert_eq!(repo.list_users("CTEEP").unwrap(), vec!["user_a".to_string()]);
        assert_eq!(repo.list_users("CHESF").unwrap(), vec!["user_b".to_string()]);
    }
}
