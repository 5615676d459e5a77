// ==========================================
// 电压控制申请系统 - 变电站参考数据仓储
// ==========================================
// 表: substation / substations_table
// 申请流程只读; 写入仅用于装载参考数据
// ==========================================

use crate::engine::directory::{DirectoryError, SubstationDirectory};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct SubstationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SubstationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增 (或覆盖) 分组表
    pub fn upsert_table(&self, company_code: &str, table_code: &str, name: Option<&str>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO substations_table (table_code, company_code, name)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(table_code, company_code) DO UPDATE SET name = excluded.name
            "#,
            params![table_code, company_code, name],
        )?;
        Ok(())
    }

    /// 新增 (或覆盖) 变电站
    pub fn upsert_substation(
        &self,
        company_code: &str,
        code: &str,
        name: Option<&str>,
        table_code: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO substation (code, company_code, name, table_code)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(code, company_code) DO UPDATE SET
                name = excluded.name,
                table_code = excluded.table_code
            "#,
            params![code, company_code, name, table_code],
        )?;
        Ok(())
    }

    pub fn substation_exists(&self, company_code: &str, code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM substation WHERE company_code = ?1 AND code = ?2",
                params![company_code, code],
                |_row| Ok(true),
            )
            .optional()?;
        Ok(found.unwrap_or(false))
    }

    pub fn table_exists(&self, company_code: &str, table_code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM substations_table WHERE company_code = ?1 AND table_code = ?2",
                params![company_code, table_code],
                |_row| Ok(true),
            )
            .optional()?;
        Ok(found.unwrap_or(false))
    }
}

#[async_trait]
impl SubstationDirectory for SubstationRepository {
    async fn exists(&self, company_code: &str, substation_code: &str) -> Result<bool, DirectoryError> {
        Ok(self.substation_exists(company_code, substation_code)?)
    }

    async fn table_exists(&self, company_code: &str, table_code: &str) -> Result<bool, DirectoryError> {
        Ok(SubstationRepository::table_exists(self, company_code, table_code)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SubstationRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        SubstationRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_substation_scoped_by_company() {
        let repo = setup();
        repo.upsert_table("CTEEP", "A1", Some("Tabela A1")).unwrap();
        repo.upsert_substation("CTEEP", "MOS", Some("Mosquito"), Some("A1"))
            .unwrap();

        assert!(repo.substation_exists("CTEEP", "MOS").unwrap());
        assert!(!repo.substation_exists("CHESF", "MOS").unwrap());
        assert!(repo.table_exists("CTEEP", "A1").unwrap());
        assert!(!repo.table_exists("CHESF", "A1").unwrap());
    }

    #[tokio::test]
    async fn test_directory_trait() {
        let repo = setup();
        repo.upsert_substation("CHESF", "ATI", None, None).unwrap();
        let dir: &dyn SubstationDirectory = &repo;
        assert!(dir.exists("CHESF", "ATI").await.unwrap());
        assert!(!dir.exists("CHESF", "XXX").await.unwrap());
    }
}
