// ==========================================
// 阅卷点试卷调配系统 - 科目主数据仓储
// ==========================================

use crate::domain::site::SubjectInfo;
use crate::domain::types::SubjectId;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 科目仓储
/// 职责: 管理 subject 表的 CRUD 操作
pub struct SubjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SubjectRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, subject: &SubjectInfo) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO subject (subject_id, name) VALUES (?1, ?2)
            ON CONFLICT(subject_id) DO UPDATE SET name = excluded.name
            "#,
            params![subject.subject_id.0, subject.name],
        )?;
        Ok(())
    }

    pub fn ensure_exists(&self, subject_id: SubjectId) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO subject (subject_id, name) VALUES (?1, '')",
            params![subject_id.0],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, subject_id: SubjectId) -> RepositoryResult<Option<SubjectInfo>> {
        let conn = self.get_conn()?;
        let subject = conn
            .query_row(
                "SELECT subject_id, name FROM subject WHERE subject_id = ?1",
                params![subject_id.0],
                |row| {
                    Ok(SubjectInfo {
                        subject_id: SubjectId(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(subject)
    }

    pub fn find_all(&self) -> RepositoryResult<Vec<SubjectInfo>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT subject_id, name FROM subject ORDER BY subject_id")?;
        let subjects = stmt
            .query_map([], |row| {
                Ok(SubjectInfo {
                    subject_id: SubjectId(row.get(0)?),
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(subjects)
    }
}
