// ==========================================
// 阅卷点试卷调配系统 - 评卷人记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约定: 评卷人与日期无关，任何写入都影响整个科目
// ==========================================

use crate::domain::site::EvaluatorRecord;
use crate::domain::types::{SiteId, SubjectId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::service::events::{DataChangeEvent, OptionalListener};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

const UPSERT_SQL: &str = r#"
    INSERT INTO evaluator (site_id, subject_id, evaluator_count)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(site_id, subject_id)
    DO UPDATE SET evaluator_count = excluded.evaluator_count, updated_at = datetime('now')
"#;

/// 评卷人仓储
/// 职责: 管理 evaluator 表的 CRUD 操作
pub struct EvaluatorRepository {
    conn: Arc<Mutex<Connection>>,
    listener: OptionalListener,
}

impl EvaluatorRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            listener: OptionalListener::none(),
        }
    }

    pub fn with_listener(mut self, listener: OptionalListener) -> Self {
        self.listener = listener;
        self
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn check_count(record: &EvaluatorRecord) -> RepositoryResult<()> {
        if record.evaluator_count < 0 {
            return Err(RepositoryError::NegativeCount {
                field: "evaluator_count",
                site_id: record.site_id,
                subject_id: record.subject_id,
                value: record.evaluator_count,
            });
        }
        Ok(())
    }

    pub fn upsert(&self, record: &EvaluatorRecord) -> RepositoryResult<()> {
        Self::check_count(record)?;
        {
            let conn = self.get_conn()?;
            conn.execute(
                UPSERT_SQL,
                params![record.site_id.0, record.subject_id.0, record.evaluator_count],
            )?;
        }

        self.listener.notify(DataChangeEvent::evaluator_changed(
            record.subject_id,
            Some("EvaluatorRepository::upsert".to_string()),
        ));
        Ok(())
    }

    /// 批量插入或更新（单事务）
    pub fn upsert_batch(&self, records: &[EvaluatorRecord]) -> RepositoryResult<usize> {
        for record in records {
            Self::check_count(record)?;
        }

        let mut subjects = BTreeSet::new();
        {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(UPSERT_SQL)?;
                for record in records {
                    stmt.execute(params![
                        record.site_id.0,
                        record.subject_id.0,
                        record.evaluator_count
                    ])?;
                    subjects.insert(record.subject_id);
                }
            }
            tx.commit()?;
        }

        for subject_id in subjects {
            self.listener.notify(DataChangeEvent::bulk_import(
                subject_id,
                Some("EvaluatorRepository::upsert_batch".to_string()),
            ));
        }
        Ok(records.len())
    }

    pub fn delete(&self, site_id: SiteId, subject_id: SubjectId) -> RepositoryResult<usize> {
        let affected = {
            let conn = self.get_conn()?;
            conn.execute(
                "DELETE FROM evaluator WHERE site_id = ?1 AND subject_id = ?2",
                params![site_id.0, subject_id.0],
            )?
        };

        if affected > 0 {
            self.listener.notify(DataChangeEvent::evaluator_changed(
                subject_id,
                Some("EvaluatorRepository::delete".to_string()),
            ));
        }
        Ok(affected)
    }

    pub fn find_by_subject(&self, subject_id: SubjectId) -> RepositoryResult<Vec<EvaluatorRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT site_id, subject_id, evaluator_count
            FROM evaluator
            WHERE subject_id = ?1
            ORDER BY site_id
            "#,
        )?;
        let records = stmt
            .query_map(params![subject_id.0], |row| {
                Ok(EvaluatorRecord {
                    site_id: SiteId(row.get(0)?),
                    subject_id: SubjectId(row.get(1)?),
                    evaluator_count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
