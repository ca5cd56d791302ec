// ==========================================
// 阅卷点试卷调配系统 - 考试记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约定: 每次写入发布 DataChangeEvent，由缓存层负责失效
// ==========================================

use crate::domain::site::ExamRecord;
use crate::domain::types::{AllocationKey, SiteId, SubjectId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::service::events::{DataChangeEvent, OptionalListener};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

const UPSERT_SQL: &str = r#"
    INSERT INTO exam (site_id, subject_id, exam_date, exam_count)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(site_id, subject_id, exam_date)
    DO UPDATE SET exam_count = excluded.exam_count, updated_at = datetime('now')
"#;

/// 考试记录仓储
/// 职责: 管理 exam 表的 CRUD 操作
pub struct ExamRepository {
    conn: Arc<Mutex<Connection>>,
    listener: OptionalListener,
}

impl ExamRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            listener: OptionalListener::none(),
        }
    }

    /// 注入数据变更监听者（写穿失效）
    pub fn with_listener(mut self, listener: OptionalListener) -> Self {
        self.listener = listener;
        self
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn check_count(record: &ExamRecord) -> RepositoryResult<()> {
        if record.exam_count < 0 {
            return Err(RepositoryError::NegativeCount {
                field: "exam_count",
                site_id: record.site_id,
                subject_id: record.subject_id,
                value: record.exam_count,
            });
        }
        Ok(())
    }

    /// 插入或更新单条考试记录
    pub fn upsert(&self, record: &ExamRecord) -> RepositoryResult<()> {
        Self::check_count(record)?;
        {
            let conn = self.get_conn()?;
            conn.execute(
                UPSERT_SQL,
                params![
                    record.site_id.0,
                    record.subject_id.0,
                    record.exam_date,
                    record.exam_count
                ],
            )?;
        }

        self.listener.notify(DataChangeEvent::exam_changed(
            record.subject_id,
            record.exam_date,
            Some("ExamRepository::upsert".to_string()),
        ));
        Ok(())
    }

    /// 批量插入或更新（单事务）
    ///
    /// # 返回
    /// 写入的记录数
    pub fn upsert_batch(&self, records: &[ExamRecord]) -> RepositoryResult<usize> {
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
                        record.exam_date,
                        record.exam_count
                    ])?;
                    subjects.insert(record.subject_id);
                }
            }
            tx.commit()?;
        }

        for subject_id in subjects {
            self.listener.notify(DataChangeEvent::bulk_import(
                subject_id,
                Some("ExamRepository::upsert_batch".to_string()),
            ));
        }
        Ok(records.len())
    }

    /// 删除单条考试记录
    pub fn delete(
        &self,
        site_id: SiteId,
        subject_id: SubjectId,
        exam_date: NaiveDate,
    ) -> RepositoryResult<usize> {
        let affected = {
            let conn = self.get_conn()?;
            conn.execute(
                "DELETE FROM exam WHERE site_id = ?1 AND subject_id = ?2 AND exam_date = ?3",
                params![site_id.0, subject_id.0, exam_date],
            )?
        };

        if affected > 0 {
            self.listener.notify(DataChangeEvent::exam_changed(
                subject_id,
                exam_date,
                Some("ExamRepository::delete".to_string()),
            ));
        }
        Ok(affected)
    }

    /// 按调配键查询考试记录（date=None 时返回科目下全部日期）
    pub fn find_by_key(&self, key: &AllocationKey) -> RepositoryResult<Vec<ExamRecord>> {
        let conn = self.get_conn()?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<ExamRecord> {
            Ok(ExamRecord {
                site_id: SiteId(row.get(0)?),
                subject_id: SubjectId(row.get(1)?),
                exam_date: row.get(2)?,
                exam_count: row.get(3)?,
            })
        };

        let records = match key.date {
            Some(date) => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT site_id, subject_id, exam_date, exam_count
                    FROM exam
                    WHERE subject_id = ?1 AND exam_date = ?2
                    ORDER BY site_id
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![key.subject_id.0, date], map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT site_id, subject_id, exam_date, exam_count
                    FROM exam
                    WHERE subject_id = ?1
                    ORDER BY site_id, exam_date
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![key.subject_id.0], map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };

        Ok(records)
    }

    /// 科目下出现过的考试日期（升序）
    pub fn find_dates(&self, subject_id: SubjectId) -> RepositoryResult<Vec<NaiveDate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT exam_date FROM exam WHERE subject_id = ?1 ORDER BY exam_date",
        )?;
        let dates = stmt
            .query_map(params![subject_id.0], |row| row.get::<_, NaiveDate>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dates)
    }
}
