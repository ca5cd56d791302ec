// ==========================================
// 阅卷点试卷调配系统 - 阅卷点主数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约定: 删除站点会级联删除其考试/评卷人记录，需为受影响科目发布事件
// ==========================================

use crate::domain::site::SiteInfo;
use crate::domain::types::{SiteId, SubjectId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::service::events::{DataChangeEvent, OptionalListener};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 阅卷点仓储
/// 职责: 管理 site 表的 CRUD 操作
pub struct SiteRepository {
    conn: Arc<Mutex<Connection>>,
    listener: OptionalListener,
}

impl SiteRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            listener: OptionalListener::none(),
        }
    }

    /// 注入数据变更监听者（级联删除时失效缓存）
    pub fn with_listener(mut self, listener: OptionalListener) -> Self {
        self.listener = listener;
        self
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或更新阅卷点（location 覆盖）
    pub fn upsert(&self, site: &SiteInfo) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO site (site_id, location) VALUES (?1, ?2)
            ON CONFLICT(site_id) DO UPDATE SET location = excluded.location
            "#,
            params![site.site_id.0, site.location],
        )?;
        Ok(())
    }

    /// 确保阅卷点存在（不覆盖已有名称）
    pub fn ensure_exists(&self, site_id: SiteId) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO site (site_id, location) VALUES (?1, '')",
            params![site_id.0],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, site_id: SiteId) -> RepositoryResult<Option<SiteInfo>> {
        let conn = self.get_conn()?;
        let site = conn
            .query_row(
                "SELECT site_id, location FROM site WHERE site_id = ?1",
                params![site_id.0],
                |row| {
                    Ok(SiteInfo {
                        site_id: SiteId(row.get(0)?),
                        location: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(site)
    }

    pub fn find_all(&self) -> RepositoryResult<Vec<SiteInfo>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT site_id, location FROM site ORDER BY site_id")?;
        let sites = stmt
            .query_map([], |row| {
                Ok(SiteInfo {
                    site_id: SiteId(row.get(0)?),
                    location: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sites)
    }

    /// 阅卷点展示名称映射（名称为空的站点不返回）
    pub fn display_names(&self) -> RepositoryResult<HashMap<SiteId, String>> {
        Ok(self
            .find_all()?
            .into_iter()
            .filter(|s| !s.location.trim().is_empty())
            .map(|s| (s.site_id, s.location))
            .collect())
    }

    /// 删除阅卷点
    ///
    /// exam / evaluator 表上的外键为 ON DELETE CASCADE，
    /// 删除前先收集受影响的科目，提交后逐科目发布 BulkImport 事件
    pub fn delete(&self, site_id: SiteId) -> RepositoryResult<usize> {
        let (affected, subjects) = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction()?;
            let subjects = {
                let mut stmt = tx.prepare(
                    r#"
                    SELECT subject_id FROM exam WHERE site_id = ?1
                    UNION
                    SELECT subject_id FROM evaluator WHERE site_id = ?1
                    ORDER BY subject_id
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![site_id.0], |row| Ok(SubjectId(row.get(0)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            let affected = tx.execute("DELETE FROM site WHERE site_id = ?1", params![site_id.0])?;
            tx.commit()?;
            (affected, subjects)
        };

        if affected > 0 {
            for subject_id in subjects {
                self.listener.notify(DataChangeEvent::bulk_import(
                    subject_id,
                    Some("SiteRepository::delete".to_string()),
                ));
            }
        }
        Ok(affected)
    }
}
