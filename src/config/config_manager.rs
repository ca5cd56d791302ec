// ==========================================
// 阅卷点试卷调配系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::allocation_config::AllocationConfig;
use crate::db::open_sqlite_connection;
use crate::domain::types::BalanceMode;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 删除 global scope 的配置值（恢复默认）
    pub fn remove_global_config_value(&self, key: &str) -> Result<bool, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
        )?;
        Ok(affected > 0)
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 此方法会覆盖现有的同名 global 配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    // ===== 调配参数 =====

    /// 读取平衡约束模式（缺省或非法值时为 STRICT）
    pub fn get_balance_mode(&self) -> Result<BalanceMode, Box<dyn Error>> {
        let Some(value) = self.get_config_value(config_keys::BALANCE_MODE)? else {
            return Ok(BalanceMode::default());
        };
        Ok(value.parse::<BalanceMode>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::BALANCE_MODE,
                raw_value = %value,
                "平衡模式配置格式错误，使用默认值"
            );
            BalanceMode::default()
        }))
    }

    /// 读取 big-M 下限（缺省、非法或非正数时为 None）
    pub fn get_big_m_floor(&self) -> Result<Option<i64>, Box<dyn Error>> {
        self.get_positive(config_keys::BIG_M_FLOOR)
    }

    /// 读取求解超时毫秒数（缺省、非法或非正数时为 None）
    pub fn get_solve_timeout_ms(&self) -> Result<Option<u64>, Box<dyn Error>> {
        Ok(self
            .get_positive(config_keys::SOLVE_TIMEOUT_MS)?
            .map(|v| v as u64))
    }

    /// 汇总为 AllocationConfig
    pub fn load_allocation_config(&self) -> Result<AllocationConfig, Box<dyn Error>> {
        Ok(AllocationConfig {
            balance_mode: self.get_balance_mode()?,
            big_m_floor: self.get_big_m_floor()?,
            solve_timeout_ms: self.get_solve_timeout_ms()?,
        })
    }

    fn get_positive(&self, key: &str) -> Result<Option<i64>, Box<dyn Error>> {
        let Some(value) = self.get_config_value(key)? else {
            return Ok(None);
        };
        match value.trim().parse::<i64>() {
            Ok(v) if v > 0 => Ok(Some(v)),
            _ => {
                tracing::warn!(config_key = key, raw_value = %value, "配置值非法，忽略");
                Ok(None)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    /// STRICT | RELAXED
    pub const BALANCE_MODE: &str = "allocation.balance_mode";
    pub const BIG_M_FLOOR: &str = "allocation.big_m_floor";
    pub const SOLVE_TIMEOUT_MS: &str = "allocation.solve_timeout_ms";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = manager().load_allocation_config().unwrap();
        assert_eq!(config, AllocationConfig::default());
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let manager = manager();
        manager
            .set_global_config_value(config_keys::BALANCE_MODE, "sideways")
            .unwrap();
        manager
            .set_global_config_value(config_keys::BIG_M_FLOOR, "-5")
            .unwrap();
        manager
            .set_global_config_value(config_keys::SOLVE_TIMEOUT_MS, "soon")
            .unwrap();

        let config = manager.load_allocation_config().unwrap();
        assert_eq!(config, AllocationConfig::default());
    }

    #[test]
    fn test_snapshot_restore() {
        let source = manager();
        source
            .set_global_config_value(config_keys::BALANCE_MODE, "relaxed")
            .unwrap();
        source
            .set_global_config_value(config_keys::SOLVE_TIMEOUT_MS, "1500")
            .unwrap();
        let snapshot = source.get_config_snapshot().unwrap();

        let target = manager();
        assert_eq!(target.restore_config_from_snapshot(&snapshot).unwrap(), 2);

        let config = target.load_allocation_config().unwrap();
        assert_eq!(config.balance_mode, BalanceMode::Relaxed);
        assert_eq!(config.solve_timeout_ms, Some(1500));
    }
}
