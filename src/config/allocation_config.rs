// ==========================================
// 阅卷点试卷调配系统 - 调配参数
// ==========================================
// 职责: 调配引擎与调配服务的运行参数
// 来源: config_kv 表 (ConfigManager::load_allocation_config) 或代码默认值
// ==========================================

use crate::domain::types::BalanceMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// 平衡约束模式（默认 STRICT）
    pub balance_mode: BalanceMode,
    /// big-M 下限（None 表示完全按实例推导）
    pub big_m_floor: Option<i64>,
    /// 单次求解超时（毫秒，None 表示不限时）
    pub solve_timeout_ms: Option<u64>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            balance_mode: BalanceMode::Strict,
            big_m_floor: None,
            solve_timeout_ms: None,
        }
    }
}

impl AllocationConfig {
    pub fn with_balance_mode(mut self, balance_mode: BalanceMode) -> Self {
        self.balance_mode = balance_mode;
        self
    }

    pub fn with_solve_timeout(mut self, timeout: Duration) -> Self {
        self.solve_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn solve_timeout(&self) -> Option<Duration> {
        self.solve_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AllocationConfig::default();
        assert_eq!(config.balance_mode, BalanceMode::Strict);
        assert_eq!(config.big_m_floor, None);
        assert_eq!(config.solve_timeout(), None);
    }

    #[test]
    fn test_builder_helpers() {
        let config = AllocationConfig::default()
            .with_balance_mode(BalanceMode::Relaxed)
            .with_solve_timeout(Duration::from_secs(2));
        assert_eq!(config.balance_mode, BalanceMode::Relaxed);
        assert_eq!(config.solve_timeout_ms, Some(2_000));
    }
}
