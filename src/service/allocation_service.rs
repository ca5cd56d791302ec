// ==========================================
// 阅卷点试卷调配系统 - 调配服务
// ==========================================
// 职责: 缓存优先的调配计算入口
// 并发:
// - 不同键之间互不影响
// - 同一键的“计算 + 写缓存”由键级互斥锁保护，并发请求只计算一次
// - 求解在 spawn_blocking 中执行，可配置超时（超时视为求解器失败）
// ==========================================

use crate::domain::allocation::AllocationOutcome;
use crate::domain::types::AllocationKey;
use crate::engine::error::AllocationError;
use crate::engine::AllocationEngine;
use crate::service::cache::AllocationCache;
use crate::service::data_source::AllocationDataSource;
use crate::service::error::{ServiceError, ServiceResult};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

// ==========================================
// KeyedLocks - 键级互斥锁
// ==========================================
// 锁表只保留正在使用的键；最后一个持有者释放时移除条目
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<AllocationKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    fn acquire(&self, key: AllocationKey) -> KeyLease<'_> {
        let lock = match self.locks.lock() {
            Ok(mut locks) => locks.entry(key).or_default().clone(),
            // 锁表中毒时退化为不加锁（允许重复计算）
            Err(_) => Arc::new(tokio::sync::Mutex::new(())),
        };
        KeyLease {
            locks: self,
            key,
            lock,
        }
    }

    fn release(&self, key: &AllocationKey, lock: &Arc<tokio::sync::Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // 锁表 + 当前持有者两份引用：没有其他等待者
        let idle = locks
            .get(key)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(key);
        }
    }

    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

/// 键级锁的持有凭证，drop 时（含请求被取消）尝试回收锁表条目
struct KeyLease<'a> {
    locks: &'a KeyedLocks,
    key: AllocationKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.key, &self.lock);
    }
}

// ==========================================
// AllocationService - 调配服务
// ==========================================
pub struct AllocationService {
    engine: AllocationEngine,
    source: Arc<dyn AllocationDataSource>,
    cache: Arc<dyn AllocationCache>,
    key_locks: KeyedLocks,
    computations: AtomicU64,
}

impl AllocationService {
    pub fn new(
        engine: AllocationEngine,
        source: Arc<dyn AllocationDataSource>,
        cache: Arc<dyn AllocationCache>,
    ) -> Self {
        Self {
            engine,
            source,
            cache,
            key_locks: KeyedLocks::default(),
            computations: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<dyn AllocationCache> {
        &self.cache
    }

    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    /// 实际执行的计算次数（不含缓存命中）
    pub fn computation_count(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    /// 当前锁表中的键数（空闲时为 0）
    pub fn active_key_locks(&self) -> usize {
        self.key_locks.len()
    }

    /// 获取调配结果（缓存优先）
    #[instrument(skip(self), fields(%key))]
    pub async fn get_allocation(&self, key: AllocationKey) -> ServiceResult<Arc<AllocationOutcome>> {
        if let Some(hit) = self.cache.get(&key) {
            debug!("缓存命中");
            return Ok(hit);
        }

        // _guard 先于 lease 释放
        let lease = self.key_locks.acquire(key);
        let _guard = lease.lock.lock().await;

        // 等锁期间可能已由其他请求写入
        if let Some(hit) = self.cache.get(&key) {
            debug!("等待后缓存命中");
            return Ok(hit);
        }

        let generation = self.cache.generation(key.subject_id);
        let outcome = Arc::new(self.compute(key).await?);

        if !self.cache.put_if_current(key, outcome.clone(), generation) {
            warn!("计算期间数据已变更，本次结果不写入缓存");
        }
        Ok(outcome)
    }

    /// 直接计算（绕过缓存）
    #[instrument(skip(self), fields(%key))]
    pub async fn compute(&self, key: AllocationKey) -> ServiceResult<AllocationOutcome> {
        let exams = self.source.load_exam_records(&key).await?;
        let evaluators = self.source.load_evaluator_records(key.subject_id).await?;

        self.computations.fetch_add(1, Ordering::Relaxed);
        let engine = self.engine.clone();
        let task = tokio::task::spawn_blocking(move || {
            engine.allocate_records(&key, &exams, &evaluators)
        });

        let joined = match self.engine.config().solve_timeout() {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "求解超时");
                    return Err(ServiceError::Allocation(AllocationError::Solver(format!(
                        "求解超时 ({} ms)",
                        limit.as_millis()
                    ))));
                }
            },
            None => task.await,
        };

        let outcome = joined.map_err(|e| ServiceError::TaskJoin(e.to_string()))??;
        info!(no_data = outcome.is_no_data(), "调配计算完成");
        Ok(outcome)
    }

    /// 批量获取多个键（并发执行，各键互不影响）
    pub async fn get_many(
        &self,
        keys: &[AllocationKey],
    ) -> Vec<(AllocationKey, ServiceResult<Arc<AllocationOutcome>>)> {
        let results = join_all(keys.iter().map(|key| self.get_allocation(*key))).await;
        keys.iter().copied().zip(results).collect()
    }
}
