// ==========================================
// 阅卷点试卷调配系统 - 调配结果缓存
// ==========================================
// 职责: 按 AllocationKey 缓存调配结果（无过期时间）
// 失效: 写穿失效，考试/评卷人数据变更事件触发，不按时间过期
// ==========================================

use crate::domain::allocation::AllocationOutcome;
use crate::domain::types::{AllocationKey, SubjectId};
use crate::service::events::{DataChangeEvent, DataChangeListener};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, RwLock};
use tracing::debug;

// ==========================================
// Trait: AllocationCache
// ==========================================
pub trait AllocationCache: Send + Sync {
    fn get(&self, key: &AllocationKey) -> Option<Arc<AllocationOutcome>>;

    fn put(&self, key: AllocationKey, outcome: Arc<AllocationOutcome>);

    /// 失效单个键
    fn invalidate(&self, key: &AllocationKey);

    /// 失效某科目下的全部键（含 date=None 的汇总键）
    fn invalidate_subject(&self, subject_id: SubjectId);

    fn clear(&self);

    fn len(&self) -> usize;

    /// 科目失效代数；每次失效该科目的任一键都会递增
    fn generation(&self, _subject_id: SubjectId) -> u64 {
        0
    }

    /// 仅当科目代数未变化时写入（计算期间发生失效则丢弃结果）
    ///
    /// # 返回
    /// - true: 已写入
    /// - false: 结果已过期，未写入
    fn put_if_current(
        &self,
        key: AllocationKey,
        outcome: Arc<AllocationOutcome>,
        generation: u64,
    ) -> bool {
        if self.generation(key.subject_id) != generation {
            return false;
        }
        self.put(key, outcome);
        true
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==========================================
// InMemoryAllocationCache - 进程内缓存
// ==========================================
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<AllocationKey, Arc<AllocationOutcome>>,
    generations: HashMap<SubjectId, u64>,
}

impl CacheState {
    fn bump(&mut self, subject_id: SubjectId) {
        *self.generations.entry(subject_id).or_insert(0) += 1;
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAllocationCache {
    state: RwLock<CacheState>,
}

impl InMemoryAllocationCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AllocationCache for InMemoryAllocationCache {
    fn get(&self, key: &AllocationKey) -> Option<Arc<AllocationOutcome>> {
        // 锁中毒时视为未命中，由调用方重新计算
        self.state.read().ok()?.entries.get(key).cloned()
    }

    fn put(&self, key: AllocationKey, outcome: Arc<AllocationOutcome>) {
        if let Ok(mut state) = self.state.write() {
            state.entries.insert(key, outcome);
        }
    }

    fn invalidate(&self, key: &AllocationKey) {
        if let Ok(mut state) = self.state.write() {
            state.bump(key.subject_id);
            if state.entries.remove(key).is_some() {
                debug!(%key, "缓存失效");
            }
        }
    }

    fn invalidate_subject(&self, subject_id: SubjectId) {
        if let Ok(mut state) = self.state.write() {
            state.bump(subject_id);
            let before = state.entries.len();
            state.entries.retain(|k, _| k.subject_id != subject_id);
            debug!(%subject_id, removed = before - state.entries.len(), "科目缓存失效");
        }
    }

    fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            let subjects: Vec<SubjectId> = state
                .entries
                .keys()
                .map(|k| k.subject_id)
                .chain(state.generations.keys().copied())
                .collect();
            for subject_id in subjects {
                state.bump(subject_id);
            }
            state.entries.clear();
        }
    }

    fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    fn generation(&self, subject_id: SubjectId) -> u64 {
        self.state
            .read()
            .ok()
            .and_then(|s| s.generations.get(&subject_id).copied())
            .unwrap_or(0)
    }

    fn put_if_current(
        &self,
        key: AllocationKey,
        outcome: Arc<AllocationOutcome>,
        generation: u64,
    ) -> bool {
        // 检查与写入在同一把写锁内完成
        let Ok(mut state) = self.state.write() else {
            return false;
        };
        let current = state.generations.get(&key.subject_id).copied().unwrap_or(0);
        if current != generation {
            debug!(%key, generation, current, "计算期间数据已变更，丢弃结果");
            return false;
        }
        state.entries.insert(key, outcome);
        true
    }
}

// ==========================================
// CacheInvalidator - 事件 → 缓存失效
// ==========================================
// 考试记录变更: 失效 (subject, date) 与 (subject, *)
// 评卷人变更 / 批量导入 / 手动: 失效整个科目
pub struct CacheInvalidator {
    cache: Arc<dyn AllocationCache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn AllocationCache>) -> Self {
        Self { cache }
    }
}

impl DataChangeListener for CacheInvalidator {
    fn on_data_changed(&self, event: &DataChangeEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match event.date {
            Some(date) => {
                self.cache
                    .invalidate(&AllocationKey::new(event.subject_id, date));
                self.cache
                    .invalidate(&AllocationKey::subject_only(event.subject_id));
            }
            None => self.cache.invalidate_subject(event.subject_id),
        }
        Ok(())
    }
}
