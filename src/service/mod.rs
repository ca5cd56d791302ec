// ==========================================
// 阅卷点试卷调配系统 - 服务层
// ==========================================
// 职责: 缓存、数据源、变更事件与调配服务编排
// ==========================================

pub mod allocation_service;
pub mod cache;
pub mod data_source;
pub mod error;
pub mod events;

pub use allocation_service::AllocationService;
pub use cache::{AllocationCache, CacheInvalidator, InMemoryAllocationCache};
pub use data_source::{AllocationDataSource, InMemoryDataSource, RepositoryDataSource};
pub use error::{ServiceError, ServiceResult};
pub use events::{DataChangeEvent, DataChangeListener, DataChangeType, NoOpListener, OptionalListener};
