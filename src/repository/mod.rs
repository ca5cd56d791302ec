// ==========================================
// 阅卷点试卷调配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod evaluator_repo;
pub mod exam_repo;
pub mod site_repo;
pub mod subject_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use evaluator_repo::EvaluatorRepository;
pub use exam_repo::ExamRepository;
pub use site_repo::SiteRepository;
pub use subject_repo::SubjectRepository;
