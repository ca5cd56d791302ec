// ==========================================
// 阅卷点试卷调配系统 - 调配引擎
// ==========================================
// 职责: 校验 → 目标比例 → 分类 → 建模 → 求解 → 结果提取
// 输入: AllocationRequest（或原始记录 + AllocationKey）
// 输出: AllocationOutcome (NoData | Solved)
// 红线: 引擎不做持久化、不做缓存，纯计算
// ==========================================

use crate::config::AllocationConfig;
use crate::domain::allocation::{AllocationOutcome, AllocationPlan, Move};
use crate::domain::site::{AllocationRequest, EvaluatorRecord, ExamRecord};
use crate::domain::types::AllocationKey;
use crate::engine::aggregation::{aggregate_records, validate_request};
use crate::engine::classifier::{classify, target_ratio, Classification};
use crate::engine::error::{AllocationError, EngineResult};
use crate::engine::model::{build_model, ExchangeModel, ExchangeSolution};
use crate::engine::solver::{ExchangeSolver, MicroLpSolver, SolverError};
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// AllocationEngine - 调配引擎
// ==========================================
#[derive(Clone)]
pub struct AllocationEngine {
    solver: Arc<dyn ExchangeSolver>,
    config: AllocationConfig,
}

impl AllocationEngine {
    /// 使用默认求解器 (microlp)
    pub fn new(config: AllocationConfig) -> Self {
        Self::with_solver(Arc::new(MicroLpSolver::new()), config)
    }

    /// 注入自定义求解器
    pub fn with_solver(solver: Arc<dyn ExchangeSolver>, config: AllocationConfig) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 从原始记录计算调配方案
    #[instrument(skip(self, exams, evaluators), fields(
        %key,
        exam_records = exams.len(),
        evaluator_records = evaluators.len()
    ))]
    pub fn allocate_records(
        &self,
        key: &AllocationKey,
        exams: &[ExamRecord],
        evaluators: &[EvaluatorRecord],
    ) -> EngineResult<AllocationOutcome> {
        let request = aggregate_records(key, exams, evaluators)?;
        self.allocate(&request)
    }

    /// 计算调配方案
    ///
    /// 规则:
    /// 1) 评卷人总数为 0（含空请求）→ NoData
    /// 2) 单站点，或盈余/缺口合计均为 0 → 空方案，不调用求解器
    /// 3) 盈余/缺口合计不符（STRICT，含无调出点或无调入点）或求解器判定不可行 → Infeasible
    /// 4) RELAXED 下无调出点或无调入点 → 空方案
    #[instrument(skip(self, request), fields(
        sites = request.sites.len(),
        balance_mode = %self.config.balance_mode,
        solver = self.solver.name()
    ))]
    pub fn allocate(&self, request: &AllocationRequest) -> EngineResult<AllocationOutcome> {
        validate_request(request)?;

        let mean = match target_ratio(request) {
            Some(mean) => mean,
            None => {
                info!("评卷人总数为 0，无法计算目标比例");
                return Ok(AllocationOutcome::NoData);
            }
        };

        let classification = classify(request, mean);
        info!(
            mean,
            donors = classification.donors.len(),
            receivers = classification.receivers.len(),
            balanced = classification.balanced.len(),
            surplus_total = classification.surplus_total(),
            deficit_total = classification.deficit_total(),
            "站点分类完成"
        );

        // 单站点无交换对象；盈余与缺口均为 0 时整体已平衡
        if request.sites.len() <= 1
            || (!classification.has_exchanges() && classification.is_balanced())
        {
            return Ok(empty_plan(classification));
        }

        // STRICT 下合计不符（含只有一侧非空）在此报 Infeasible
        let model = build_model(
            &classification,
            self.config.balance_mode,
            self.config.big_m_floor,
        )?;

        if !classification.has_exchanges() {
            return Ok(empty_plan(classification));
        }

        let solution = self.solver.solve(&model).map_err(|e| match e {
            SolverError::Infeasible => {
                warn!("求解器判定模型不可行");
                AllocationError::Infeasible {
                    surplus_total: classification.surplus_total(),
                    deficit_total: classification.deficit_total(),
                }
            }
            SolverError::Failure(msg) => AllocationError::Solver(msg),
        })?;

        let plan = extract_plan(classification, &model, solution);
        info!(
            total_moves = plan.total_moves,
            exams_moved = plan.exams_moved,
            "调配方案生成完成"
        );

        Ok(AllocationOutcome::Solved(plan))
    }
}

fn empty_plan(classification: Classification) -> AllocationOutcome {
    AllocationOutcome::Solved(AllocationPlan::empty(
        classification.mean,
        classification.donors,
        classification.receivers,
    ))
}

/// 从求解结果提取调配方案（按 (from, to) 排序）
fn extract_plan(
    classification: Classification,
    model: &ExchangeModel,
    solution: ExchangeSolution,
) -> AllocationPlan {
    let moves: Vec<Move> = solution
        .moves
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|((from_site, to_site), count)| Move {
            from_site,
            to_site,
            count,
        })
        .collect();

    AllocationPlan {
        mean: classification.mean,
        total_moves: solution.objective,
        exams_moved: moves.iter().map(|m| m.count).sum(),
        moves,
        donors: classification.donors,
        receivers: classification.receivers,
        big_m: model.big_m,
    }
}
