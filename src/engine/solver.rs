// ==========================================
// 阅卷点试卷调配系统 - 整数规划求解器
// ==========================================
// 职责: 定义求解器接口，并提供基于 good_lp + microlp 的默认实现
// 说明: 求解为阻塞式单线程调用，异步上下文中应放到 spawn_blocking 执行
// ==========================================

use crate::engine::model::{BalanceSense, ExchangeModel, ExchangeSolution};
use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, instrument};

/// 求解器错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("模型不可行")]
    Infeasible,

    #[error("求解失败: {0}")]
    Failure(String),
}

impl From<ResolutionError> for SolverError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolverError::Infeasible,
            other => SolverError::Failure(other.to_string()),
        }
    }
}

// ==========================================
// Trait: ExchangeSolver
// ==========================================
// 实现者: MicroLpSolver（默认），测试中可替换为桩实现
pub trait ExchangeSolver: Send + Sync {
    /// 求解器名称（日志用）
    fn name(&self) -> &'static str;

    /// 求解调配模型，返回最优解
    fn solve(&self, model: &ExchangeModel) -> Result<ExchangeSolution, SolverError>;
}

// ==========================================
// MicroLpSolver - 纯 Rust 分支定界求解
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct MicroLpSolver;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self
    }
}

fn sum_of(vars: &[Variable], indices: impl Iterator<Item = usize>) -> Expression {
    indices.map(|i| vars[i]).sum()
}

impl ExchangeSolver for MicroLpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    #[instrument(skip(self, model), fields(
        donors = model.donors.len(),
        receivers = model.receivers.len(),
        pairs = model.pairs.len(),
        big_m = model.big_m
    ))]
    fn solve(&self, model: &ExchangeModel) -> Result<ExchangeSolution, SolverError> {
        if model.pairs.is_empty() {
            return Ok(ExchangeSolution::default());
        }

        let mut vars = ProblemVariables::new();
        let mut move_vars: Vec<Variable> = Vec::with_capacity(model.pairs.len());
        let mut link_vars: Vec<Variable> = Vec::with_capacity(model.pairs.len());

        for pair in &model.pairs {
            move_vars.push(vars.add(variable().integer().min(0.0).max(pair.upper as f64)));
            link_vars.push(vars.add(variable().binary()));
        }

        let objective: Expression = link_vars.iter().copied().sum();
        let big_m = model.big_m as f64;
        let mut problem = vars.minimise(objective).using(microlp);

        // big-M 耦合: moves > 0 ⇔ linked = 1
        for (m, l) in move_vars.iter().copied().zip(link_vars.iter().copied()) {
            problem = problem.with(constraint!(l <= m));
            problem = problem.with(constraint!(m <= big_m * l));
        }

        for (donor_index, donor) in model.donors.iter().enumerate() {
            let outgoing = sum_of(&move_vars, model.pairs_of_donor(donor_index));
            let surplus = donor.imbalance as f64;
            problem = match model.donor_sense {
                BalanceSense::Equal => problem.with(constraint!(outgoing == surplus)),
                BalanceSense::AtMost => problem.with(constraint!(outgoing <= surplus)),
            };
        }

        for (receiver_index, receiver) in model.receivers.iter().enumerate() {
            let incoming = sum_of(&move_vars, model.pairs_of_receiver(receiver_index));
            let deficit = receiver.imbalance as f64;
            problem = match model.receiver_sense {
                BalanceSense::Equal => problem.with(constraint!(incoming == deficit)),
                BalanceSense::AtMost => problem.with(constraint!(incoming <= deficit)),
            };
        }

        let solution = problem.solve()?;

        let mut moves = BTreeMap::new();
        let mut objective = 0usize;
        for (i, pair) in model.pairs.iter().enumerate() {
            let count = solution.value(move_vars[i]).round() as i64;
            if solution.value(link_vars[i]).round() as i64 == 1 {
                objective += 1;
            }
            if count > 0 {
                moves.insert((model.donor_id(pair), model.receiver_id(pair)), count);
            }
        }

        debug!(objective, active_pairs = moves.len(), "求解完成");

        Ok(ExchangeSolution { moves, objective })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::site::{AllocationRequest, Site};
    use crate::domain::types::{BalanceMode, SiteId};
    use crate::engine::classifier::classify;
    use crate::engine::model::build_model;

    fn model_for(sites: Vec<Site>, mean: i64, mode: BalanceMode) -> ExchangeModel {
        let c = classify(&AllocationRequest::new(sites), mean);
        build_model(&c, mode, None).unwrap()
    }

    #[test]
    fn test_solve_scenario_a_needs_two_links() {
        let model = model_for(
            vec![
                Site::new(1, 10, 1),
                Site::new(2, 3, 1),
                Site::new(3, 2, 0),
                Site::new(4, 15, 1),
            ],
            10,
            BalanceMode::Strict,
        );

        let solution = MicroLpSolver::new().solve(&model).unwrap();

        assert_eq!(solution.objective, 2);
        assert_eq!(solution.moves.get(&(SiteId(3), SiteId(2))), Some(&2));
        assert_eq!(solution.moves.get(&(SiteId(4), SiteId(2))), Some(&5));
    }

    #[test]
    fn test_solve_prefers_single_link_when_possible() {
        // 调出点 1 (盈余 6) 可一次性补齐调入点 3 (缺口 6)，调出点 2 (盈余 2) 补齐调入点 4
        let model = model_for(
            vec![
                Site::new(1, 16, 1),
                Site::new(2, 12, 1),
                Site::new(3, 4, 1),
                Site::new(4, 8, 1),
            ],
            10,
            BalanceMode::Strict,
        );

        let solution = MicroLpSolver::new().solve(&model).unwrap();
        assert_eq!(solution.objective, 2);
        assert_eq!(solution.moves.get(&(SiteId(1), SiteId(3))), Some(&6));
        assert_eq!(solution.moves.get(&(SiteId(2), SiteId(4))), Some(&2));
    }

    #[test]
    fn test_solve_empty_model() {
        let model = model_for(vec![Site::new(1, 10, 1)], 10, BalanceMode::Strict);
        let solution = MicroLpSolver::new().solve(&model).unwrap();
        assert_eq!(solution, ExchangeSolution::default());
    }

    #[test]
    fn test_resolution_error_mapping() {
        assert_eq!(SolverError::from(ResolutionError::Infeasible), SolverError::Infeasible);
        assert!(matches!(
            SolverError::from(ResolutionError::Unbounded),
            SolverError::Failure(_)
        ));
    }
}
