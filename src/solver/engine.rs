//! The odometer search loop with conflict-directed skipping.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::debug;

use crate::{
    error::{Result, SolverError},
    solver::{
        constraint::ConstraintTable,
        planner::plan_increment_order,
        problem::Problem,
        solution::Solution,
        store::AssignmentStore,
        view::{clear_all_touches, snapshot_all_touches},
    },
};

/// A numeric identifier for a single constraint in the problem, in
/// declaration order.
pub type ConstraintId = usize;

/// Evaluation counters for a single constraint.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerConstraintStats {
    /// How many candidates this constraint was evaluated on.
    pub evaluations: u64,
    /// How many of those evaluations returned `false`.
    pub rejections: u64,
}

/// How a solve run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The odometer overflowed its most significant position.
    Exhausted,
    /// The requested number of solutions was found.
    SolutionLimit,
    /// The abort token was triggered.
    Aborted,
}

/// Statistics for the entire search.
#[derive(Debug, Clone)]
pub struct SearchStats {
    /// Candidates considered, including the final overflow state.
    pub nodes: u64,
    pub termination: Termination,
    /// A map from [`ConstraintId`] to that constraint's counters.
    pub constraint_stats: HashMap<ConstraintId, PerConstraintStats>,
}

/// Everything a solve returns: the solutions in discovery order plus
/// the search statistics.
#[derive(Debug, Clone)]
pub struct Results {
    pub solutions: Vec<Solution>,
    pub stats: SearchStats,
}

impl Results {
    /// Number of candidates considered, including the final overflow.
    pub fn nodes(&self) -> u64 {
        self.stats.nodes
    }
}

/// Cooperative cancellation handle, checked once per search iteration.
///
/// Clone it, hand one copy to the engine and keep the other; flipping
/// it (from any thread) makes the solve return its partial solution
/// list. Timeouts are layered on top by the caller.
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The main engine for enumerating the solutions of a [`Problem`].
///
/// The engine walks the Cartesian product of per-cell ranges with an
/// odometer whose increment order comes from
/// [`plan_increment_order`](crate::solver::planner): positions no
/// constraint reads are incremented fastest. When a constraint rejects
/// a candidate, the deepest position it actually read (its *skip
/// index*) becomes the next increment position, which steps over every
/// candidate differing only in cells the constraint never looked at.
/// Constraints are also re-sorted as the search runs so the fastest
/// failers are tried first.
pub struct SolverEngine {
    reorder_interval: u64,
    abort: Option<AbortToken>,
}

impl SolverEngine {
    pub fn new() -> Self {
        Self {
            reorder_interval: 1,
            abort: None,
        }
    }

    /// Re-sorts the constraint table every `interval` iterations
    /// instead of every iteration. Larger intervals trade adaptivity
    /// for a little speed; values below 1 are clamped to 1.
    pub fn with_reorder_interval(mut self, interval: u64) -> Self {
        self.reorder_interval = interval.max(1);
        self
    }

    pub fn with_abort_token(mut self, token: AbortToken) -> Self {
        self.abort = Some(token);
        self
    }

    /// Enumerates every solution of `problem`.
    pub fn solve(&self, problem: &Problem) -> Result<Results> {
        self.run(problem, None)
    }

    /// Enumerates at most `max_solutions` solutions, in discovery
    /// order.
    pub fn solve_with_limit(&self, problem: &Problem, max_solutions: usize) -> Result<Results> {
        self.run(problem, Some(max_solutions))
    }

    fn run(&self, problem: &Problem, max_solutions: Option<usize>) -> Result<Results> {
        if problem.constraint_count() == 0 {
            return Err(SolverError::EmptyProblem.into());
        }

        let store = AssignmentStore::new(problem);
        let views = store.alloc_views(problem);
        let total_cells = store.len();
        let mut table = ConstraintTable::build(problem, &views);
        let order = plan_increment_order(&mut table, &views, total_cells)?;

        let mut constraint_stats: HashMap<ConstraintId, PerConstraintStats> = HashMap::new();
        let mut solutions = Vec::new();
        let mut touched = vec![false; total_cells];
        let mut nodes: u64 = 0;
        let mut iteration: u64 = 0;

        if max_solutions == Some(0) {
            return Ok(Results {
                solutions,
                stats: SearchStats {
                    nodes,
                    termination: Termination::SolutionLimit,
                    constraint_stats,
                },
            });
        }

        let termination = loop {
            if self.abort.as_ref().is_some_and(AbortToken::is_aborted) {
                break Termination::Aborted;
            }
            nodes += 1;

            let exploring = iteration % self.reorder_interval == 0;
            let mut increment_index = 0usize;
            let mut solution_ok = true;

            for entry in table.entries_mut() {
                clear_all_touches(&views);
                let counters = constraint_stats.entry(entry.id).or_default();
                counters.evaluations += 1;

                let holds = match entry.evaluate() {
                    Ok(holds) => holds,
                    Err(source) => {
                        return Err(SolverError::ConstraintEvaluationFailed {
                            constraint: entry.label().to_string(),
                            nodes,
                            source: Box::new(source),
                        }
                        .into());
                    }
                };
                if holds {
                    entry.estimated_quality = 0;
                    continue;
                }

                counters.rejections += 1;
                solution_ok = false;
                snapshot_all_touches(&views, &mut touched);
                // skip index: 1-based position, in increment order, of
                // the deepest cell the failing predicate read
                let Some(skip) = order.iter().position(|&p| touched[p]).map(|k| k + 1) else {
                    return Err(SolverError::NoCellsRead {
                        constraint: entry.label().to_string(),
                        nodes,
                    }
                    .into());
                };
                entry.estimated_quality = skip;
                increment_index = increment_index.max(skip);
                if !exploring {
                    break;
                }
            }

            if exploring {
                table.sort_by_quality_desc();
            }

            if solution_ok {
                solutions.push(Solution::capture(problem, &store));
                if max_solutions.is_some_and(|m| solutions.len() >= m) {
                    break Termination::SolutionLimit;
                }
                increment_index = 1;
            }

            if order.is_empty() {
                // a zero-cell problem has exactly one candidate
                nodes += 1;
                break Termination::Exhausted;
            }
            debug_assert!(increment_index >= 1, "odometer step requires a skip index");
            if !step_odometer(&store, &order, increment_index) {
                // the overflowed state still counts as a considered
                // candidate
                nodes += 1;
                break Termination::Exhausted;
            }
            iteration += 1;
        };

        debug!(
            nodes,
            solutions = solutions.len(),
            ?termination,
            "search finished"
        );

        Ok(Results {
            solutions,
            stats: SearchStats {
                nodes,
                termination,
                constraint_stats,
            },
        })
    }
}

impl Default for SolverEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Advances the flat assignment to the next candidate.
///
/// Positions below `increment_index` (1-based, in increment order)
/// reset to their lower bounds, the position at `increment_index` is
/// bumped, and the carry propagates upward. Returns `false` once the
/// most significant position overflows its upper bound, which means the
/// product is exhausted.
fn step_odometer(store: &AssignmentStore, order: &[usize], increment_index: usize) -> bool {
    for &position in &order[..increment_index - 1] {
        store.set_cell(position, store.lower(position));
    }
    store.inc_cell(order[increment_index - 1]);
    for i in increment_index - 1..order.len() - 1 {
        let position = order[i];
        if store.cell(position) > store.upper(position) {
            store.set_cell(position, store.lower(position));
            store.inc_cell(order[i + 1]);
        } else {
            break;
        }
    }
    let top = order[order.len() - 1];
    store.cell(top) <= store.upper(top)
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn};
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::error::Error;

    fn kind(error: &Error) -> &SolverError {
        match error {
            Error::Inner { inner, .. } => inner,
        }
    }

    fn two_scalars_less_than() -> Problem {
        let mut problem = Problem::new();
        problem.add_scalar("a", 0, 2).unwrap();
        problem.add_scalar("b", 0, 2).unwrap();
        problem
            .add_constraint(&["a", "b"], |v| Ok(v[0].read(&[0])? < v[1].read(&[0])?))
            .unwrap();
        problem
    }

    fn pairs(results: &Results) -> Vec<(i64, i64)> {
        results
            .solutions
            .iter()
            .map(|s| (s.value("a").unwrap(), s.value("b").unwrap()))
            .collect()
    }

    #[test]
    fn single_scalar_enumerates_in_domain_order() {
        let mut problem = Problem::new();
        problem.add_scalar("x", 0, 2).unwrap();
        problem
            .add_constraint_on("x", |v| Ok(v[0].read(&[0])? >= 1))
            .unwrap();

        let results = SolverEngine::new().solve(&problem).unwrap();
        let values: Vec<i64> = results
            .solutions
            .iter()
            .map(|s| s.value("x").unwrap())
            .collect();
        assert_eq!(values, vec![1, 2]);
        // three candidates plus the final overflow state
        assert_eq!(results.nodes(), 4);
        assert_eq!(results.stats.termination, Termination::Exhausted);
    }

    #[test]
    fn two_scalars_yield_solutions_in_odometer_order() {
        let results = SolverEngine::new().solve(&two_scalars_less_than()).unwrap();
        assert_eq!(pairs(&results), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn infeasible_problems_walk_the_whole_domain() {
        let mut problem = Problem::new();
        problem.add_scalar("x", 0, 1).unwrap();
        problem
            .add_constraint_on("x", |v| Ok(v[0].read(&[0])? > 5))
            .unwrap();

        let results = SolverEngine::new().solve(&problem).unwrap();
        assert!(results.solutions.is_empty());
        assert_eq!(results.nodes(), 3);
    }

    #[test]
    fn solution_limit_truncates_in_discovery_order() {
        let problem = two_scalars_less_than();
        let results = SolverEngine::new().solve_with_limit(&problem, 2).unwrap();
        assert_eq!(pairs(&results), vec![(0, 1), (0, 2)]);
        assert_eq!(results.stats.termination, Termination::SolutionLimit);

        let exhaustive = SolverEngine::new().solve(&problem).unwrap();
        assert!(results.nodes() < exhaustive.nodes());
    }

    #[test]
    fn limit_of_zero_returns_immediately() {
        let results = SolverEngine::new()
            .solve_with_limit(&two_scalars_less_than(), 0)
            .unwrap();
        assert!(results.solutions.is_empty());
        assert_eq!(results.nodes(), 0);
    }

    #[test]
    fn grid_cell_sums_are_enumerated_exactly() {
        let mut problem = Problem::new();
        problem
            .add_variable(
                "g",
                ArrayD::zeros(IxDyn(&[2, 2])),
                ArrayD::from_elem(IxDyn(&[2, 2]), 1),
            )
            .unwrap();
        problem
            .add_constraint_on("g", |v| {
                let mut sum = 0;
                for i in 0..2 {
                    for j in 0..2 {
                        sum += v[0].read(&[i, j])?;
                    }
                }
                Ok(sum == 2)
            })
            .unwrap();

        let results = SolverEngine::new().solve(&problem).unwrap();
        assert_eq!(results.solutions.len(), 6);
        let mut seen = Vec::new();
        for solution in &results.solutions {
            let grid = solution.grid("g").unwrap().clone();
            assert_eq!(grid.shape(), &[2, 2]);
            assert_eq!(grid.sum(), 2);
            assert!(!seen.contains(&grid), "duplicate solution {grid:?}");
            seen.push(grid);
        }
    }

    #[test]
    fn failures_skip_unread_subtrees() {
        let mut problem = Problem::new();
        problem.add_scalar("a", 0, 9).unwrap();
        problem.add_scalar("b", 0, 9).unwrap();
        problem
            .add_constraint_on("a", |v| Ok(v[0].read(&[0])? == 7))
            .unwrap();

        let results = SolverEngine::new().solve(&problem).unwrap();
        // all ten values of b, but only under a == 7
        assert_eq!(results.solutions.len(), 10);
        assert!(
            results.nodes() < 100,
            "expected conflict-directed skipping, considered {} candidates",
            results.nodes()
        );
    }

    #[test]
    fn solutions_respect_bounds_and_constraints() {
        let mut problem = Problem::new();
        problem.add_scalar("a", 2, 4).unwrap();
        problem.add_scalar("b", -1, 1).unwrap();
        problem
            .add_constraint(&["a", "b"], |v| {
                Ok((v[0].read(&[0])? + v[1].read(&[0])?) % 2 == 0)
            })
            .unwrap();

        let results = SolverEngine::new().solve(&problem).unwrap();
        assert!(!results.solutions.is_empty());
        for solution in &results.solutions {
            let a = solution.value("a").unwrap();
            let b = solution.value("b").unwrap();
            assert!((2..=4).contains(&a));
            assert!((-1..=1).contains(&b));
            assert_eq!((a + b) % 2, 0);
        }
    }

    #[test]
    fn solving_twice_is_idempotent() {
        let problem = two_scalars_less_than();
        let engine = SolverEngine::new();
        let first = engine.solve(&problem).unwrap();
        let second = engine.solve(&problem).unwrap();
        assert_eq!(first.solutions, second.solutions);
        assert_eq!(first.nodes(), second.nodes());
    }

    #[test]
    fn reorder_interval_does_not_change_the_solution_set() {
        let problem = two_scalars_less_than();
        let every = SolverEngine::new().solve(&problem).unwrap();
        let sparse = SolverEngine::new()
            .with_reorder_interval(5)
            .solve(&problem)
            .unwrap();
        assert_eq!(every.solutions, sparse.solutions);
    }

    #[test]
    fn aborted_solves_return_partial_results() {
        let token = AbortToken::new();
        token.abort();
        let results = SolverEngine::new()
            .with_abort_token(token)
            .solve(&two_scalars_less_than())
            .unwrap();
        assert!(results.solutions.is_empty());
        assert_eq!(results.stats.termination, Termination::Aborted);
        assert_eq!(results.nodes(), 0);
    }

    #[test]
    fn problems_without_constraints_are_rejected() {
        let mut problem = Problem::new();
        problem.add_scalar("x", 0, 1).unwrap();
        let err = SolverEngine::new().solve(&problem).unwrap_err();
        assert!(matches!(kind(&err), SolverError::EmptyProblem));
    }

    #[test]
    fn predicates_that_read_nothing_are_a_contract_bug() {
        let mut problem = Problem::new();
        problem.add_scalar("x", 0, 1).unwrap();
        problem.add_constraint_on("x", |_| Ok(false)).unwrap();

        let err = SolverEngine::new().solve(&problem).unwrap_err();
        assert!(matches!(kind(&err), SolverError::NoCellsRead { .. }));
    }

    #[test]
    fn predicate_errors_abort_the_solve() {
        let mut problem = Problem::new();
        problem.add_scalar("x", 0, 1).unwrap();
        problem
            .add_constraint_on("x", |_| Err(SolverError::Custom("boom".into())))
            .unwrap();

        let err = SolverEngine::new().solve(&problem).unwrap_err();
        match kind(&err) {
            SolverError::ConstraintEvaluationFailed { source, .. } => {
                assert!(matches!(**source, SolverError::Custom(_)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn out_of_range_reads_surface_as_evaluation_failures() {
        let mut problem = Problem::new();
        problem.add_scalar("x", 0, 1).unwrap();
        problem
            .add_constraint_on("x", |v| Ok(v[0].read(&[3])? == 0))
            .unwrap();

        let err = SolverEngine::new().solve(&problem).unwrap_err();
        match kind(&err) {
            SolverError::ConstraintEvaluationFailed { source, .. } => {
                assert!(matches!(**source, SolverError::IndexOutOfRange { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    fn compare(op: u8, x: i64, y: i64) -> bool {
        match op {
            0 => x < y,
            1 => x <= y,
            2 => x == y,
            3 => x != y,
            4 => x > y,
            _ => x >= y,
        }
    }

    #[test]
    fn random_problems_match_brute_force_enumeration() {
        let mut rng = StdRng::seed_from_u64(0x5a17);

        for _ in 0..60 {
            let cell_count = rng.gen_range(2..=6);
            let mut problem = Problem::new();
            let mut names = Vec::new();
            let mut lowers = Vec::new();
            let mut uppers = Vec::new();
            for i in 0..cell_count {
                let lo = rng.gen_range(-2..=2);
                let hi = lo + rng.gen_range(0..=2);
                let name = format!("v{i}");
                problem.add_scalar(&name, lo, hi).unwrap();
                names.push(name);
                lowers.push(lo);
                uppers.push(hi);
            }

            let mut comparisons = Vec::new();
            for _ in 0..rng.gen_range(1..=4) {
                let a = rng.gen_range(0..cell_count);
                let b = rng.gen_range(0..cell_count);
                let op = rng.gen_range(0..6u8);
                comparisons.push((a, b, op));
                problem
                    .add_constraint(&[names[a].as_str(), names[b].as_str()], move |v| {
                        Ok(compare(op, v[0].read(&[0])?, v[1].read(&[0])?))
                    })
                    .unwrap();
            }

            let mut expected = Vec::new();
            let mut assignment = lowers.clone();
            'product: loop {
                if comparisons
                    .iter()
                    .all(|&(a, b, op)| compare(op, assignment[a], assignment[b]))
                {
                    expected.push(assignment.clone());
                }
                let mut i = 0;
                loop {
                    if i == cell_count {
                        break 'product;
                    }
                    assignment[i] += 1;
                    if assignment[i] <= uppers[i] {
                        break;
                    }
                    assignment[i] = lowers[i];
                    i += 1;
                }
            }

            let results = SolverEngine::new().solve(&problem).unwrap();
            let mut got: Vec<Vec<i64>> = results
                .solutions
                .iter()
                .map(|s| names.iter().map(|n| s.value(n).unwrap()).collect())
                .collect();

            got.sort();
            let before_dedup = got.len();
            got.dedup();
            assert_eq!(got.len(), before_dedup, "duplicate solutions returned");
            expected.sort();
            assert_eq!(got, expected);
        }
    }
}
