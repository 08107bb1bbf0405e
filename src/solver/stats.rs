use prettytable::{Cell, Row, Table};

use crate::solver::{
    engine::{ConstraintId, PerConstraintStats, SearchStats},
    problem::Problem,
};

/// Renders the per-constraint evaluation counters as a text table, one
/// row per constraint in declaration order.
pub fn render_stats_table(stats: &SearchStats, problem: &Problem) -> String {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Constraint"),
        Cell::new("ID"),
        Cell::new("Evaluations"),
        Cell::new("Rejections"),
        Cell::new("Rejection Rate"),
    ]));

    let mut sorted_stats: Vec<(&ConstraintId, &PerConstraintStats)> =
        stats.constraint_stats.iter().collect();

    sorted_stats.sort_by_key(|(id, _)| **id);

    for (constraint_id, constraint_stats) in sorted_stats {
        let label = problem.constraint_label(*constraint_id).unwrap_or("?");
        let rate = if constraint_stats.evaluations > 0 {
            constraint_stats.rejections as f64 / constraint_stats.evaluations as f64
        } else {
            0.0
        };

        table.add_row(Row::new(vec![
            Cell::new(label),
            Cell::new(&constraint_id.to_string()),
            Cell::new(&constraint_stats.evaluations.to_string()),
            Cell::new(&constraint_stats.rejections.to_string()),
            Cell::new(&format!("{rate:.2}")),
        ]));
    }

    table.to_string()
}
