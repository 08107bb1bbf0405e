use salto::solver::{engine::SolverEngine, problem::Problem, stats::render_stats_table};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let n: usize = args
        .get(1)
        .map(|a| a.parse().expect("N must be an integer"))
        .unwrap_or(6);

    // One scalar per row holding the queen's column.
    let mut problem = Problem::new();
    let names: Vec<String> = (0..n).map(|i| format!("q{i}")).collect();
    for name in &names {
        problem.add_scalar(name, 0, n as i64 - 1).unwrap();
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let row_diff = (j - i) as i64;
            problem
                .add_constraint(&[names[i].as_str(), names[j].as_str()], move |v| {
                    let a = v[0].read(&[0])?;
                    let b = v[1].read(&[0])?;
                    Ok(a != b && (a - b).abs() != row_diff)
                })
                .unwrap();
        }
    }

    println!("Solving N-Queens for N={n}");
    let engine = SolverEngine::new();
    let results = engine.solve_with_limit(&problem, 1).unwrap();

    println!("\n{}", render_stats_table(&results.stats, &problem));
    println!("Considered {} candidates", results.nodes());

    if let Some(solution) = results.solutions.first() {
        println!("\nFound a solution:");
        let mut board = vec![vec!['.'; n]; n];
        for (row, name) in names.iter().enumerate() {
            let col = solution.value(name).unwrap();
            board[row][col as usize] = 'Q';
        }
        for row in board {
            println!("{}", row.iter().collect::<String>());
        }
    } else {
        println!("\nNo solution found.");
    }
}
