//! Salto is a finite-domain constraint solver built around an odometer
//! with conflict-directed skipping.
//!
//! A problem is a set of named integer variables — each a possibly
//! multi-dimensional grid with per-cell inclusive bounds — plus
//! predicate constraints over subsets of those variables. The engine
//! enumerates all (or the first N) assignments in the Cartesian product
//! of per-cell ranges that satisfy every constraint.
//!
//! # How the search works
//!
//! Predicates never see raw values; they read cells through
//! [`TouchTrackingView`]s that record every access. Before the search
//! starts, each predicate is probed once against the all-lower-bound
//! assignment and the engine derives an *increment order* from the
//! touch records: cells no constraint reads are incremented fastest,
//! cells read by the cheapest constraints become the most significant
//! odometer positions. During the search, a rejecting constraint's
//! touch record names the deepest position it depended on, and the
//! odometer jumps straight to incrementing that position — skipping
//! every candidate that differs only in cells the constraint never
//! looked at. Constraints are continuously re-sorted so the fastest
//! failers are evaluated first.
//!
//! [`TouchTrackingView`]: solver::view::TouchTrackingView
//!
//! # Example: all solutions of `a < b`
//!
//! ```
//! use salto::solver::{engine::SolverEngine, problem::Problem};
//!
//! let mut problem = Problem::new();
//! problem.add_scalar("a", 0, 2).unwrap();
//! problem.add_scalar("b", 0, 2).unwrap();
//! problem
//!     .add_constraint(&["a", "b"], |v| Ok(v[0].read(&[0])? < v[1].read(&[0])?))
//!     .unwrap();
//!
//! let results = SolverEngine::new().solve(&problem).unwrap();
//! assert_eq!(results.solutions.len(), 3);
//! for solution in &results.solutions {
//!     assert!(solution.value("a").unwrap() < solution.value("b").unwrap());
//! }
//! ```
//!
//! Grid variables are declared with [`ndarray`] bounds and come back as
//! grids of the same shape:
//!
//! ```
//! use ndarray::{ArrayD, IxDyn};
//! use salto::solver::{engine::SolverEngine, problem::Problem};
//!
//! let mut problem = Problem::new();
//! problem
//!     .add_variable(
//!         "g",
//!         ArrayD::zeros(IxDyn(&[2, 2])),
//!         ArrayD::from_elem(IxDyn(&[2, 2]), 1),
//!     )
//!     .unwrap();
//! problem
//!     .add_constraint_on("g", |v| {
//!         Ok(v[0].read(&[0, 0])? + v[0].read(&[1, 1])? == 2)
//!     })
//!     .unwrap();
//!
//! let results = SolverEngine::new().solve(&problem).unwrap();
//! for solution in &results.solutions {
//!     let grid = solution.grid("g").unwrap();
//!     assert_eq!(grid.shape(), &[2, 2]);
//!     assert_eq!(grid[[0, 0]] + grid[[1, 1]], 2);
//! }
//! ```
pub mod error;
pub mod solver;
