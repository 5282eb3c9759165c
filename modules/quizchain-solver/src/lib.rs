pub mod chain;
pub mod fetch;
pub mod files;
pub mod payload;
pub mod plan;
pub mod prompts;
pub mod submit;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;


pub use chain::{solve_quiz_chain, ChainSolver, Solver, SolverDeps};
pub use fetch::{FetchError, FileFetcher, HttpFileFetcher};
pub use submit::{AnswerSubmitter, HttpSubmitter, SubmitError};
