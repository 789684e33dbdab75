pub mod bounded;
pub mod fraction;

pub use bounded::{BoxBounds, MinimizerConfig, Minimum, Termination, minimize};
pub use fraction::{Allocation, ConvergenceWarning, FractionOptimizer};
