mod controller;
mod mode;
mod outcome;

pub use controller::{RunController, RunSettings};
pub use mode::RunMode;
pub use outcome::RunOutcome;
