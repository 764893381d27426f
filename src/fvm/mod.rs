pub mod assembly;
pub mod time_integration;

pub use assembly::{assemble, Assembler, LinearSystem, ThetaStep};
pub use time_integration::{ThetaIntegrator, TimeScheme, TimeStepStats};
