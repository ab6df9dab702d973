pub mod types;
pub mod store;
pub mod orchestrator;

pub use types::*;
pub use store::*;
pub use orchestrator::*;
