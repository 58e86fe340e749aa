mod evaluator;
mod message;
mod state;
pub mod test_harness;

pub use evaluator::{EvalError, Evaluator};
pub use message::render_message;
pub use state::RuleState;
