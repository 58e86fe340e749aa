mod alerts;
mod error;
mod health;
mod hub;
mod metrics;
mod router;
mod rules;
mod ws;

pub use router::{router, AppState};
pub use rules::RuleResponse;
