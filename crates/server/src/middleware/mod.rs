mod auth_layer;

pub use auth_layer::require_token;
