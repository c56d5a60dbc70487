pub mod control;
pub mod health;

// Re-export all handlers for easy route registration
pub use control::{close_handler, get_state_handler, open_handler};
pub use health::{health_handler, health_live_handler, metrics_handler};
