pub mod item;
pub mod session_state;

// Re-exports for convenience
pub use item::*;
pub use session_state::*;
