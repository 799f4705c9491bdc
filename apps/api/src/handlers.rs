pub mod health;
pub mod pending_changes;
pub mod sync;
