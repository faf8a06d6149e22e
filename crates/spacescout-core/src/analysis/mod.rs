pub mod aggregate;
pub mod classify;
pub mod cleanup_plan;
