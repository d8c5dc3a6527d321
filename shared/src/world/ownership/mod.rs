pub mod error;
pub mod ownership_arbiter;
