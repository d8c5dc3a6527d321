pub mod entity_registry;
pub mod error;
pub mod scan_schedule;
pub mod structural_key;
