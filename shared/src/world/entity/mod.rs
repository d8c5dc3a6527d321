pub mod replicated_entity;
