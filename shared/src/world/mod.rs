pub mod entity;
pub mod events;
pub mod ownership;
pub mod pose;
pub mod rebind;
pub mod registry;
pub mod replication;
pub mod world_type;
