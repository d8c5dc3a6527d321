pub mod replication_channel;
