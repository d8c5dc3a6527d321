pub mod rebind_watcher;
