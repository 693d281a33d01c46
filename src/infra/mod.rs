pub mod rpc;
pub mod session;
pub mod simulated;
pub mod tracker;
pub mod watcher;
