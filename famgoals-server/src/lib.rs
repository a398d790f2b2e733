pub mod progress;
pub mod server;
pub mod storage;
