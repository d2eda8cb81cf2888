pub mod save_queue;
pub mod sink;
