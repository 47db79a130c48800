//! Notification Adapters

pub mod in_memory;
pub mod log_notifier;

pub use in_memory::InMemoryNotifier;
pub use log_notifier::LogNotifier;
