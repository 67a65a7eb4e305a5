pub mod notifier;
pub mod state;
