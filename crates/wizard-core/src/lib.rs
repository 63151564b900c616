pub mod action;
pub mod clock;
pub mod error;
pub mod event_bus;
pub mod export;
pub mod persistence;
pub mod preview;
pub mod readiness;
pub mod reducer;
pub mod state;
pub mod step;
pub mod store;
