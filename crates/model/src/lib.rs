pub mod catalog;
pub mod connection;
pub mod events;
pub mod log;
pub mod report;
pub mod rule;
pub mod selection;
