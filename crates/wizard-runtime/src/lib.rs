pub mod catalog;
pub mod connection;
pub mod dry_run;
pub mod error;
pub mod migration;
pub mod settings;
