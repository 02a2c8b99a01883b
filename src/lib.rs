pub mod config;
pub mod reconcile_core;
pub mod sqlite_pragma;
