pub mod activity;
pub mod health;
pub mod proxy;
pub mod queries;
pub mod servers;
pub mod settings;
pub mod sql;
