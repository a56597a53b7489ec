pub mod config;
pub mod model;
pub mod platform;
pub mod store;
pub mod time;
pub mod votes;
