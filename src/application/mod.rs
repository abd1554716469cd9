pub mod config;
pub mod credentials;
pub mod search;
pub mod startup;
pub mod state;
