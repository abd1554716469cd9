mod migrations;
mod sqlite_store;
mod team_store;
mod token_store;
mod user_store;
mod util;

pub use sqlite_store::SqliteStore;
