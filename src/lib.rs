pub mod config;
pub mod llm;
pub mod quiz;
pub mod recommend;
pub mod resolver;
pub mod server;
pub mod spotify;
pub mod sqlite_persistence;
pub mod vibe_store;
