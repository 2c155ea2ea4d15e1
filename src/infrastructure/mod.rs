pub mod config;
pub mod error;
pub mod profile_client;
pub mod schedule_client;
pub mod slot_mapper;
pub mod token_store;
