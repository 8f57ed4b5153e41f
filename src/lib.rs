pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod features;
pub mod handlers;
pub mod middleware;
pub mod pipeline;

#[cfg(test)]
pub mod testing;
