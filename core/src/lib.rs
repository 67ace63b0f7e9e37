pub mod client;
pub mod config;
pub mod error;
pub mod instance;
pub mod job;
pub mod registry;
pub mod security;
pub mod selection;
pub mod user;
pub mod utils;

#[cfg(test)]
mod tests;
