#![allow(warnings)]

pub mod cache;
pub mod config;
pub mod errors; // Structured error handling
pub mod logger;
pub mod prelude;
pub mod services;
pub mod tasks;
