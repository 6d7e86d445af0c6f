// src/middleware/mod.rs
pub mod cache;
pub mod rate_limit;
pub mod security;
