// src/handlers/mod.rs
pub mod api;
