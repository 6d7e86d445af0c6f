// src/services/mod.rs
pub mod access;
pub mod course;
pub mod major;
pub mod review;
pub mod trending;
