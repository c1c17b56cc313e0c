// src/lib.rs

//! spec-watch: OpenAPI contract drift watcher library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
