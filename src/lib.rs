//! Call Center Communication Pipeline - Library
//!
//! Re-exports modules for integration testing and external use.

pub mod clients;
pub mod config;
pub mod demo;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod repository;
pub mod service;
pub mod types;
