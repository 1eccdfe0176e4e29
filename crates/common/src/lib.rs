//! Common types and configuration shared across Sightline crates.
//!
//! This crate contains the base building blocks for the Sightline gateway:
//! - **Configuration**: Strongly typed application configuration (`config`).
//! - **Models**: Wire types shared between the warehouse client, the
//!   reporting runtime, and the HTTP layer (`models`).
pub mod config;
pub mod models;
