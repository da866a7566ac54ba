//! Infrastructure layer: credential stores, audit sinks, config, provisioning.

pub mod audit;
pub mod config;
pub mod seed;
pub mod store;

mod integration_tests;
