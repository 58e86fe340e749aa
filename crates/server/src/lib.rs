pub mod config;
pub mod hub;
pub mod metrics;
pub mod middleware;
pub mod rest;
pub mod shutdown;
