//! Record daemon: HTTP request layer, record service and the bounded batch processor.

pub mod batch;
pub mod config;
pub mod http;
pub mod pool;
pub mod service;
