//! Ports - Trait definitions for the I/O seams of the service.

pub mod fetcher;
pub mod storage;
pub mod transcoder;
