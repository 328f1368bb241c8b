// fallwatch-api: Async Rust client for the fall-detection sensor service

pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod reports;
pub mod sensors;
pub mod transport;

pub use client::SensorClient;
pub use error::Error;
pub use models::{DeviceStatsResponse, SensorReading};
pub use transport::{TlsMode, TransportConfig};
