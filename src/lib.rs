pub mod config;
pub mod error;
pub mod grpc;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{DispatchError, Result};
pub use metrics::{DeliveryMetrics, MetricsSnapshot};
pub use services::{DeliveryQueue, Dispatcher};
pub use store::MemoryStore;
