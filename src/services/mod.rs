pub mod delivery_queue;
pub mod dispatch;
pub mod transport;

pub use delivery_queue::{DeliveryQueue, RetryPolicy};
pub use dispatch::{Dispatcher, IncomingPost, PublishOutcome};
pub use transport::{DeliveryTransport, SyntheticTransport};
