//! Message transport between the page agent and the background agent

pub mod bus;
pub mod messages;

pub use bus::{DEFAULT_RELAY_CAPACITY, MessageRelay, Publisher};
pub use messages::{BackgroundRequest, Envelope, Outbound, PageAction};
