//! User domain events and the channel they are published on.

pub mod channel;
pub mod event;
pub mod in_memory_channel;

pub use channel::{ChannelError, EventChannel, Subscription, JSON_CONTENT_TYPE};
pub use event::{UserEvent, UserOperation};
pub use in_memory_channel::{InMemoryEventChannel, PublishedMessage};
