mod message;
mod presence;
mod relay;

pub use message::SignalMessage;
pub use presence::{Binding, PresenceTracker};
pub use relay::SignalingRelay;
