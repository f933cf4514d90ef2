//! Domain layer for the stream bridge
//!
//! Pure data types and the hand-off queue. No broker or network I/O.

pub mod event;
pub mod message;
pub mod queue;
pub mod state;

pub use event::PendingEvent;
pub use message::{Destination, OutboundMessage};
pub use queue::{handoff_queue, handoff_queue_with_metrics, EventDrain, EventSink, QueueClosed};
pub use state::BridgeState;
