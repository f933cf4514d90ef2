//! Service layer
//!
//! The publish loop, the publish-result handler and the lifecycle
//! controller that wires them to the ports.

pub mod controller;
pub mod publish_loop;
pub mod result_handler;

pub use controller::{BridgeController, RunReport};
pub use publish_loop::{LoopExit, PublishLoop};
pub use result_handler::LoggingPublishHandler;
