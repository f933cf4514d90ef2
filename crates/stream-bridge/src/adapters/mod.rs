//! Adapters Layer
//!
//! Concrete implementations of the outbound ports:
//! - `DelimitedStreamSource` reads a length-delimited stream into the queue
//! - `BusBrokerClient` publishes onto the in-process topic bus

pub mod bus_broker;
pub mod delimited;
pub mod stream_source;

pub use bus_broker::BusBrokerClient;
pub use delimited::{encode_frame, DelimitedFrameReader};
pub use stream_source::{
    BoxedStream, DelimitedStreamSource, StdinConnector, StreamConnector, StreamRequest,
};
