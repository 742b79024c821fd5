//! Piezoscope ingestion service.
//!
//! Connects a [`MessageSource`] to the core dispatcher and renders dashboard
//! frames on a fixed tick. The `piezoscoped` binary wires a
//! [`UdpBridgeSource`] to either a log or a JSON-lines presenter.
//!
//! ## Modules
//! - `source` - Message source trait and events
//! - `channel` - In-process source for embedding and tests
//! - `udp` - Topic-framed UDP datagram source
//! - `render` - Render loop and presenters
//! - `service` - Ingest loop, shutdown and task wiring

#![deny(static_mut_refs)]

pub mod channel;
pub mod render;
pub mod service;
pub mod source;
pub mod udp;

pub use channel::{ChannelPublisher, ChannelSource, channel};
pub use render::{JsonLinesPresenter, RenderLoop, TracingPresenter};
pub use service::{DEFAULT_STATS_INTERVAL, PiezoscopeService, ShutdownHandle, run_ingest};
pub use source::{MessageSource, SourceError, SourceEvent};
pub use udp::{UdpBridgeSource, recv_error_backoff, split_datagram};
