//! Ingestion and windowing pipeline for piezoscope.
//!
//! Field devices publish piezo samples and temperature/humidity readings on
//! pub/sub topics, each with its own unsynchronized clock. This crate turns
//! those raw `(topic, payload)` events into per-sensor sliding windows stamped
//! in the local time base.
//!
//! ## Modules
//! - `router` - Static topic → sensor key routing table
//! - `offset` - Bounded running-average clock offset estimation
//! - `window` - Per-sensor time-bounded sample windows
//! - `scalar` - Last-write-wins scalar channels
//! - `payload` - JSON payload parsing and shape normalization
//! - `dispatcher` - Orchestrates parse → route → correct → commit
//! - `clock` - Local time sources (system and manual)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use piezoscope_core::prelude::*;
//!
//! let router = TopicRouter::new([(
//!     "iot/piezo",
//!     Route::windowed([SensorBinding::new("Sensor1", "Sensor1")]),
//! )])?;
//! let windows = Arc::new(SensorWindowStore::new(DEFAULT_WINDOW_MS));
//! let scalars = Arc::new(ScalarChannelStore::new());
//! let clock = ManualClock::new(1_000);
//! let mut dispatcher = IngestionDispatcher::new(
//!     router,
//!     OffsetRegistry::new(OffsetScope::Global, DEFAULT_OFFSET_SAMPLES),
//!     Arc::clone(&windows),
//!     scalars,
//!     clock,
//! );
//!
//! dispatcher.dispatch("iot/piezo", br#"{"Sensor1":{"v":1.5}}"#)?;
//! assert_eq!(windows.snapshot(&SensorKey::from("Sensor1"), 1_000).len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(static_mut_refs)]

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod offset;
pub mod payload;
pub mod prelude;
pub mod router;
pub mod sample;
pub mod scalar;
pub mod window;

pub use clock::{LocalClock, ManualClock, SystemClock};
pub use dispatcher::{Dispatch, DispatchStats, IngestionDispatcher};
pub use error::{IngestError, RouterError};
pub use offset::{ClockOffsetEstimator, OffsetRegistry, OffsetScope};
pub use payload::{RawSample, ScalarReading};
pub use router::{Route, ScalarBinding, SensorBinding, TopicRouter};
pub use sample::{Sample, SensorKey};
pub use scalar::ScalarChannelStore;
pub use window::SensorWindowStore;

/// Default retention window W in milliseconds.
pub const DEFAULT_WINDOW_MS: i64 = 20_000;

/// Default number of offset samples N kept by each estimator.
pub const DEFAULT_OFFSET_SAMPLES: usize = 20;

/// Largest N a configuration may ask for.
pub const MAX_OFFSET_SAMPLES: usize = 10_000;
