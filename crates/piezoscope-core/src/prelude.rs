//! Convenience re-exports for wiring a pipeline.

pub use crate::clock::{LocalClock, ManualClock, SystemClock};
pub use crate::dispatcher::{Dispatch, DispatchStats, IngestionDispatcher};
pub use crate::error::{IngestError, RouterError};
pub use crate::offset::{ClockOffsetEstimator, OffsetRegistry, OffsetScope};
pub use crate::router::{Route, ScalarBinding, SensorBinding, TopicRouter};
pub use crate::sample::{Sample, SensorKey};
pub use crate::scalar::ScalarChannelStore;
pub use crate::window::SensorWindowStore;
pub use crate::{DEFAULT_OFFSET_SAMPLES, DEFAULT_WINDOW_MS, MAX_OFFSET_SAMPLES};
