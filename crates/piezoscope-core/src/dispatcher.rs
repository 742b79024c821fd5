//! Ingestion dispatcher.
//!
//! Turns one `(topic, payload)` event into store updates:
//!
//! 1. unknown topic → ignored;
//! 2. payload parsed as a JSON object, otherwise the message is dropped with
//!    an [`IngestError`] and no store is touched;
//! 3. windowed topics: every bound field is normalized into samples, the
//!    earliest remote timestamp of the batch feeds the clock offset estimator,
//!    then corrected samples for all keys are committed in one batch;
//! 4. scalar topics: temperature/humidity are coerced and written.
//!
//! The dispatcher is driven from a single task; the stores it writes to are
//! shared with readers through `Arc`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::clock::{LocalClock, SystemClock};
use crate::error::IngestError;
use crate::offset::OffsetRegistry;
use crate::payload::{self, FieldSamples, ScalarReading};
use crate::router::{Route, ScalarBinding, SensorBinding, TopicRouter};
use crate::sample::{Sample, SensorKey};
use crate::scalar::ScalarChannelStore;
use crate::window::SensorWindowStore;

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Topic is not in the routing table.
    Ignored,
    /// Windowed batch committed.
    Windowed {
        keys: usize,
        points: usize,
        /// Points stamped with local time because they had no remote timestamp.
        local_points: usize,
        dropped: usize,
    },
    /// Scalar channels written.
    Scalar(ScalarReading),
}

/// Running counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub messages: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub windowed_batches: u64,
    pub scalar_updates: u64,
    pub points: u64,
    pub local_points: u64,
    pub dropped_samples: u64,
}

/// Routes, corrects and commits inbound messages.
pub struct IngestionDispatcher<C = SystemClock> {
    router: TopicRouter,
    offsets: OffsetRegistry,
    windows: Arc<SensorWindowStore>,
    scalars: Arc<ScalarChannelStore>,
    clock: C,
    stats: DispatchStats,
}

impl<C: LocalClock> IngestionDispatcher<C> {
    pub fn new(
        router: TopicRouter,
        offsets: OffsetRegistry,
        windows: Arc<SensorWindowStore>,
        scalars: Arc<ScalarChannelStore>,
        clock: C,
    ) -> Self {
        Self {
            router,
            offsets,
            windows,
            scalars,
            clock,
            stats: DispatchStats::default(),
        }
    }

    /// Handle one inbound message.
    ///
    /// # Errors
    ///
    /// Returns an [`IngestError`] when the payload of a routed topic cannot be
    /// parsed. The message is dropped and no store is mutated; callers log the
    /// error and continue with the next message.
    pub fn dispatch(&mut self, topic: &str, payload: &[u8]) -> Result<Dispatch, IngestError> {
        self.stats.messages = self.stats.messages.saturating_add(1);

        let Some(route) = self.router.route(topic) else {
            self.stats.ignored = self.stats.ignored.saturating_add(1);
            trace!(topic, "Ignoring message on unrouted topic");
            return Ok(Dispatch::Ignored);
        };

        let object = match payload::parse_object(payload) {
            Ok(object) => object,
            Err(e) => {
                self.stats.malformed = self.stats.malformed.saturating_add(1);
                return Err(e);
            }
        };

        match route.clone() {
            Route::Windowed(bindings) => Ok(self.commit_windowed(topic, &bindings, &object)),
            Route::Scalar(binding) => Ok(self.commit_scalar(&binding, &object)),
        }
    }

    fn commit_windowed(
        &mut self,
        topic: &str,
        bindings: &[SensorBinding],
        object: &Map<String, Value>,
    ) -> Dispatch {
        let now = self.clock.now_ms();

        let fields: Vec<(SensorKey, FieldSamples)> = bindings
            .iter()
            .filter_map(|binding| {
                object
                    .get(&binding.field)
                    .map(|field| (binding.key.clone(), payload::normalize_field(field)))
            })
            .collect();

        // One canonical offset sample per batch: the earliest remote timestamp.
        let seed = fields
            .iter()
            .filter_map(|(_, field)| field.min_remote_ts())
            .min();

        let estimator = self.offsets.estimator_mut(topic);
        if let Some(remote_ts) = seed {
            estimator.observe(remote_ts, now);
        }

        if let Some(first_ts) = fields.iter().find_map(|(_, field)| field.first_remote_ts()) {
            debug!(
                topic,
                first_remote_ts = first_ts,
                local_now = now,
                lag_ms = now.saturating_sub(first_ts),
                offset_ms = estimator.average(),
                "Windowed batch received"
            );
        }

        let mut points = 0usize;
        let mut local_points = 0usize;
        let mut dropped = 0usize;
        let keys = fields.len();

        let entries: Vec<(SensorKey, Vec<Sample>)> = fields
            .into_iter()
            .map(|(key, field)| {
                dropped = dropped.saturating_add(field.dropped);
                let samples: Vec<Sample> = field
                    .samples
                    .iter()
                    .map(|raw| match raw.remote_ts {
                        Some(remote_ts) => Sample::new(estimator.correct(remote_ts), raw.value),
                        None => {
                            local_points = local_points.saturating_add(1);
                            Sample::new(now, raw.value)
                        }
                    })
                    .collect();
                points = points.saturating_add(samples.len());
                (key, samples)
            })
            .collect();

        if dropped > 0 {
            debug!(topic, dropped, "Dropped sample entries without a usable value");
        }

        self.windows.append_batch(entries, now);

        self.stats.windowed_batches = self.stats.windowed_batches.saturating_add(1);
        self.stats.points = self.stats.points.saturating_add(points as u64);
        self.stats.local_points = self.stats.local_points.saturating_add(local_points as u64);
        self.stats.dropped_samples = self.stats.dropped_samples.saturating_add(dropped as u64);

        Dispatch::Windowed {
            keys,
            points,
            local_points,
            dropped,
        }
    }

    fn commit_scalar(&mut self, binding: &ScalarBinding, object: &Map<String, Value>) -> Dispatch {
        let reading = payload::parse_scalar_reading(object);
        self.scalars.set_many([
            (binding.temperature.as_str(), reading.temperature),
            (binding.humidity.as_str(), reading.humidity),
        ]);
        self.stats.scalar_updates = self.stats.scalar_updates.saturating_add(1);
        debug!(
            temperature = reading.temperature,
            humidity = reading.humidity,
            "Scalar reading committed"
        );
        Dispatch::Scalar(reading)
    }

    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    pub fn offsets(&self) -> &OffsetRegistry {
        &self.offsets
    }

    pub fn windows(&self) -> &Arc<SensorWindowStore> {
        &self.windows
    }

    pub fn scalars(&self) -> &Arc<ScalarChannelStore> {
        &self.scalars
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
