//! Service wiring: ingest loop plus render loop over shared stores.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use piezoscope_config::{ConfigError, PiezoscopeConfig};
use piezoscope_core::{
    Dispatch, DispatchStats, IngestionDispatcher, LocalClock, ScalarChannelStore,
    SensorWindowStore, SystemClock,
};
use piezoscope_view::{DashboardLayout, Presenter};
use tokio::sync::broadcast;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info, trace, warn};

use crate::render::RenderLoop;
use crate::source::{MessageSource, SourceEvent};

/// How often ingestion counters are logged.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Requests a graceful stop of a running [`PiezoscopeService`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if self.tx.send(()).is_err() {
            debug!("Shutdown requested after service stopped");
        }
    }
}

/// Stops the service when the owning task ends, including by panic.
struct StopOnExit(broadcast::Sender<()>);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        if self.0.send(()).is_err() {
            debug!("Service already stopped");
        }
    }
}

/// Ingestion daemon over one message source.
pub struct PiezoscopeService<C = SystemClock> {
    dispatcher: IngestionDispatcher<C>,
    layout: DashboardLayout,
    render_tick: Duration,
    stats_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl<C: LocalClock + Clone + 'static> PiezoscopeService<C> {
    /// Build the stores, router and estimators described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the routing table is invalid.
    pub fn from_config(config: &PiezoscopeConfig, clock: C) -> Result<Self, ConfigError> {
        let dispatcher = IngestionDispatcher::new(
            config.router()?,
            config.offset_registry(),
            Arc::new(config.window_store()),
            Arc::new(config.scalar_store()),
            clock,
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Ok(Self {
            dispatcher,
            layout: config.layout().clone(),
            render_tick: Duration::from_millis(config.render_interval_ms),
            stats_interval: DEFAULT_STATS_INTERVAL,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn with_stats_interval(mut self, stats_interval: Duration) -> Self {
        self.stats_interval = stats_interval;
        self
    }

    pub fn windows(&self) -> Arc<SensorWindowStore> {
        Arc::clone(self.dispatcher.windows())
    }

    pub fn scalars(&self) -> Arc<ScalarChannelStore> {
        Arc::clone(self.dispatcher.scalars())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Run until the source ends or shutdown is requested.
    ///
    /// The render loop runs on its own task and only reads the stores. A
    /// presenter failure stops the whole service. The source is closed on
    /// the way out, even when the render task panicked, and the final
    /// counters are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the render task panicked.
    pub async fn run<S, P>(self, mut source: S, presenter: P) -> anyhow::Result<DispatchStats>
    where
        S: MessageSource,
        P: Presenter + 'static,
    {
        let Self {
            mut dispatcher,
            layout,
            render_tick,
            stats_interval,
            shutdown_tx,
            mut shutdown_rx,
        } = self;

        let render = RenderLoop {
            layout,
            windows: Arc::clone(dispatcher.windows()),
            scalars: Arc::clone(dispatcher.scalars()),
            clock: dispatcher.clock().clone(),
            presenter,
            tick: render_tick,
        };
        let render_rx = shutdown_tx.subscribe();
        let render_stop = StopOnExit(shutdown_tx.clone());
        let render_handle = tokio::spawn(async move {
            let _stop = render_stop;
            let result = render.run(render_rx).await;
            if let Err(e) = &result {
                error!(error = %e, "Render loop failed, stopping service");
            }
            result
        });

        info!("Piezoscope service started");
        run_ingest(&mut source, &mut dispatcher, &mut shutdown_rx, stats_interval).await;

        if shutdown_tx.send(()).is_err() {
            debug!("Render loop already stopped");
        }
        let render_outcome = render_handle.await;

        if let Err(e) = source.close().await {
            warn!(error = %e, "Failed to close message source");
        }

        match render_outcome.context("Render task panicked")? {
            Ok(frames) => debug!(frames, "Render task finished"),
            Err(e) => warn!(error = %e, "Render task ended with an error"),
        }

        let stats = dispatcher.stats();
        info!(
            messages = stats.messages,
            malformed = stats.malformed,
            points = stats.points,
            "Piezoscope service stopped"
        );
        Ok(stats)
    }
}

/// Drive `dispatcher` from `source` until the source ends or `shutdown` fires.
///
/// Subscriptions are (re)issued on every `Connected` event. Malformed
/// messages are logged and skipped; they never stop the loop.
pub async fn run_ingest<S, C>(
    source: &mut S,
    dispatcher: &mut IngestionDispatcher<C>,
    shutdown: &mut broadcast::Receiver<()>,
    stats_interval: Duration,
) where
    S: MessageSource,
    C: LocalClock,
{
    let topics: Vec<String> = dispatcher.router().topics().map(str::to_string).collect();
    let period = stats_interval.max(Duration::from_millis(1));
    let mut stats_tick = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Shutdown requested");
                break;
            }
            _ = stats_tick.tick() => log_stats(dispatcher),
            event = source.next_event() => {
                let Some(event) = event else {
                    info!("Message source ended");
                    break;
                };
                handle_event(source, dispatcher, &topics, event).await;
            }
        }
    }
}

async fn handle_event<S, C>(
    source: &mut S,
    dispatcher: &mut IngestionDispatcher<C>,
    topics: &[String],
    event: SourceEvent,
) where
    S: MessageSource,
    C: LocalClock,
{
    match event {
        SourceEvent::Connected => {
            info!(topics = topics.len(), "Message source connected");
            for topic in topics {
                if let Err(e) = source.subscribe(topic).await {
                    warn!(topic = %topic, error = %e, "Subscribe failed");
                }
            }
        }
        SourceEvent::Disconnected { reason } => {
            warn!(reason = %reason, "Message source disconnected");
        }
        SourceEvent::Message { topic, payload } => match dispatcher.dispatch(&topic, &payload) {
            Ok(Dispatch::Ignored) => trace!(topic = %topic, "Message ignored"),
            Ok(outcome) => trace!(topic = %topic, ?outcome, "Message committed"),
            Err(e) => warn!(
                topic = %topic,
                kind = e.kind(),
                error = %e,
                "Dropping malformed message"
            ),
        },
    }
}

fn log_stats<C: LocalClock>(dispatcher: &IngestionDispatcher<C>) {
    let stats = dispatcher.stats();
    info!(
        messages = stats.messages,
        ignored = stats.ignored,
        malformed = stats.malformed,
        windowed_batches = stats.windowed_batches,
        scalar_updates = stats.scalar_updates,
        points = stats.points,
        local_points = stats.local_points,
        dropped_samples = stats.dropped_samples,
        buffered = dispatcher.windows().total_len(),
        "Ingestion stats"
    );
    for topic in dispatcher.router().topics() {
        debug!(
            topic,
            offset_ms = dispatcher.offsets().offset_ms(topic),
            "Clock offset"
        );
    }
}
