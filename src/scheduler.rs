//! Poll loop driving the dashboard.
//!
//! One tokio task owns the [`Dashboard`] and processes a single event at a
//! time: a fast tick poll, a slow bar/P&L poll, a zoom repeat while a zoom
//! control is held, or a user command. Feed and broker calls run on the
//! blocking pool under a deadline; a call that fails or overruns skips its
//! cycle and leaves the displayed state untouched. Renderers read
//! [`DashboardSnapshot`]s from a `watch` channel.

use crate::domain::config::DashboardConfig;
use crate::domain::dashboard::{Dashboard, DashboardSnapshot};
use crate::domain::error::TradewindError;
use crate::domain::indicator::IndicatorSpec;
use crate::domain::position::Side;
use crate::domain::position_tracker::{CloseReport, PositionTracker};
use crate::domain::timeframe::{Timeframe, bars_to_fetch};
use crate::domain::viewport::ZoomAction;
use crate::ports::broker_port::BrokerPort;
use crate::ports::feed_port::FeedPort;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const COMMAND_QUEUE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Market order; `None` uses the configured lot.
    Place { side: Side, volume: Option<f64> },
    CloseAll,
    /// A single click: exactly one zoom step.
    Zoom(ZoomAction),
    /// Press and hold: repeat `action` every zoom-repeat period.
    HoldZoom(ZoomAction),
    /// Let go of a held control. Applies the click step.
    ReleaseZoom,
    SelectInterval(Timeframe),
    ApplyIndicator(IndicatorSpec),
    SelectSymbol(String),
    Shutdown,
}

/// Outcome of a user command worth reporting back.
#[derive(Debug)]
pub enum Notice {
    OrderPlaced { ticket: u64, side: Side, volume: f64 },
    PositionsClosed(CloseReport),
    Rejected(TradewindError),
}

pub struct SchedulerHandle {
    pub commands: mpsc::Sender<UserCommand>,
    pub snapshots: watch::Receiver<DashboardSnapshot>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
    pub task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the loop to stop and wait for it.
    pub async fn shutdown(self) {
        // A closed channel means the loop is already gone.
        let _ = self.commands.send(UserCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!("scheduler task ended abnormally: {e}");
        }
    }
}

pub struct PollScheduler {
    config: DashboardConfig,
    feed: Arc<dyn FeedPort>,
    tracker: Arc<PositionTracker>,
    dashboard: Dashboard,
    held: Option<ZoomAction>,
    snapshots: watch::Sender<DashboardSnapshot>,
    clock: fn() -> DateTime<Utc>,
}

fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

/// Run a blocking port call on the blocking pool, giving up after
/// `deadline`. The abandoned call is left to finish on its own.
async fn bounded<T, F>(deadline: Duration, what: &'static str, call: F) -> Result<T, TradewindError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TradewindError> + Send + 'static,
{
    match time::timeout(deadline, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(TradewindError::FeedUnavailable {
            reason: format!("{what} task failed: {join}"),
        }),
        Err(_) => {
            warn!(what, timeout_ms = deadline.as_millis() as u64, "call timed out");
            Err(TradewindError::FeedUnavailable {
                reason: format!("{what} timed out after {} ms", deadline.as_millis()),
            })
        }
    }
}

/// A skipped cycle is routine while the feed or broker is away; anything
/// else means the data itself is bad.
fn log_skip(cycle: &str, err: &TradewindError) {
    if err.is_transient() {
        debug!(cycle, "cycle skipped: {err}");
    } else {
        warn!(cycle, "cycle skipped: {err}");
    }
}

fn order_failed(err: TradewindError) -> TradewindError {
    match err {
        TradewindError::OrderFailed { .. } => err,
        other => TradewindError::OrderFailed {
            reason: other.to_string(),
        },
    }
}

impl PollScheduler {
    pub fn new(
        config: DashboardConfig,
        symbol: &str,
        feed: Arc<dyn FeedPort>,
        broker: Arc<dyn BrokerPort>,
    ) -> Self {
        let dashboard = Dashboard::new(symbol, &config);
        let tracker = Arc::new(PositionTracker::new(broker, config.trading.orders.clone()));
        let (snapshots, _) = watch::channel(dashboard.snapshot());
        Self {
            config,
            feed,
            tracker,
            dashboard,
            held: None,
            snapshots,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock, e.g. to replay recorded data.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.dashboard.snapshot()
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Seed the tick history, confirm the broker answers, and load the
    /// first bars. Any failure to reach the feed or broker here is fatal.
    pub async fn init(&mut self) -> Result<(), TradewindError> {
        info!(
            symbol = self.dashboard.symbol(),
            timeframe = %self.dashboard.timeframe(),
            indicator = %self.config.indicator,
            "starting dashboard"
        );
        self.seed().await.map_err(|e| TradewindError::Init {
            reason: format!("feed unreachable: {e}"),
        })?;

        let tracker = Arc::clone(&self.tracker);
        let symbol = self.dashboard.symbol().to_string();
        let pl = bounded(self.config.feed.fetch_timeout, "broker check", move || {
            tracker.aggregate_pl(&symbol)
        })
        .await
        .map_err(|e| TradewindError::Init {
            reason: format!("broker unreachable: {e}"),
        })?;
        self.dashboard.record_pl(Ok(pl));

        self.poll_bars().await;
        Ok(())
    }

    async fn seed(&mut self) -> Result<(), TradewindError> {
        let now = (self.clock)();
        let end = unix_seconds(now);
        let start = end - self.config.feed.history_seconds;
        let feed = Arc::clone(&self.feed);
        let symbol = self.dashboard.symbol().to_string();
        let history = bounded(self.config.feed.fetch_timeout, "history", move || {
            feed.fetch_historical_ticks(&symbol, start, end)
        })
        .await?;
        info!(
            symbol = self.dashboard.symbol(),
            ticks = history.len(),
            "history seeded"
        );
        self.dashboard.seed(history, end);
        self.publish();
        Ok(())
    }

    /// Fast cadence.
    pub async fn poll_tick(&mut self) {
        let feed = Arc::clone(&self.feed);
        let symbol = self.dashboard.symbol().to_string();
        let result = bounded(self.config.feed.fetch_timeout, "tick", move || {
            feed.fetch_latest_tick(&symbol)
        })
        .await;
        match result {
            Ok(tick) => {
                let now = unix_seconds((self.clock)());
                let fresh = tick.is_some();
                self.dashboard.ingest_tick(tick, now);
                if fresh {
                    self.publish();
                }
            }
            Err(e) => log_skip("tick", &e),
        }
    }

    /// Slow cadence: bars, indicator overlay and P/L.
    pub async fn poll_bars(&mut self) {
        let now = (self.clock)();
        let count = bars_to_fetch(self.dashboard.bar_count(), now, self.config.utc_offset);
        let feed = Arc::clone(&self.feed);
        let symbol = self.dashboard.symbol().to_string();
        let timeframe = self.dashboard.timeframe();
        let bars = bounded(self.config.feed.fetch_timeout, "bars", move || {
            feed.fetch_bars(&symbol, timeframe, count)
        })
        .await;
        if let Err(e) = bars.and_then(|bars| self.dashboard.ingest_bars(Some(bars))) {
            log_skip("bars", &e);
        }

        self.refresh_pl().await;
        self.publish();
    }

    async fn refresh_pl(&mut self) {
        let tracker = Arc::clone(&self.tracker);
        let symbol = self.dashboard.symbol().to_string();
        let pl = bounded(self.config.feed.fetch_timeout, "p/l", move || {
            tracker.aggregate_pl(&symbol)
        })
        .await;
        if let Err(e) = &pl {
            log_skip("p/l", e);
        }
        self.dashboard.record_pl(pl);
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.dashboard.snapshot());
    }

    fn zoom(&mut self, action: ZoomAction) {
        let now = unix_seconds((self.clock)());
        self.dashboard.apply_zoom(action, now);
        self.publish();
    }

    /// Process one user command to completion.
    pub async fn handle(&mut self, command: UserCommand) -> Option<Notice> {
        match command {
            UserCommand::Place { side, volume } => {
                let volume = volume.unwrap_or(self.config.trading.lot);
                let notice = self.place(side, volume).await;
                self.refresh_pl().await;
                self.publish();
                Some(notice)
            }
            UserCommand::CloseAll => {
                let notice = self.close_all().await;
                self.refresh_pl().await;
                self.publish();
                Some(notice)
            }
            UserCommand::Zoom(action) => {
                self.zoom(action);
                None
            }
            UserCommand::HoldZoom(action) => {
                self.held = Some(action);
                None
            }
            UserCommand::ReleaseZoom => {
                if let Some(action) = self.held.take() {
                    self.zoom(action);
                }
                None
            }
            UserCommand::SelectInterval(timeframe) => {
                info!(%timeframe, "timeframe selected");
                self.dashboard.select_interval(timeframe);
                self.poll_bars().await;
                None
            }
            UserCommand::ApplyIndicator(spec) => match self.dashboard.apply_config(spec) {
                Ok(()) => {
                    info!(indicator = %spec, "indicator applied");
                    self.publish();
                    None
                }
                Err(e) => Some(Notice::Rejected(e)),
            },
            UserCommand::SelectSymbol(symbol) => {
                if symbol == self.dashboard.symbol() {
                    return None;
                }
                info!(%symbol, "symbol selected");
                self.dashboard.select_symbol(&symbol);
                self.publish();
                if let Err(e) = self.seed().await {
                    warn!(%symbol, "history reseed failed: {e}");
                }
                self.poll_bars().await;
                None
            }
            UserCommand::Shutdown => None,
        }
    }

    async fn place(&mut self, side: Side, volume: f64) -> Notice {
        let Some(quote) = self.dashboard.quote() else {
            return Notice::Rejected(TradewindError::OrderFailed {
                reason: "no quote received yet".into(),
            });
        };
        let tracker = Arc::clone(&self.tracker);
        let symbol = self.dashboard.symbol().to_string();
        let placed = bounded(self.config.feed.fetch_timeout, "order", move || {
            tracker.place(&symbol, side, volume, &quote)
        })
        .await;
        match placed {
            Ok(ticket) => Notice::OrderPlaced {
                ticket,
                side,
                volume,
            },
            Err(e) => Notice::Rejected(order_failed(e)),
        }
    }

    async fn close_all(&mut self) -> Notice {
        let Some(quote) = self.dashboard.quote() else {
            return Notice::Rejected(TradewindError::OrderFailed {
                reason: "no quote received yet".into(),
            });
        };
        let tracker = Arc::clone(&self.tracker);
        let symbol = self.dashboard.symbol().to_string();
        let closed = bounded(self.config.feed.fetch_timeout, "close", move || {
            tracker.close_all(&symbol, &quote)
        })
        .await;
        match closed {
            Ok(report) => Notice::PositionsClosed(report),
            Err(e) => Notice::Rejected(order_failed(e)),
        }
    }

    /// Move the loop onto its own task.
    pub fn spawn(self) -> SchedulerHandle {
        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE);
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let snapshots = self.subscribe();
        let task = tokio::spawn(self.run(receiver, notice_tx));
        SchedulerHandle {
            commands,
            snapshots,
            notices,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<UserCommand>,
        notices: mpsc::UnboundedSender<Notice>,
    ) {
        let cadence = self.config.cadence;
        // tokio rejects a zero period.
        let period = |d: Duration| d.max(Duration::from_millis(1));
        let mut fast = time::interval(period(cadence.tick_interval));
        fast.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut slow = time::interval(period(cadence.bar_interval));
        slow.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let zoom_period = period(cadence.zoom_repeat);
        let mut repeat = time::interval_at(Instant::now() + zoom_period, zoom_period);
        repeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_ms = cadence.tick_interval.as_millis() as u64,
            bar_ms = cadence.bar_interval.as_millis() as u64,
            "poll loop running"
        );
        loop {
            tokio::select! {
                _ = fast.tick() => self.poll_tick().await,
                _ = slow.tick() => self.poll_bars().await,
                _ = repeat.tick(), if self.held.is_some() => {
                    if let Some(action) = self.held {
                        self.zoom(action);
                    }
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if matches!(command, UserCommand::Shutdown) {
                        break;
                    }
                    let pressed = matches!(command, UserCommand::HoldZoom(_));
                    if let Some(notice) = self.handle(command).await {
                        // Nobody listening is fine.
                        let _ = notices.send(notice);
                    }
                    if pressed {
                        repeat.reset();
                    }
                }
            }
        }
        info!("poll loop stopped");
    }
}
