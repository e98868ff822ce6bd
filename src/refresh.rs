//! Tokio task driving `RefreshScheduler` against the real clock.
//!
//! The UI talks to it through `RefreshCommand`s and hears back through
//! `AppEvent`s. At most one snapshot fetch runs at a time; a result that
//! arrives after shutdown is dropped with the task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::feed_api::SnapshotFetcher;
use crate::scheduler::{FetchTicket, RefreshScheduler, SchedulerView};
use crate::types::{AppEvent, FeedSnapshot};

pub use crate::types::RefreshCommand;

#[derive(Debug, Clone, Copy)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub tick: Duration,
    pub auto_update: bool,
}

impl From<&Config> for RefreshSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            interval: cfg.refresh_interval(),
            tick: cfg.tick(),
            auto_update: cfg.auto_update,
        }
    }
}

// tokio's clock, so paused-time tests drive the countdown too.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

type FetchDone = (FetchTicket, Result<FeedSnapshot>);

struct Driver {
    scheduler: RefreshScheduler,
    fetcher: Arc<dyn SnapshotFetcher>,
    done_tx: UnboundedSender<FetchDone>,
    events: UnboundedSender<AppEvent>,
    in_flight: Option<JoinHandle<()>>,
    last_view: Option<SchedulerView>,
}

impl Driver {
    fn start_fetch(&mut self, ticket: FetchTicket) {
        log::debug!("📡 fetch #{} starting", ticket.id());
        let fetcher = Arc::clone(&self.fetcher);
        let done_tx = self.done_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = fetcher.fetch_snapshot().await;
            let _ = done_tx.send((ticket, result));
        }));
    }

    /// Forward the scheduler view when it changed. Returns false once the UI
    /// side has gone away.
    fn publish(&mut self) -> bool {
        let view = self.scheduler.view();
        if self.last_view == Some(view) {
            return true;
        }
        self.last_view = Some(view);
        self.events.send(AppEvent::Schedule(view)).is_ok()
    }

    fn settle(&mut self, ticket: FetchTicket, result: Result<FeedSnapshot>) -> bool {
        if !self.scheduler.fetch_settled(ticket, now()) {
            return true;
        }
        self.in_flight = None;
        let event = match result {
            Ok(snapshot) => {
                log::info!("✅ fetch #{} ok: {} items", ticket.id(), snapshot.items.len());
                AppEvent::Snapshot(snapshot)
            }
            Err(e) => {
                log::error!("❌ fetch #{} failed: {e:#}", ticket.id());
                AppEvent::FetchFailed(format!("{e:#}"))
            }
        };
        self.events.send(event).is_ok()
    }

    fn shutdown(&mut self) {
        self.scheduler.cancel();
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

/// Run until `Shutdown`, until the command channel closes, or until the
/// event receiver is dropped. Performs the initial load immediately.
pub async fn run_refresh(
    settings: RefreshSettings,
    fetcher: Arc<dyn SnapshotFetcher>,
    mut commands: UnboundedReceiver<RefreshCommand>,
    events: UnboundedSender<AppEvent>,
) -> Result<()> {
    log::info!(
        "🔄 refresh loop starting (interval {:?}, tick {:?}, auto-update {})",
        settings.interval,
        settings.tick,
        settings.auto_update
    );

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<FetchDone>();
    let mut driver = Driver {
        scheduler: RefreshScheduler::new(settings.interval),
        fetcher,
        done_tx,
        events,
        in_flight: None,
        last_view: None,
    };

    let mut ticker = tokio::time::interval(settings.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    driver.scheduler.set_auto_update(settings.auto_update, now());
    if let Some(ticket) = driver.scheduler.request_now(now()) {
        driver.start_fetch(ticket);
    }
    let mut alive = driver.publish();

    while alive {
        tokio::select! {
            _ = ticker.tick(), if driver.scheduler.is_counting() => {
                if let Some(ticket) = driver.scheduler.tick(now()) {
                    driver.start_fetch(ticket);
                }
            }
            cmd = commands.recv() => match cmd {
                None | Some(RefreshCommand::Shutdown) => break,
                Some(RefreshCommand::SetAutoUpdate(on)) => {
                    log::info!("⏯️ auto-refresh {}", if on { "on" } else { "off" });
                    driver.scheduler.set_auto_update(on, now());
                }
                Some(RefreshCommand::SetInteracting(on)) => {
                    driver.scheduler.set_interacting(on, now());
                }
                Some(RefreshCommand::RefreshNow) => match driver.scheduler.request_now(now()) {
                    Some(ticket) => driver.start_fetch(ticket),
                    None => log::debug!("💤 manual refresh ignored, fetch already running"),
                },
            },
            Some((ticket, result)) = done_rx.recv() => {
                if !driver.settle(ticket, result) {
                    break;
                }
            }
        }
        alive = driver.publish();
    }

    driver.shutdown();
    log::info!("🛑 refresh loop stopped");
    Ok(())
}
