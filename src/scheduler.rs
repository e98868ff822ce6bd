//! Auto-refresh countdown state machine.
//!
//! The scheduler never reads the clock itself: every input carries the
//! current `Instant`, so the same code is driven by the tokio task in
//! `refresh` and by plain unit tests.

use std::time::{Duration, Instant};

/// Interval between automatic snapshot fetches.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Countdown tick; finer than a second so the visible countdown stays smooth.
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Counting,
    Fetching,
    Paused,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Counting => "counting",
            Phase::Fetching => "fetching",
            Phase::Paused => "paused",
        }
    }
}

/// Identifies one fetch. Only the ticket currently in flight may settle it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Read-only state for display.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SchedulerView {
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub interval_seconds: u64,
}

#[derive(Copy, Clone, Debug)]
struct Countdown {
    started_at: Instant,
    initial: Duration,
}

impl Countdown {
    fn remaining(&self, now: Instant) -> Duration {
        self.initial
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }
}

#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    phase: Phase,
    // The only timer. Replacing it cancels the previous one.
    countdown: Option<Countdown>,
    paused_remaining: Option<Duration>,
    remaining: Duration,
    auto_update: bool,
    interacting: bool,
    in_flight: Option<FetchTicket>,
    next_ticket: u64,
}

fn ceil_secs(d: Duration) -> u64 {
    if d.subsec_nanos() > 0 {
        d.as_secs() + 1
    } else {
        d.as_secs()
    }
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(Duration::from_secs(1));
        Self {
            interval,
            phase: Phase::Idle,
            countdown: None,
            paused_remaining: None,
            remaining: interval,
            auto_update: false,
            interacting: false,
            in_flight: None,
            next_ticket: 1,
        }
    }

    // ----- getters -----
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn is_counting(&self) -> bool {
        self.phase == Phase::Counting
    }
    pub fn auto_update(&self) -> bool {
        self.auto_update
    }
    pub fn is_interacting(&self) -> bool {
        self.interacting
    }
    pub fn in_flight(&self) -> Option<FetchTicket> {
        self.in_flight
    }
    pub fn has_timer(&self) -> bool {
        self.countdown.is_some()
    }
    pub fn remaining(&self) -> Duration {
        self.remaining
    }
    pub fn remaining_seconds(&self) -> u64 {
        ceil_secs(self.remaining)
    }
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn view(&self) -> SchedulerView {
        SchedulerView {
            phase: self.phase,
            remaining_seconds: self.remaining_seconds(),
            interval_seconds: ceil_secs(self.interval),
        }
    }

    // ----- inputs -----
    pub fn set_auto_update(&mut self, enabled: bool, now: Instant) {
        if enabled == self.auto_update {
            return;
        }
        self.auto_update = enabled;

        if !enabled {
            self.countdown = None;
            self.paused_remaining = None;
            self.remaining = self.interval;
            self.phase = Phase::Idle;
            log::debug!("[scheduler] auto-refresh off -> idle");
            return;
        }

        if self.in_flight.is_some() {
            // The outstanding fetch arms the next interval when it settles.
            self.phase = Phase::Fetching;
        } else if self.interacting {
            self.paused_remaining = None;
            self.remaining = self.interval;
            self.phase = Phase::Paused;
        } else {
            self.arm(now, self.interval);
        }
        log::debug!("[scheduler] auto-refresh on -> {}", self.phase.as_str());
    }

    pub fn set_interacting(&mut self, interacting: bool, now: Instant) {
        if interacting == self.interacting {
            return;
        }
        self.interacting = interacting;

        if interacting {
            if self.phase == Phase::Counting {
                let left = self
                    .countdown
                    .take()
                    .map(|c| c.remaining(now))
                    .unwrap_or(self.interval);
                self.paused_remaining = Some(left);
                self.remaining = left;
                self.phase = Phase::Paused;
                log::debug!("[scheduler] paused with {left:?} left");
            }
        } else if self.phase == Phase::Paused {
            let resume = self.paused_remaining.take().unwrap_or(self.interval);
            self.arm(now, resume);
            log::debug!("[scheduler] resumed with {resume:?} left");
        }
    }

    /// Advance the countdown. Returns a ticket when the fetch should start.
    pub fn tick(&mut self, now: Instant) -> Option<FetchTicket> {
        if self.phase != Phase::Counting {
            return None;
        }
        let left = self
            .countdown
            .map(|c| c.remaining(now))
            .unwrap_or(Duration::ZERO);
        self.remaining = left;
        if left.is_zero() {
            self.countdown = None;
            Some(self.begin_fetch())
        } else {
            None
        }
    }

    /// Fetch immediately (initial load, manual refresh). Refused while a
    /// fetch is already in flight.
    pub fn request_now(&mut self, _now: Instant) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        self.countdown = None;
        self.paused_remaining = None;
        Some(self.begin_fetch())
    }

    /// Record the end of a fetch, successful or not. Returns false when the
    /// ticket is not the one in flight.
    pub fn fetch_settled(&mut self, ticket: FetchTicket, now: Instant) -> bool {
        if self.in_flight != Some(ticket) {
            log::debug!("[scheduler] ignoring settle for stale ticket #{}", ticket.id());
            return false;
        }
        self.in_flight = None;

        if !self.auto_update {
            self.remaining = self.interval;
            self.phase = Phase::Idle;
        } else if self.interacting {
            self.paused_remaining = None;
            self.remaining = self.interval;
            self.phase = Phase::Paused;
        } else {
            self.arm(now, self.interval);
        }
        log::debug!("[scheduler] fetch #{} settled -> {}", ticket.id(), self.phase.as_str());
        true
    }

    /// Tear down: drop the timer and forget any fetch in flight.
    pub fn cancel(&mut self) {
        self.countdown = None;
        self.paused_remaining = None;
        self.in_flight = None;
        self.phase = Phase::Idle;
    }

    fn arm(&mut self, now: Instant, initial: Duration) {
        self.countdown = Some(Countdown { started_at: now, initial });
        self.remaining = initial;
        self.phase = Phase::Counting;
    }

    fn begin_fetch(&mut self) -> FetchTicket {
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.remaining = Duration::ZERO;
        self.phase = Phase::Fetching;
        log::debug!("[scheduler] fetch #{} started", ticket.id());
        ticket
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}
