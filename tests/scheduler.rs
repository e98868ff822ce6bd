//! Countdown scheduler driven tick by tick with a synthetic clock.

use std::time::{Duration, Instant};

use feedx::scheduler::{Phase, RefreshScheduler};

const TICK: Duration = Duration::from_millis(200);

/// Tick from `from` to `to` at 200ms steps, collecting fired tickets.
fn run(s: &mut RefreshScheduler, from: Instant, to: Instant) -> usize {
    let mut fired = 0;
    let mut t = from;
    while t < to {
        t += TICK;
        if s.tick(t).is_some() {
            fired += 1;
        }
    }
    fired
}

#[test]
fn ten_seconds_without_interaction_fires_exactly_once() {
    let t0 = Instant::now();
    let mut s = RefreshScheduler::new(Duration::from_secs(10));
    s.set_auto_update(true, t0);
    assert_eq!(s.phase(), Phase::Counting);
    assert_eq!(s.remaining_seconds(), 10);

    let mut phases = vec![s.phase()];
    let mut fired = None;
    let mut t = t0;
    for _ in 0..50 {
        t += TICK;
        if let Some(ticket) = s.tick(t) {
            assert!(fired.is_none(), "fired twice");
            fired = Some(ticket);
            phases.push(s.phase());
        }
    }
    let ticket = fired.expect("one fetch after ten seconds");
    assert_eq!(s.phase(), Phase::Fetching);

    assert!(s.fetch_settled(ticket, t));
    phases.push(s.phase());
    assert_eq!(phases, vec![Phase::Counting, Phase::Fetching, Phase::Counting]);
    assert_eq!(s.remaining_seconds(), 10);
}

#[test]
fn pause_at_six_resumes_at_six() {
    let t0 = Instant::now();
    let mut s = RefreshScheduler::new(Duration::from_secs(10));
    s.set_auto_update(true, t0);

    let t4 = t0 + Duration::from_secs(4);
    assert_eq!(run(&mut s, t0, t4), 0);
    assert_eq!(s.remaining_seconds(), 6);

    s.set_interacting(true, t4);
    assert_eq!(s.phase(), Phase::Paused);
    assert!(!s.has_timer());

    // arbitrary delay; ticks are ignored while paused
    let later = t4 + Duration::from_secs(47);
    assert_eq!(run(&mut s, t4, later), 0);

    s.set_interacting(false, later);
    assert_eq!(s.phase(), Phase::Counting);
    assert_eq!(s.remaining_seconds(), 6);

    assert_eq!(run(&mut s, later, later + Duration::from_secs(6)), 1);
}

#[test]
fn fetch_failures_do_not_stop_the_schedule() {
    let t0 = Instant::now();
    let mut s = RefreshScheduler::new(Duration::from_secs(10));
    s.set_auto_update(true, t0);
    let mut t = t0;
    for _ in 0..3 {
        let end = t + Duration::from_secs(10);
        let mut ticket = None;
        while ticket.is_none() && t < end {
            t += TICK;
            ticket = s.tick(t);
        }
        // settle counts the same whether the fetch succeeded or failed
        assert!(s.fetch_settled(ticket.expect("fired"), t));
        assert_eq!(s.phase(), Phase::Counting);
    }
}

#[test]
fn at_most_one_timer_and_one_fetch() {
    let t0 = Instant::now();
    let mut s = RefreshScheduler::new(Duration::from_secs(10));
    s.set_auto_update(true, t0);
    s.set_interacting(true, t0);
    s.set_interacting(false, t0);
    s.set_auto_update(false, t0);
    s.set_auto_update(true, t0);
    assert!(s.has_timer());

    let ticket = s.request_now(t0).expect("idle scheduler accepts a fetch");
    assert!(!s.has_timer());
    assert!(s.request_now(t0).is_none());
    assert!(s.tick(t0 + Duration::from_secs(30)).is_none());
    assert!(s.fetch_settled(ticket, t0 + Duration::from_secs(30)));
}
