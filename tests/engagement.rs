//! Scheduler behavior over whole simulated sessions, driven through the
//! public API with a synthetic clock.

use sidekick::config::EngagementConfig;
use sidekick::engage::EngagementScheduler;
use std::time::{Duration, Instant};

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[test]
fn chatty_user_session_converges_to_floor() {
    let t0 = Instant::now();
    let mut s = EngagementScheduler::new(&EngagementConfig::default(), t0);
    let mut now = t0;

    // The user answers every proactive remark within a few seconds.
    // 20 → 15 → 10, then the floor holds.
    let mut observed = Vec::new();
    for _ in 0..4 {
        // Idle until the scheduler fires.
        while !s.tick(now) {
            now += secs(1);
        }
        s.mark_proactive_spoken(now);
        now += secs(3);
        s.note_user_speech(now);
        observed.push(s.current_interval());
        assert!(s.interval_in_bounds());
    }

    assert_eq!(observed, vec![secs(15), secs(10), secs(10), secs(10)]);
}

#[test]
fn absent_user_session_converges_to_ceiling() {
    let t0 = Instant::now();
    let mut s = EngagementScheduler::new(&EngagementConfig::default(), t0);
    let mut now = t0;

    // Every remark goes unanswered. 20 → 30 → ... → 90, then it holds.
    for _ in 0..10 {
        while !s.tick(now) {
            now += secs(1);
        }
        s.mark_proactive_spoken(now);
        // Sit past the ignore window; the penalty lands on a later tick.
        now += secs(61);
        s.tick(now);
        assert!(s.interval_in_bounds());
    }

    assert_eq!(s.current_interval(), secs(90));
}

#[test]
fn neglect_loosens_under_realistic_tick_cadence() {
    let t0 = Instant::now();
    let mut s = EngagementScheduler::new(&EngagementConfig::default(), t0);
    let mut now = t0;
    let mut spoken_remarks = 0;

    // Drive the scheduler the way the loop does: a tick every second,
    // every firing spoken, the user never responding. The cadence must
    // still back off to the ceiling.
    for _ in 0..1800 {
        now += secs(1);
        if s.tick(now) {
            s.mark_proactive_spoken(now);
            spoken_remarks += 1;
        }
        assert!(s.interval_in_bounds());
    }

    assert_eq!(s.current_interval(), secs(90));
    assert!(spoken_remarks > 1);
}

#[test]
fn recovery_after_neglect() {
    let t0 = Instant::now();
    let mut s = EngagementScheduler::new(&EngagementConfig::default(), t0);
    let mut now = t0;

    // Two ignored remarks loosen the cadence to 40s.
    for _ in 0..2 {
        s.mark_proactive_spoken(now);
        now += secs(61);
        s.tick(now);
    }
    assert_eq!(s.current_interval(), secs(40));

    // The user comes back and engages twice; cadence tightens again.
    for _ in 0..2 {
        s.mark_proactive_spoken(now);
        now += secs(5);
        s.note_user_speech(now);
    }
    assert_eq!(s.current_interval(), secs(30));
}

#[test]
fn late_reply_neither_tightens_nor_loosens_before_the_window_closes() {
    let t0 = Instant::now();
    let mut s = EngagementScheduler::new(&EngagementConfig::default(), t0);

    s.mark_proactive_spoken(t0);
    // 40s later: past the engagement window, inside the ignore window.
    s.note_user_speech(t0 + secs(40));
    assert_eq!(s.current_interval(), secs(20));
    assert!(!s.awaiting_engagement());

    // The flag cleared, so no ignore penalty can land afterwards either.
    s.tick(t0 + secs(120));
    assert_eq!(s.current_interval(), secs(20));
}

#[test]
fn firing_cadence_follows_the_adapted_interval() {
    let t0 = Instant::now();
    let mut s = EngagementScheduler::new(&EngagementConfig::default(), t0);

    // Tighten once: 20 → 15.
    assert!(s.tick(t0 + secs(21)));
    s.mark_proactive_spoken(t0 + secs(21));
    s.note_user_speech(t0 + secs(25));
    assert_eq!(s.current_interval(), secs(15));

    // The next fire honors the new, shorter interval measured from the
    // user's speech.
    assert!(!s.tick(t0 + secs(39)));
    assert!(s.tick(t0 + secs(41)));
}

#[test]
fn custom_bounds_are_honored() {
    let config = EngagementConfig {
        min_interval_secs: 5,
        max_interval_secs: 30,
        start_interval_secs: 10,
        ..EngagementConfig::default()
    };
    config.validate().unwrap();

    let t0 = Instant::now();
    let mut s = EngagementScheduler::new(&config, t0);
    let mut now = t0;

    for _ in 0..10 {
        s.mark_proactive_spoken(now);
        now += secs(61);
        s.tick(now);
    }
    assert_eq!(s.current_interval(), secs(30));

    for _ in 0..10 {
        s.mark_proactive_spoken(now);
        now += secs(2);
        s.note_user_speech(now);
    }
    assert_eq!(s.current_interval(), secs(5));
}
