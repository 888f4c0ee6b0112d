use std::time::Duration;

use crate::{hysteresis::Thresholds, time::ManualClock};

use super::*;

const MIN_ON: Duration = Duration::from_secs(60);

const MIN_OFF: Duration = Duration::from_secs(60);

fn dwell_time(clock: &ManualClock) -> DwellTime<ManualClock> {
    let core = Hysteresis::new(Thresholds::new(Direction::Rising, 1.0, 1.0));
    DwellTime::new(core, MIN_ON, MIN_OFF, clock.clone())
}

#[test]
fn first_transition_is_not_gated() {
    let clock = ManualClock::new();
    let mut dt = dwell_time(&clock);
    assert!(dt.last_transition().is_none());

    assert_eq!(Ok(()), dt.switch_on());
    assert!(dt.is_on());
    assert_eq!(Some(clock.origin()), dt.last_transition());
}

#[test]
fn switching_off_is_gated_by_min_on() {
    let clock = ManualClock::new();
    let mut dt = dwell_time(&clock);
    dt.switch_on().unwrap();

    clock.set_elapsed_secs(30.0);
    let blocked = dt.switch_off().unwrap_err();
    assert_eq!(Transition::SwitchOff, blocked.transition);
    assert_eq!(Duration::from_secs(30), blocked.elapsed);
    assert_eq!(MIN_ON, blocked.min_dwell);
    assert_eq!(Duration::from_secs(30), blocked.remaining());
    assert!(dt.is_on());
    assert_eq!(Some(clock.origin()), dt.last_transition());

    clock.set_elapsed_secs(61.0);
    assert_eq!(Ok(()), dt.switch_off());
    assert!(!dt.is_on());
    assert_eq!(
        Some(Duration::from_secs(61)),
        dt.last_transition().map(|ts| clock.offset_of(ts))
    );
}

#[test]
fn switching_on_again_is_gated_by_min_off() {
    let clock = ManualClock::new();
    let mut dt = dwell_time(&clock);
    dt.switch_on().unwrap();
    clock.set_elapsed_secs(60.0);
    dt.switch_off().unwrap();

    clock.set_elapsed_secs(119.0);
    let blocked = dt.switch_on().unwrap_err();
    assert_eq!(Transition::SwitchOn, blocked.transition);
    assert_eq!(Duration::from_secs(59), blocked.elapsed);
    assert!(!dt.is_on());

    // Exactly the minimum dwell time is sufficient
    clock.set_elapsed_secs(120.0);
    assert_eq!(Ok(()), dt.switch_on());
    assert!(dt.is_on());
}

#[test]
fn switching_into_the_current_state_is_a_noop() {
    let clock = ManualClock::new();
    let mut dt = dwell_time(&clock);
    assert_eq!(Ok(()), dt.switch_off());
    assert!(dt.last_transition().is_none());

    dt.switch_on().unwrap();
    clock.advance(Duration::from_secs(1));
    assert_eq!(Ok(()), dt.switch_on());
    assert_eq!(Some(clock.origin()), dt.last_transition());
}

#[test]
fn decide_defers_transitions() {
    let clock = ManualClock::new();
    let mut dt = dwell_time(&clock);
    assert_eq!(Ok(true), dt.decide(50.0, 55.0));

    clock.advance(Duration::from_secs(10));
    let blocked = dt.decide(57.0, 55.0).unwrap_err();
    assert_eq!(Transition::SwitchOff, blocked.transition);
    assert!(dt.is_on());

    // Inside the band nothing needs to be switched
    assert_eq!(Ok(true), dt.decide(55.0, 55.0));

    clock.advance(Duration::from_secs(50));
    assert_eq!(Ok(false), dt.decide(57.0, 55.0));
}

#[test]
fn unchanged_inputs_never_touch_the_last_transition() {
    let clock = ManualClock::new();
    let mut dt = dwell_time(&clock);
    dt.decide(50.0, 55.0).unwrap();
    let last_transition = dt.last_transition();
    for _ in 0..10 {
        assert_eq!(Ok(true), dt.decide(50.0, 55.0));
        assert_eq!(last_transition, dt.last_transition());
    }
}

#[test]
fn from_config_normalizes_dwell_times() {
    let cfg = HysteresisConfig {
        min_on_seconds: -5.0,
        min_off_seconds: 7.5,
        ..Default::default()
    };
    let dt = DwellTime::from_config(&cfg, ManualClock::new()).unwrap();
    assert_eq!(Duration::from_secs(5), dt.min_on());
    assert_eq!(Duration::from_millis(7500), dt.min_off());
}

#[test]
fn blocked_message_reports_the_elapsed_time() {
    let blocked = DwellBlocked {
        transition: Transition::SwitchOff,
        elapsed: Duration::from_secs(30),
        min_dwell: MIN_ON,
    };
    let message = blocked.to_string();
    assert!(message.contains("switching off"));
    assert!(message.contains("30s"));
    assert_eq!(30.0, blocked.elapsed_secs());
}
