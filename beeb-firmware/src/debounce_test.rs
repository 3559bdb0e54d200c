extern crate std;

use std::vec;
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use super::*;
use crate::reporter::{Event, HidChannel, HidSink, LedState};
use crate::time_driver_test_stub::set_time;

const T0: u64 = 1_000_000;

fn ms(ms: u64) -> u64 {
    Duration::from_millis(ms).as_ticks()
}

fn key(code: u8, is_down: bool) -> Event {
    Event::Key { code, is_down }
}

fn drain<const N: usize>(channel: &HidChannel<NoopRawMutex, N>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Some(event) = channel.try_receive() {
        out.push(event);
    }
    out
}

macro_rules! setup {
    ($engine:ident, $sink:ident, $channel:ident) => {
        set_time(T0);
        let $channel = HidChannel::<NoopRawMutex, 64>::default();
        let leds = LedState::new();
        #[allow(unused_mut)]
        let mut $sink = HidSink::new(&$channel, &leds);
        let mut $engine = DebounceEngine::new(DebounceTiming::default());
    };
}

fn plain(code: u8) -> Observation {
    Observation {
        key: BaseKey::Plain(code),
        escape: false,
    }
}

#[test]
fn exactly_one_event_per_press() {
    setup!(engine, sink, channel);

    engine.input(plain(kc::P), &mut sink);
    assert_eq!(drain(&channel), vec![key(kc::P, true)]);

    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]);

    set_time(T0 + ms(149));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]);

    set_time(T0 + ms(150));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![key(kc::P, false)]);

    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]);
}

#[test]
fn reobservation_never_restarts_the_timer() {
    setup!(engine, sink, channel);

    engine.input(plain(kc::P), &mut sink);
    set_time(T0 + ms(100));
    engine.input(plain(kc::P), &mut sink);
    assert_eq!(drain(&channel), vec![key(kc::P, true)]);

    // expires on the first observation's clock, not the second's
    set_time(T0 + ms(150));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![key(kc::P, false)]);
}

#[test]
fn repress_after_own_release_uses_the_short_window() {
    setup!(engine, sink, channel);

    engine.input(plain(kc::P), &mut sink);
    set_time(T0 + ms(150));
    engine.check(&mut sink);
    drain(&channel);

    set_time(T0 + ms(200));
    engine.input(plain(kc::P), &mut sink);
    assert_eq!(drain(&channel), vec![key(kc::P, true)]);

    set_time(T0 + ms(289));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]);

    set_time(T0 + ms(290));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![key(kc::P, false)]);
}

#[test]
fn short_window_belongs_to_the_most_recent_release_only() {
    setup!(engine, sink, channel);

    engine.input(plain(kc::A), &mut sink);
    set_time(T0 + ms(150));
    engine.check(&mut sink);

    engine.input(plain(kc::B), &mut sink);
    set_time(T0 + ms(300));
    engine.check(&mut sink);
    drain(&channel);

    // A is no longer the most recent release; it gets the full window
    engine.input(plain(kc::A), &mut sink);
    drain(&channel);
    set_time(T0 + ms(300) + ms(100));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]);
    set_time(T0 + ms(300) + ms(150));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![key(kc::A, false)]);
}

#[test]
fn absence_halves_the_window() {
    setup!(engine, sink, channel);

    engine.input(plain(kc::P), &mut sink);
    drain(&channel);

    set_time(T0 + ms(75));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]); // full window still applies

    engine.no_input();
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![key(kc::P, false)]); // halved
}

#[test]
fn absence_flag_is_consumed_by_check() {
    setup!(engine, sink, channel);

    engine.no_input();
    engine.check(&mut sink); // nothing pending; consumes the flag

    engine.input(plain(kc::P), &mut sink);
    drain(&channel);
    set_time(T0 + ms(80));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]);
}

#[test]
fn input_clears_the_absence_flag() {
    setup!(engine, sink, channel);

    engine.no_input();
    engine.input(plain(kc::P), &mut sink);
    drain(&channel);
    set_time(T0 + ms(80));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]);
}

#[test]
fn shifted_key_is_a_self_contained_triple() {
    setup!(engine, sink, channel);

    engine.input(
        Observation {
            key: BaseKey::Shifted(kc::QUOTE),
            escape: false,
        },
        &mut sink,
    );
    assert_eq!(
        drain(&channel),
        vec![
            key(kc::LEFT_SHIFT, true),
            key(kc::QUOTE, true),
            key(kc::LEFT_SHIFT, false),
        ]
    );

    // deliberately symmetric: the wrap shift was already released on the
    // way down, so only the base code comes up
    set_time(T0 + ms(150));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![key(kc::QUOTE, false)]);
}

#[test]
fn escape_brackets_the_down_event_and_preserves_modifier_state() {
    setup!(engine, sink, channel);

    sink.press(kc::LEFT_SHIFT);
    drain(&channel);
    assert!(sink.is_modifier_down());

    engine.input(
        Observation {
            key: BaseKey::Shifted(kc::N7),
            escape: true,
        },
        &mut sink,
    );
    assert_eq!(
        drain(&channel),
        vec![
            key(kc::LEFT_SHIFT, false),
            key(kc::LEFT_SHIFT, true),
            key(kc::N7, true),
            key(kc::LEFT_SHIFT, false),
            key(kc::LEFT_SHIFT, true),
        ]
    );
    assert!(sink.is_modifier_down());
}

#[test]
fn break_chord_is_reported_never_typed() {
    setup!(engine, sink, channel);

    engine.input_break(true, &mut sink);
    assert_eq!(drain(&channel), vec![Event::BreakRequest]);

    engine.input_break(true, &mut sink);
    assert_eq!(drain(&channel), vec![]);

    set_time(T0 + ms(150));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![]); // no key-up either

    // a bare break afterwards types the break code normally
    engine.input_break(false, &mut sink);
    assert_eq!(drain(&channel), vec![key(kc::BACKSPACE, true)]);
    set_time(T0 + ms(240));
    engine.check(&mut sink);
    assert_eq!(drain(&channel), vec![key(kc::BACKSPACE, false)]);
}
