extern crate std;

use std::vec;
use std::vec::Vec;

use beeb_common::keycodes::kc;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal::digital::OutputPin;

use super::*;
use crate::keymap::KeyTable;
use crate::pin::Sense;
use crate::pin_test_stub::{MatrixBoard, Pin};
use crate::reporter::{Event, HidChannel, HidSink, LedState};
use crate::scanner::{MatrixScanner, ScanMode};
use crate::time_driver_test_stub::set_time;

const T0: u64 = 1_000_000;

fn ms(ms: u64) -> u64 {
    Duration::from_millis(ms).as_ticks()
}

fn key(code: u8, is_down: bool) -> Event {
    Event::Key { code, is_down }
}

fn drain(channel: &HidChannel<NoopRawMutex, 64>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Some(event) = channel.try_receive() {
        out.push(event);
    }
    out
}

/// Builds the whole rig. `$board` drives switches, `$break_pin` the break
/// button line, `$heartbeat`/`$lock` observe the LEDs, `$leds` fakes the
/// host's LED report.
macro_rules! setup {
    ($interrupt:expr, $ctl:ident, $channel:ident, $board:ident,
     $break_pin:ident, $heartbeat:ident, $lock:ident, $leds:ident) => {
        set_time(T0);
        let rows: Vec<Pin> = (0..3).map(Pin::new).collect();
        let cols: Vec<Pin> = (3..7).map(Pin::new).collect();
        let strobe = Pin::new(7);
        let sense = Pin::new(8);
        let enable = Pin::new(9);
        let activity = Pin::new(10);
        let $break_pin = Pin::new(11);
        $break_pin.clone().set_high().ok(); // pulled up, idle
        let $heartbeat = Pin::new(12);
        let $lock = Pin::new(13);

        let $board = MatrixBoard::new(
            rows.clone(),
            cols.clone(),
            strobe.clone(),
            sense.clone(),
            enable.clone(),
            activity.clone(),
        );

        let scanner = MatrixScanner::<Pin, Pin, 3, 4>::new(
            core::array::from_fn(|i| Drive::new(rows[i].clone())),
            core::array::from_fn(|i| Drive::new(cols[i].clone())),
            Drive::new(strobe),
            Drive::inverted(enable),
            Sense::new(sense),
            if $interrupt {
                ScanMode::Interrupt(Sense::new(activity))
            } else {
                ScanMode::Sweep
            },
        );

        let $channel = HidChannel::<NoopRawMutex, 64>::default();
        let $leds = LedState::new();
        let sink = HidSink::new(&$channel, &$leds);
        let break_button = EdgeDebouncer::new(Sense::inverted($break_pin.clone()), 2);
        let indicators = Indicators {
            heartbeat: Drive::new($heartbeat.clone()),
            lock: Drive::inverted($lock.clone()),
            shift_lock: Drive::inverted(Pin::new(14)),
            motor: Drive::inverted(Pin::new(15)),
        };

        let mut $ctl = ScanLoopController::new(
            scanner,
            KeyTable::bbc_model_b(),
            DebounceTiming::default(),
            sink,
            break_button,
            indicators,
        )
        .unwrap();
    };
}

#[test]
fn press_travels_to_the_host_exactly_once() {
    setup!(false, ctl, channel, board, _break_pin, _heartbeat, _lock, _leds);

    board.down(3, 7);
    ctl.tick();
    assert_eq!(drain(&channel), vec![key(kc::P, true)]);

    // held key keeps being observed without re-emitting
    ctl.tick();
    assert_eq!(drain(&channel), vec![]);

    board.up(3, 7);
    set_time(T0 + ms(150));
    ctl.tick();
    assert_eq!(drain(&channel), vec![key(kc::P, false)]);
}

#[test]
fn shift_discovered_earlier_in_the_sweep_steers_a_conditional() {
    setup!(false, ctl, channel, board, _break_pin, _heartbeat, _lock, _leds);

    board.down(0, 0); // shift, column 0
    board.down(3, 4); // 6-and-shifted-7, column 4
    ctl.tick();
    assert_eq!(
        drain(&channel),
        vec![
            key(kc::LEFT_SHIFT, true),
            key(kc::LEFT_SHIFT, false), // escape
            key(kc::LEFT_SHIFT, true),
            key(kc::N7, true),
            key(kc::LEFT_SHIFT, false),
            key(kc::LEFT_SHIFT, true), // restore
        ]
    );
}

#[test]
fn unmapped_cells_are_dropped_silently() {
    setup!(false, ctl, channel, board, _break_pin, _heartbeat, _lock, _leds);

    board.down(0, 5);
    ctl.tick();
    assert_eq!(drain(&channel), vec![]);
}

#[test]
fn break_chord_requests_a_reset() {
    setup!(false, ctl, channel, board, break_pin, _heartbeat, _lock, _leds);

    board.down(0, 0);
    break_pin.clone().set_low().ok();
    ctl.tick(); // debouncer still settling
    drain(&channel); // shift press

    ctl.tick();
    assert_eq!(drain(&channel), vec![Event::BreakRequest]);

    ctl.tick();
    assert_eq!(drain(&channel), vec![]);
}

#[test]
fn bare_break_types_the_break_code() {
    setup!(false, ctl, channel, board, break_pin, _heartbeat, _lock, _leds);
    let _ = &board;

    break_pin.clone().set_low().ok();
    ctl.tick();
    ctl.tick();
    assert_eq!(drain(&channel), vec![key(kc::BACKSPACE, true)]);
}

#[test]
fn heartbeat_toggles_once_per_pace() {
    setup!(false, ctl, channel, board, _break_pin, heartbeat, _lock, _leds);
    let _ = (&board, &channel);

    for _ in 0..999 {
        ctl.tick();
    }
    assert_eq!(heartbeat.get_state(), Some(false));
    ctl.tick();
    assert_eq!(heartbeat.get_state(), Some(true));
}

#[test]
fn lock_indicator_follows_the_host() {
    setup!(false, ctl, channel, board, _break_pin, _heartbeat, lock, leds);
    let _ = (&board, &channel);

    ctl.tick();
    assert_eq!(lock.get_state(), Some(true)); // off, reversed wiring

    leds.set(LedState::CAPS_LOCK);
    ctl.tick();
    assert_eq!(lock.get_state(), Some(false));
}

#[test]
fn interrupt_mode_absence_shortens_the_tail() {
    setup!(true, ctl, channel, board, _break_pin, _heartbeat, _lock, _leds);

    ctl.tick();
    assert_eq!(drain(&channel), vec![]);

    board.down(3, 7);
    ctl.tick();
    assert_eq!(drain(&channel), vec![key(kc::P, true)]);

    board.up(3, 7);
    set_time(T0 + ms(75));
    for _ in 0..100 {
        ctl.tick();
    }
    // no absence signal yet, so the full window still applies
    assert_eq!(drain(&channel), vec![]);

    ctl.tick(); // 101st idle poll fires the absence notification
    assert_eq!(drain(&channel), vec![key(kc::P, false)]);
}
