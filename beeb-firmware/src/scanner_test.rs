extern crate std;

use std::vec::Vec;

use super::*;
use crate::pin_test_stub::{MatrixBoard, Pin};

type TestScanner = MatrixScanner<Pin, Pin, 3, 4>;

fn build(interrupt: bool) -> (MatrixBoard, TestScanner) {
    let rows: Vec<Pin> = (0..3).map(Pin::new).collect();
    let cols: Vec<Pin> = (3..7).map(Pin::new).collect();
    let strobe = Pin::new(7);
    let sense = Pin::new(8);
    let enable = Pin::new(9);
    let activity = Pin::new(10);

    let board = MatrixBoard::new(
        rows.clone(),
        cols.clone(),
        strobe.clone(),
        sense.clone(),
        enable.clone(),
        activity.clone(),
    );

    let mode = if interrupt {
        ScanMode::Interrupt(Sense::new(activity))
    } else {
        ScanMode::Sweep
    };
    let scanner = TestScanner::new(
        core::array::from_fn(|i| Drive::new(rows[i].clone())),
        core::array::from_fn(|i| Drive::new(cols[i].clone())),
        Drive::new(strobe),
        Drive::inverted(enable),
        Sense::new(sense),
        mode,
    );
    (board, scanner)
}

fn poll_once(scanner: &mut TestScanner) -> (Vec<(u8, u8)>, usize) {
    let mut hits = Vec::new();
    let mut idles = 0;
    scanner.poll(&mut |event| match event {
        ScanEvent::Key { row, col } => hits.push((row, col)),
        ScanEvent::Idle => idles += 1,
    });
    (hits, idles)
}

#[test]
fn sweep_finds_single_key() {
    let (board, mut scanner) = build(false);

    let (hits, _) = poll_once(&mut scanner);
    assert!(hits.is_empty());

    board.down(3, 7);
    let (hits, _) = poll_once(&mut scanner);
    assert_eq!(hits, [(3, 7)]);

    board.up(3, 7);
    let (hits, _) = poll_once(&mut scanner);
    assert!(hits.is_empty());
}

#[test]
fn sweep_reports_every_closed_switch_in_address_order() {
    let (board, mut scanner) = build(false);
    board.down(5, 9);
    board.down(0, 0);
    board.down(7, 15);

    let (hits, _) = poll_once(&mut scanner);
    assert_eq!(hits, [(0, 0), (5, 9), (7, 15)]);
}

#[test]
fn sweep_quiesces_the_lines() {
    let (board, mut scanner) = build(false);
    board.down(2, 2);
    poll_once(&mut scanner);

    // sweep disabled again, strobe idling asserted
    assert!(!scanner.enable.is_on());
    assert!(scanner.strobe.is_on());
}

#[test]
fn probe_modifier_tests_only_the_shift_address() {
    let (board, mut scanner) = build(false);
    assert!(!scanner.probe_modifier());

    board.down(0, 0);
    assert!(scanner.probe_modifier());

    board.up(0, 0);
    board.down(3, 7);
    assert!(!scanner.probe_modifier());
}

#[test]
fn interrupt_mode_sweeps_only_on_activity() {
    let (board, mut scanner) = build(true);

    let (hits, idles) = poll_once(&mut scanner);
    assert!(hits.is_empty());
    assert_eq!(idles, 0);

    board.down(3, 7);
    let (hits, _) = poll_once(&mut scanner);
    assert_eq!(hits, [(3, 7)]);

    board.up(3, 7);
    let (hits, _) = poll_once(&mut scanner);
    assert!(hits.is_empty());
}

#[test]
fn modifiers_alone_do_not_trip_the_activity_line() {
    let (board, mut scanner) = build(true);
    board.down(0, 0);
    let (hits, _) = poll_once(&mut scanner);
    assert!(hits.is_empty());
}

#[test]
fn absence_is_signalled_after_the_limit() {
    let (board, mut scanner) = build(true);

    let mut idles = 0;
    for _ in 0..101 {
        idles += poll_once(&mut scanner).1;
    }
    assert_eq!(idles, 1);

    // a press resets the countdown
    board.down(3, 7);
    poll_once(&mut scanner);
    board.up(3, 7);

    let mut idles = 0;
    for _ in 0..100 {
        idles += poll_once(&mut scanner).1;
    }
    assert_eq!(idles, 0);
    assert_eq!(poll_once(&mut scanner).1, 1);
}
