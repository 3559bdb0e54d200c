//! Discovers which matrix switches are closed.
//!
//! The keyboard exposes a binary-addressed matrix: the select bus picks one
//! (row, column) cell, a strobe pulse latches the selection, and the shared
//! sense line reports whether that switch is closed. The keyboard also has
//! its own hardware scan which asserts an activity line whenever any
//! non-modifier key is down; interrupt mode leans on it so the full sweep
//! only runs when a press is plausible.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::pin::{Drive, Sense};

/// Idle polls tolerated in interrupt mode before the debounce layer is told
/// that nothing at all is down.
const ABSENCE_LIMIT: u32 = 100;

/// What a poll discovered. `Key` is emitted per closed switch, as it is
/// found, never batched.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanEvent {
    Key { row: u8, col: u8 },
    /// No activity for [`ABSENCE_LIMIT`] consecutive polls.
    Idle,
}

/// How switches are discovered; fixed for the life of the process.
pub enum ScanMode<I: InputPin> {
    /// Poll the keyboard's activity line, sweep only when it asserts.
    Interrupt(Sense<I>),
    /// Sweep the whole matrix every poll.
    Sweep,
}

pub struct MatrixScanner<I: InputPin, O: OutputPin, const RSEL: usize, const CSEL: usize> {
    row_select: [Drive<O>; RSEL],
    col_select: [Drive<O>; CSEL],
    strobe: Drive<O>,
    enable: Drive<O>,
    sense: Sense<I>,
    mode: ScanMode<I>,
    absence_count: u32,
}

impl<I: InputPin, O: OutputPin, const RSEL: usize, const CSEL: usize>
    MatrixScanner<I, O, RSEL, CSEL>
{
    pub const ROW_COUNT: usize = 1 << RSEL;
    pub const COL_COUNT: usize = 1 << CSEL;

    pub fn new(
        row_select: [Drive<O>; RSEL],
        col_select: [Drive<O>; CSEL],
        strobe: Drive<O>,
        enable: Drive<O>,
        sense: Sense<I>,
        mode: ScanMode<I>,
    ) -> Self {
        let mut scanner = Self {
            row_select,
            col_select,
            strobe,
            enable,
            sense,
            mode,
            absence_count: 0,
        };
        // quiesce: sweep disabled, strobe idling asserted
        scanner.enable.set_off();
        scanner.strobe.set_on();
        scanner
    }

    /// One tick's worth of discovery.
    ///
    /// In interrupt mode the strobe is pulsed once more after either branch;
    /// that pulse is the heartbeat the keyboard's own scan circuit runs on.
    pub fn poll(&mut self, emit: &mut impl FnMut(ScanEvent)) {
        let tripped = match &mut self.mode {
            ScanMode::Sweep => None,
            ScanMode::Interrupt(activity) => Some(activity.is_active()),
        };

        match tripped {
            None => self.sweep(emit),
            Some(true) => {
                self.strobe.set_off();
                self.sweep(emit);
                self.absence_count = 0;
                self.pulse_strobe();
            }
            Some(false) => {
                self.absence_count += 1;
                if self.absence_count > ABSENCE_LIMIT {
                    emit(ScanEvent::Idle);
                    self.absence_count = 0;
                }
                self.pulse_strobe();
            }
        }
    }

    /// Walk every matrix address, strobing each one and reporting closed
    /// switches through `emit` as they are found.
    pub fn sweep(&mut self, emit: &mut impl FnMut(ScanEvent)) {
        self.enable.set_on();
        for col in 0..Self::COL_COUNT as u8 {
            select(&mut self.col_select, col);
            for row in 0..Self::ROW_COUNT as u8 {
                select(&mut self.row_select, row);
                self.pulse_strobe();
                if self.sense.is_active() {
                    emit(ScanEvent::Key { row, col });
                }
            }
        }
        self.enable.set_off();
    }

    /// Test the shift key's address (0, 0) with a single strobe, without
    /// walking the matrix. Used by the break-button path.
    pub fn probe_modifier(&mut self) -> bool {
        self.enable.set_on();
        select(&mut self.col_select, 0);
        select(&mut self.row_select, 0);
        self.pulse_strobe();
        let held = self.sense.is_active();
        self.enable.set_off();
        held
    }

    fn pulse_strobe(&mut self) {
        self.strobe.set_off();
        self.strobe.set_on();
    }
}

/// Drive the select bus with the binary encoding of `value`, most
/// significant bit on the first line, matching the connector wiring.
fn select<O: OutputPin, const N: usize>(lines: &mut [Drive<O>; N], value: u8) {
    for (i, line) in lines.iter_mut().enumerate() {
        line.set(value >> (N - 1 - i) & 1 == 1);
    }
}

#[cfg(test)]
extern crate std;

#[cfg(test)]
#[path = "scanner_test.rs"]
mod test;
