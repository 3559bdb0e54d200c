//! Shared-state pins and a pretend BBC keyboard for host tests.

extern crate std;

use std::rc::Rc;
use std::sync::Mutex;
use std::vec::Vec;

use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin};

pub trait Observer {
    fn update(&self, pin: &Pin);
}

#[derive(Debug)]
pub struct StubError;

impl Error for StubError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

struct PinShared {
    n: u8,
    observer: Mutex<Option<Rc<dyn Observer>>>,
    state: Mutex<Option<bool>>,
}

/// A pin whose level is shared between all clones. An [`Observer`] hooked to
/// a pin is told about every level change.
#[derive(Clone)]
pub struct Pin(Rc<PinShared>);

impl core::fmt::Debug for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pin")
            .field("n", &self.0.n)
            .field("state", &self.get_state())
            .finish()
    }
}

impl Pin {
    pub fn new(n: u8) -> Self {
        Self(Rc::new(PinShared {
            n,
            observer: Mutex::new(None),
            state: Mutex::new(None),
        }))
    }

    pub fn num(&self) -> u8 {
        self.0.n
    }

    pub fn get_state(&self) -> Option<bool> {
        *self.0.state.lock().unwrap()
    }

    pub fn set_observer(&self, observer: Rc<dyn Observer>) {
        *self.0.observer.lock().unwrap() = Some(observer);
    }

    fn set_level(&self, high: bool) {
        {
            let mut state = self.0.state.lock().unwrap();
            if *state == Some(high) {
                return;
            }
            *state = Some(high);
        }
        let observer = self.0.observer.lock().unwrap().clone();
        if let Some(o) = observer {
            o.update(self);
        }
    }
}

impl ErrorType for Pin {
    type Error = StubError;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(matches!(self.get_state(), Some(true)))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(matches!(self.get_state(), Some(false)))
    }
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_level(true);
        Ok(())
    }
}

struct BoardInner {
    switches: [[bool; 16]; 8],
    row_select: Vec<Pin>,
    col_select: Vec<Pin>,
    sense: Pin,
    enable: Pin,
    activity: Pin,
}

/// Emulates the keyboard end of the connector. Each strobe rise while the
/// scan-enable line is driven low latches the selected address onto the
/// sense line. The activity line mimics the keyboard's own scan circuit:
/// asserted whenever any switch outside the two modifier positions is
/// closed.
#[derive(Clone)]
pub struct MatrixBoard {
    inner: Rc<Mutex<BoardInner>>,
}

impl MatrixBoard {
    pub fn new(
        row_select: Vec<Pin>,
        col_select: Vec<Pin>,
        strobe: Pin,
        sense: Pin,
        enable: Pin,
        activity: Pin,
    ) -> Self {
        let board = Self {
            inner: Rc::new(Mutex::new(BoardInner {
                switches: [[false; 16]; 8],
                row_select,
                col_select,
                sense,
                enable,
                activity,
            })),
        };
        strobe.set_observer(Rc::new(board.clone()));
        board.refresh_activity();
        board
    }

    pub fn down(&self, row: usize, col: usize) {
        self.set_switch(row, col, true);
    }

    pub fn up(&self, row: usize, col: usize) {
        self.set_switch(row, col, false);
    }

    fn set_switch(&self, row: usize, col: usize, closed: bool) {
        self.inner.lock().unwrap().switches[row][col] = closed;
        self.refresh_activity();
    }

    fn refresh_activity(&self) {
        let (any, activity) = {
            let inner = self.inner.lock().unwrap();
            let any = inner
                .switches
                .iter()
                .enumerate()
                .flat_map(|(row, cols)| {
                    cols.iter()
                        .enumerate()
                        .map(move |(col, closed)| (row, col, *closed))
                })
                .any(|(row, col, closed)| closed && !matches!((row, col), (0, 0) | (0, 1)));
            (any, inner.activity.clone())
        };
        activity.set_level(any);
    }
}

impl Observer for MatrixBoard {
    fn update(&self, pin: &Pin) {
        // only a strobe rise latches anything
        if pin.get_state() != Some(true) {
            return;
        }
        let (sense, level) = {
            let inner = self.inner.lock().unwrap();
            if inner.enable.get_state() != Some(false) {
                (inner.sense.clone(), false)
            } else {
                let row = decode(&inner.row_select);
                let col = decode(&inner.col_select);
                (inner.sense.clone(), inner.switches[row][col])
            }
        };
        sense.set_level(level);
    }
}

/// Read a select bus, most significant bit on the first line.
fn decode(lines: &[Pin]) -> usize {
    lines
        .iter()
        .fold(0, |acc, pin| (acc << 1) | usize::from(pin.get_state() == Some(true)))
}
