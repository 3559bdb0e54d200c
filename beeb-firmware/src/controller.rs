//! The fixed-rate scan loop tying scanner, resolver, debounce and sink
//! together.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};
use embedded_hal::digital::{InputPin, OutputPin};

use crate::debounce::{DebounceEngine, DebounceTiming};
use crate::keymap::{KeyTable, KeymapError};
use crate::pin::{Drive, EdgeDebouncer};
use crate::reporter::HidSink;
use crate::scanner::{MatrixScanner, ScanEvent};

/// Tick period. A tuning parameter, not a correctness requirement — the
/// dwell windows tolerate jitter.
pub const TICK: Duration = Duration::from_millis(1);

/// Ticks between heartbeat toggles (1 s at the default tick).
const BLINK_PACE: u32 = 1000;

struct Blink {
    count: u32,
}

impl Blink {
    fn advance(&mut self) -> bool {
        self.count += 1;
        if self.count == BLINK_PACE {
            self.count = 0;
            true
        } else {
            false
        }
    }
}

/// The case LEDs, injected as constructed handles. `lock`, `shift_lock` and
/// `motor` are wired reversed on the board, so they are forced off at
/// startup rather than left floating on.
pub struct Indicators<O: OutputPin> {
    pub heartbeat: Drive<O>,
    pub lock: Drive<O>,
    pub shift_lock: Drive<O>,
    pub motor: Drive<O>,
}

impl<O: OutputPin> Indicators<O> {
    fn all_off(&mut self) {
        self.heartbeat.set_off();
        self.lock.set_off();
        self.shift_lock.set_off();
        self.motor.set_off();
    }
}

pub struct ScanLoopController<
    'c,
    I: InputPin,
    O: OutputPin,
    M: RawMutex,
    const RSEL: usize,
    const CSEL: usize,
    const N: usize,
> {
    scanner: MatrixScanner<I, O, RSEL, CSEL>,
    table: KeyTable,
    engine: DebounceEngine,
    sink: HidSink<'c, M, N>,
    break_button: EdgeDebouncer<I>,
    indicators: Indicators<O>,
    blink: Blink,
}

impl<
        'c,
        I: InputPin,
        O: OutputPin,
        M: RawMutex,
        const RSEL: usize,
        const CSEL: usize,
        const N: usize,
    > ScanLoopController<'c, I, O, M, RSEL, CSEL, N>
{
    /// Fails if the key table is malformed; nothing is scanned before the
    /// table validates.
    pub fn new(
        scanner: MatrixScanner<I, O, RSEL, CSEL>,
        table: KeyTable,
        timing: DebounceTiming,
        sink: HidSink<'c, M, N>,
        break_button: EdgeDebouncer<I>,
        mut indicators: Indicators<O>,
    ) -> Result<Self, KeymapError> {
        table.validate()?;
        indicators.all_off();
        Ok(Self {
            scanner,
            table,
            engine: DebounceEngine::new(timing),
            sink,
            break_button,
            indicators,
            blink: Blink { count: 0 },
        })
    }

    /// One scan-loop step. Observations are recorded before the expiry
    /// check, so a press and an expiry on the same tick never drop an
    /// event.
    pub fn tick(&mut self) {
        if self.blink.advance() {
            self.indicators.heartbeat.toggle();
        }
        self.indicators.lock.set(self.sink.is_modifier_lock_on());

        let Self {
            scanner,
            table,
            engine,
            sink,
            ..
        } = self;
        scanner.poll(&mut |event| match event {
            ScanEvent::Key { row, col } => {
                if let Some(obs) = table.resolve(row as usize, col as usize, sink.is_modifier_down())
                {
                    crate::debug!("key at {}:{} -> {:?}", row, col, obs.key);
                    engine.input(obs, sink);
                }
            }
            ScanEvent::Idle => engine.no_input(),
        });

        self.break_button.update();
        if self.break_button.is_active() {
            let modifier_held = self.scanner.probe_modifier();
            self.engine.input_break(modifier_held, &mut self.sink);
        }

        self.engine.check(&mut self.sink);
    }

    /// Run ticks at the fixed rate until power-down.
    pub async fn run(mut self) -> ! {
        let mut ticker = Ticker::every(TICK);
        loop {
            self.tick();
            ticker.next().await;
        }
    }
}

#[cfg(test)]
extern crate std;

#[cfg(test)]
#[path = "controller_test.rs"]
mod test;
