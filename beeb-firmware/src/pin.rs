//! Polarity-aware wrappers for the keyboard connector lines.
//!
//! Every physical line is wrapped exactly once at construction and handed
//! down by value; nothing else in the crate touches raw GPIO.

use embedded_hal::digital::{InputPin, OutputPin};

/// A readable line.
pub struct Sense<I: InputPin> {
    pin: I,
    invert: bool,
}

impl<I: InputPin> Sense<I> {
    pub fn new(pin: I) -> Self {
        Self { pin, invert: false }
    }

    /// The line reads low when active.
    pub fn inverted(pin: I) -> Self {
        Self { pin, invert: true }
    }

    pub fn is_active(&mut self) -> bool {
        self.pin.is_high().unwrap_or(false) != self.invert
    }
}

/// A drivable line.
pub struct Drive<O: OutputPin> {
    pin: O,
    invert: bool,
    level: bool,
}

impl<O: OutputPin> Drive<O> {
    pub fn new(pin: O) -> Self {
        Self {
            pin,
            invert: false,
            level: false,
        }
    }

    /// The line must be driven low to assert.
    pub fn inverted(pin: O) -> Self {
        Self {
            pin,
            invert: true,
            level: false,
        }
    }

    pub fn set(&mut self, on: bool) {
        self.level = on;
        if on != self.invert {
            let _ = self.pin.set_high();
        } else {
            let _ = self.pin.set_low();
        }
    }

    pub fn set_on(&mut self) {
        self.set(true);
    }

    pub fn set_off(&mut self) {
        self.set(false);
    }

    pub fn toggle(&mut self) {
        self.set(!self.level);
    }

    pub fn is_on(&self) -> bool {
        self.level
    }
}

/// Integrator debounce for a single directly-wired button.
pub struct EdgeDebouncer<I: InputPin> {
    line: Sense<I>,
    integrator: u8,
    limit: u8,
    active: bool,
}

impl<I: InputPin> EdgeDebouncer<I> {
    /// `limit` is how many consecutive agreeing samples flip the state.
    pub fn new(line: Sense<I>, limit: u8) -> Self {
        Self {
            line,
            integrator: 0,
            limit,
            active: false,
        }
    }

    /// Sample the line once; call at the tick rate.
    pub fn update(&mut self) {
        if self.line.is_active() {
            if self.integrator < self.limit {
                self.integrator += 1;
            }
        } else if self.integrator > 0 {
            self.integrator -= 1;
        }

        if self.integrator == self.limit {
            self.active = true;
        } else if self.integrator == 0 {
            self.active = false;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
#[path = "pin_test.rs"]
mod test;
