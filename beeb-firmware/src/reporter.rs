//! Event plumbing between the scan core and the USB writer task, and the
//! report bookkeeping at the far end.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Channel};
use embassy_usb::driver::Driver;

use beeb_common::keycodes::{is_modifier, kc};

use crate::hid::HidWriter;
use crate::{add_key_bit, del_key_bit, firmware_functions, layout_us};

/// Report id of the keyboard report, matching the report descriptor.
pub const KEYBOARD_REPORT_ID: u8 = 6;

/// Messages from the scan core to the USB writer task.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Key { code: u8, is_down: bool },
    /// The break chord. Handled by the firmware, never typed.
    BreakRequest,
}

pub struct HidChannel<M: RawMutex, const N: usize>(Channel<M, Event, N>);

impl<M: RawMutex, const N: usize> Default for HidChannel<M, N> {
    fn default() -> Self {
        Self(Channel::new())
    }
}

impl<M: RawMutex, const N: usize> HidChannel<M, N> {
    pub async fn receive(&self) -> Event {
        self.0.receive().await
    }

    pub fn try_receive(&self) -> Option<Event> {
        self.0.try_receive().ok()
    }

    pub fn try_send(&self, msg: Event) {
        if self.0.try_send(msg).is_err() {
            crate::warn!("hid event dropped");
        }
    }
}

/// LED bits from the host's most recent output report.
pub struct LedState(AtomicU8);

impl LedState {
    pub const NUM_LOCK: u8 = 1;
    pub const CAPS_LOCK: u8 = 2;
    pub const SCROLL_LOCK: u8 = 4;

    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn set(&self, bits: u8) {
        self.0.store(bits, Ordering::Relaxed);
    }

    pub fn caps_lock(&self) -> bool {
        self.0.load(Ordering::Relaxed) & Self::CAPS_LOCK != 0
    }
}

impl Default for LedState {
    fn default() -> Self {
        Self::new()
    }
}

/// The scan core's handle on the host. Key events go out through the
/// channel; lock state comes back through `leds`. Tracks whether shift is
/// currently asserted host-side so conditional resolution can branch on it.
pub struct HidSink<'c, M: RawMutex, const N: usize> {
    channel: &'c HidChannel<M, N>,
    leds: &'c LedState,
    modifier_down: bool,
}

impl<'c, M: RawMutex, const N: usize> HidSink<'c, M, N> {
    pub fn new(channel: &'c HidChannel<M, N>, leds: &'c LedState) -> Self {
        Self {
            channel,
            leds,
            modifier_down: false,
        }
    }

    pub fn press(&mut self, code: u8) {
        if code == kc::LEFT_SHIFT {
            self.modifier_down = true;
        }
        self.channel.try_send(Event::Key {
            code,
            is_down: true,
        });
    }

    pub fn release(&mut self, code: u8) {
        if code == kc::LEFT_SHIFT {
            self.modifier_down = false;
        }
        self.channel.try_send(Event::Key {
            code,
            is_down: false,
        });
    }

    /// Type a literal string. A convenience path; the matrix flow never
    /// goes through here.
    pub fn write_text(&mut self, text: &str) {
        for ch in text.chars() {
            let Some((code, shift)) = layout_us::keycode(ch) else {
                crate::debug!("no usage id for {:?}", ch);
                continue;
            };
            if shift {
                self.press(kc::LEFT_SHIFT);
            }
            self.press(code);
            self.release(code);
            if shift {
                self.release(kc::LEFT_SHIFT);
            }
        }
    }

    pub fn request_break(&mut self) {
        self.channel.try_send(Event::BreakRequest);
    }

    pub fn is_modifier_down(&self) -> bool {
        self.modifier_down
    }

    /// Host-side caps lock, for the lock indicator.
    pub fn is_modifier_lock_on(&self) -> bool {
        self.leds.caps_lock()
    }
}

/// Owns the NKRO keyboard report and writes it out on every change.
pub struct Reporter<'d, D: Driver<'d>, const DESC_SIZE: usize> {
    hid_writer: HidWriter<'d, D, DESC_SIZE>,
    keyboard_report: [u8; crate::KEY_BITS_SIZE + 2],
}

impl<'d, D: Driver<'d>, const DESC_SIZE: usize> Reporter<'d, D, DESC_SIZE> {
    pub fn new(hid_writer: HidWriter<'d, D, DESC_SIZE>) -> Self {
        let mut keyboard_report = [0; crate::KEY_BITS_SIZE + 2];
        keyboard_report[0] = KEYBOARD_REPORT_ID;
        Self {
            hid_writer,
            keyboard_report,
        }
    }

    async fn write_keyboard_report(&mut self) {
        if let Err(e) = self.hid_writer.write(&self.keyboard_report).await {
            crate::warn!("failed to send report: {:?}", e);
        }
    }

    pub async fn report(&mut self, msg: Event) {
        match msg {
            Event::Key { code, is_down } => {
                if is_down {
                    if !self.add_key(code) {
                        // already down: show the host a release first so
                        // this press registers as a new one
                        self.remove_key(code);
                        self.write_keyboard_report().await;
                        self.add_key(code);
                    }
                } else {
                    self.remove_key(code);
                }
                self.write_keyboard_report().await;
            }
            Event::BreakRequest => {
                crate::info!("machine reset requested");
                firmware_functions::reset();
            }
        }
    }

    fn add_key(&mut self, code: u8) -> bool {
        if is_modifier(code) {
            let bit = 1 << (code - 0xe0);
            self.keyboard_report[1] |= bit;
            return true;
        }
        add_key_bit(&mut self.keyboard_report[2..], code)
    }

    fn remove_key(&mut self, code: u8) {
        if is_modifier(code) {
            let bit = !(1 << (code - 0xe0));
            self.keyboard_report[1] &= bit;
            return;
        }
        del_key_bit(&mut self.keyboard_report[2..], code);
    }
}

#[cfg(test)]
extern crate std;

#[cfg(test)]
#[path = "reporter_test.rs"]
mod test;
