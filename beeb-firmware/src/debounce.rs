//! Turns raw switch observations into clean key-down / key-up events.
//!
//! These switches chatter; worse, the chatter profile differs between a
//! key's first press and a press that immediately follows its own release.
//! Each observed key gets a pending entry and an asymmetric dwell window;
//! while the entry lives, re-observations are ignored, and when the window
//! expires the key-up is emitted. A whole poll with nothing down shortens
//! the window, since silence means the key has already physically let go.

use beeb_common::keycodes::kc;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};
use heapless::Vec;

use crate::keymap::{BaseKey, KeyId, Observation};
use crate::reporter::HidSink;

/// Every assigned matrix key plus the break button.
pub const PENDING_MAX: usize = 80;

/// Dwell windows. A key's first press settles on `delay`; a press that
/// follows its own release settles on `short_delay`.
#[derive(Debug, Clone, Copy)]
pub struct DebounceTiming {
    pub delay: Duration,
    pub short_delay: Duration,
}

impl Default for DebounceTiming {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(150),
            short_delay: Duration::from_millis(90),
        }
    }
}

struct Pending {
    id: KeyId,
    key: BaseKey,
    /// Recognized but never forwarded (the break chord).
    silent: bool,
    observed_at: Instant,
}

pub struct DebounceEngine {
    pending: Vec<Pending, PENDING_MAX>,
    /// The single most recently released identity. Its next press gets the
    /// short window.
    recent_release: Option<KeyId>,
    timing: DebounceTiming,
    /// Set by [`Self::no_input`]: the last poll saw nothing down at all.
    idle: bool,
}

impl DebounceEngine {
    pub fn new(timing: DebounceTiming) -> Self {
        Self {
            pending: Vec::new(),
            recent_release: None,
            timing,
            idle: false,
        }
    }

    /// Record one observation of a resolved matrix key. The first
    /// observation emits the down-event immediately; while the entry is
    /// pending, further observations neither re-emit nor restart the timer.
    pub fn input<M: RawMutex, const N: usize>(
        &mut self,
        obs: Observation,
        sink: &mut HidSink<'_, M, N>,
    ) {
        self.idle = false;
        let id = KeyId::Key(obs.key);
        if self.is_pending(id) {
            return;
        }
        self.key_down(obs.key, obs.escape, sink);
        self.push(id, obs.key, false);
    }

    /// Record an observation of the break button. With the modifier held
    /// this is a machine action, reported once and never forwarded as a
    /// press/release pair; bare, it types the break code like any other key.
    pub fn input_break<M: RawMutex, const N: usize>(
        &mut self,
        modifier_held: bool,
        sink: &mut HidSink<'_, M, N>,
    ) {
        self.idle = false;
        if self.is_pending(KeyId::Break) {
            return;
        }
        let key = BaseKey::Plain(kc::BACKSPACE);
        if modifier_held {
            crate::info!("break chord");
            sink.request_break();
            self.push(KeyId::Break, key, true);
        } else {
            self.key_down(key, false, sink);
            self.push(KeyId::Break, key, false);
        }
    }

    /// The scanner saw nothing down this poll.
    pub fn no_input(&mut self) {
        self.idle = true;
    }

    /// Expire pending entries whose dwell has elapsed, emitting their
    /// key-ups. Call once per tick, after the tick's observations.
    pub fn check<M: RawMutex, const N: usize>(&mut self, sink: &mut HidSink<'_, M, N>) {
        let now = Instant::now();
        let mut i = 0;
        while i < self.pending.len() {
            let entry = &self.pending[i];
            let mut dwell = if self.idle {
                // no signal at all: the key has let go, commit sooner
                Duration::from_ticks(self.timing.delay.as_ticks() / 2)
            } else {
                self.timing.delay
            };
            if self.recent_release == Some(entry.id) {
                dwell = self.timing.short_delay;
            }

            if entry.observed_at + dwell <= now {
                let expired = self.pending.swap_remove(i);
                if !expired.silent {
                    self.key_up(expired.key, sink);
                }
                self.recent_release = Some(expired.id);
            } else {
                i += 1;
            }
        }
        self.idle = false;
    }

    fn is_pending(&self, id: KeyId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    fn push(&mut self, id: KeyId, key: BaseKey, silent: bool) {
        let entry = Pending {
            id,
            key,
            silent,
            observed_at: Instant::now(),
        };
        if self.pending.push(entry).is_err() {
            crate::warn!("pending key table full");
        }
    }

    /// Emit a down-event. A `Shifted` key is a self-contained
    /// press-shift / press / release-shift triple. With `escape` set the
    /// whole emission is bracketed by release-shift ... press-shift so the
    /// alternate symbol is not itself modified, while the typist's real
    /// shift intent survives.
    fn key_down<M: RawMutex, const N: usize>(
        &mut self,
        key: BaseKey,
        escape: bool,
        sink: &mut HidSink<'_, M, N>,
    ) {
        if escape {
            sink.release(kc::LEFT_SHIFT);
        }
        match key {
            BaseKey::Shifted(code) => {
                sink.press(kc::LEFT_SHIFT);
                sink.press(code);
                sink.release(kc::LEFT_SHIFT);
            }
            BaseKey::Plain(code) => sink.press(code),
        }
        if escape {
            sink.press(kc::LEFT_SHIFT);
        }
    }

    /// Emit an up-event. Only the base code is still held by this point —
    /// the wrap shift of a `Shifted` key was already released on the way
    /// down — so the up releases the code alone.
    fn key_up<M: RawMutex, const N: usize>(&mut self, key: BaseKey, sink: &mut HidSink<'_, M, N>) {
        match key {
            BaseKey::Shifted(code) | BaseKey::Plain(code) => sink.release(code),
        }
    }
}

#[cfg(test)]
extern crate std;

#[cfg(test)]
#[path = "debounce_test.rs"]
mod test;
