//! The matrix key table and its resolution rules.

use beeb_common::keycodes::{is_modifier, is_reportable, kc};

pub const ROW_COUNT: usize = 8;
pub const COL_COUNT: usize = 16;

/// Matrix address of the shift key.
pub const MODIFIER_KEY: (usize, usize) = (0, 0);
/// Matrix address of the control key.
pub const CONTROL_KEY: (usize, usize) = (0, 1);

/// A key as it reaches the host: a bare usage id, or one wrapped in a
/// transient shift assertion so the host sees the shifted symbol no matter
/// what the typist's hands are doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaseKey {
    Plain(u8),
    Shifted(u8),
}

impl BaseKey {
    pub fn code(&self) -> u8 {
        match *self {
            BaseKey::Plain(code) | BaseKey::Shifted(code) => code,
        }
    }
}

/// What a matrix cell means. `Conditional` picks between two [`BaseKey`]s
/// depending on whether shift is held at the moment the switch closes;
/// the legend on these keys does not line up with a modern layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeySpec {
    Plain(u8),
    Shifted(u8),
    Conditional(BaseKey, BaseKey),
}

/// Identity a pending observation is tracked under. The break button is not
/// part of the matrix but shares the debounce machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyId {
    Key(BaseKey),
    Break,
}

/// A resolved observation: the key to emit and whether shift must be
/// momentarily escaped around its down-event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Observation {
    pub key: BaseKey,
    pub escape: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeymapError {
    BadCode { row: u8, col: u8, code: u8 },
    ModifierSlot { row: u8, col: u8 },
}

use BaseKey as B;
use KeySpec as K;

/// Matrix assignments for the Model B keyboard. Rows 0..8, columns 0..10
/// carry switches; the rest of the address space is unconnected.
const MODEL_B: &[(u8, u8, KeySpec)] = &[
    // modifiers, probed at fixed addresses
    (0, 0, K::Plain(kc::LEFT_SHIFT)),
    (0, 1, K::Plain(kc::LEFT_CONTROL)),
    // function strip
    (2, 0, K::Plain(kc::F1)),
    (7, 1, K::Plain(kc::F2)),
    (7, 2, K::Plain(kc::F3)),
    (7, 3, K::Plain(kc::F4)),
    (1, 4, K::Plain(kc::F5)),
    (7, 4, K::Plain(kc::F6)),
    (7, 5, K::Plain(kc::F7)),
    (1, 6, K::Plain(kc::F8)),
    (7, 6, K::Plain(kc::F9)),
    (7, 7, K::Plain(kc::F10)),
    // number row
    (7, 0, K::Plain(kc::ESCAPE)),
    (3, 0, K::Plain(kc::N1)),
    (3, 1, K::Plain(kc::N2)),
    (1, 1, K::Conditional(B::Plain(kc::N3), B::Plain(kc::POUND))),
    (1, 2, K::Plain(kc::N4)),
    (1, 3, K::Plain(kc::N5)),
    (3, 4, K::Conditional(B::Plain(kc::N6), B::Shifted(kc::N7))),
    (2, 4, K::Conditional(B::Plain(kc::N7), B::Plain(kc::QUOTE))),
    (1, 5, K::Conditional(B::Plain(kc::N8), B::Shifted(kc::N9))),
    (2, 6, K::Conditional(B::Plain(kc::N9), B::Shifted(kc::N0))),
    (2, 7, K::Plain(kc::N0)),
    (1, 7, K::Conditional(B::Plain(kc::MINUS), B::Plain(kc::EQUALS))),
    (1, 8, K::Conditional(B::Shifted(kc::N6), B::Shifted(kc::POUND))),
    (7, 8, K::Plain(kc::BACKSLASH)),
    (1, 9, K::Plain(kc::LEFT_ARROW)),
    (7, 9, K::Plain(kc::RIGHT_ARROW)),
    // top letter row
    (6, 0, K::Plain(kc::TAB)),
    (1, 0, K::Plain(kc::Q)),
    (2, 1, K::Plain(kc::W)),
    (2, 2, K::Plain(kc::E)),
    (3, 3, K::Plain(kc::R)),
    (2, 3, K::Plain(kc::T)),
    (4, 4, K::Plain(kc::Y)),
    (3, 5, K::Plain(kc::U)),
    (2, 5, K::Plain(kc::I)),
    (3, 6, K::Plain(kc::O)),
    (3, 7, K::Plain(kc::P)),
    (4, 7, K::Shifted(kc::QUOTE)), // @
    (3, 8, K::Plain(kc::LEFT_BRACKET)),
    (2, 8, K::Conditional(B::Shifted(kc::MINUS), B::Shifted(kc::N3))), // _ and pound
    (3, 9, K::Plain(kc::UP_ARROW)),
    (2, 9, K::Plain(kc::DOWN_ARROW)),
    // home row
    (4, 0, K::Plain(kc::CAPS_LOCK)),
    (4, 1, K::Plain(kc::A)),
    (5, 1, K::Plain(kc::S)),
    (3, 2, K::Plain(kc::D)),
    (4, 3, K::Plain(kc::F)),
    (5, 3, K::Plain(kc::G)),
    (5, 4, K::Plain(kc::H)),
    (4, 5, K::Plain(kc::J)),
    (4, 6, K::Plain(kc::K)),
    (5, 6, K::Plain(kc::L)),
    (5, 7, K::Conditional(B::Plain(kc::SEMICOLON), B::Shifted(kc::EQUALS))),
    (4, 8, K::Conditional(B::Plain(kc::KEYPAD_ASTERISK), B::Shifted(kc::SEMICOLON))),
    (5, 8, K::Plain(kc::RIGHT_BRACKET)),
    (4, 9, K::Plain(kc::ENTER)),
    // bottom row
    (5, 0, K::Plain(kc::LEFT_ALT)),
    (6, 1, K::Plain(kc::Z)),
    (4, 2, K::Plain(kc::X)),
    (5, 2, K::Plain(kc::C)),
    (6, 3, K::Plain(kc::V)),
    (6, 4, K::Plain(kc::B)),
    (5, 5, K::Plain(kc::N)),
    (6, 5, K::Plain(kc::M)),
    (6, 6, K::Plain(kc::COMMA)),
    (6, 7, K::Plain(kc::PERIOD)),
    (6, 8, K::Plain(kc::SLASH)),
    (5, 9, K::Plain(kc::DELETE)),
    (6, 9, K::Plain(kc::LEFT_GUI)),
    (6, 2, K::Plain(kc::SPACE)),
];

/// Sparse mapping from matrix address to [`KeySpec`]. Built once at startup
/// and read-only afterwards.
pub struct KeyTable {
    slots: [[Option<KeySpec>; COL_COUNT]; ROW_COUNT],
}

impl KeyTable {
    fn empty() -> Self {
        Self {
            slots: [[None; COL_COUNT]; ROW_COUNT],
        }
    }

    pub fn bbc_model_b() -> Self {
        let mut table = Self::empty();
        for &(row, col, spec) in MODEL_B {
            table.set(row as usize, col as usize, spec);
        }
        table
    }

    fn set(&mut self, row: usize, col: usize, spec: KeySpec) {
        self.slots[row][col] = Some(spec);
    }

    pub fn get(&self, row: usize, col: usize) -> Option<KeySpec> {
        self.slots.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Resolve a closed switch to what the debounce engine should track.
    ///
    /// Unassigned cells resolve to `None` and are dropped without comment.
    /// A `Conditional` cell picks its alternate, with a shift escape, when
    /// the modifier is held right now; a modifier released later does not
    /// change what was committed to here.
    pub fn resolve(&self, row: usize, col: usize, modifier_down: bool) -> Option<Observation> {
        let spec = self.get(row, col)?;
        Some(match spec {
            KeySpec::Plain(code) => Observation {
                key: BaseKey::Plain(code),
                escape: false,
            },
            KeySpec::Shifted(code) => Observation {
                key: BaseKey::Shifted(code),
                escape: false,
            },
            KeySpec::Conditional(primary, alternate) => {
                if modifier_down {
                    Observation {
                        key: alternate,
                        escape: true,
                    }
                } else {
                    Observation {
                        key: primary,
                        escape: false,
                    }
                }
            }
        })
    }

    /// Reject a table that references codes a report cannot carry, wraps a
    /// modifier inside a shift or conditional entry, or does not keep plain
    /// modifiers at the two probe addresses. Cheap and total, so run before
    /// the scan loop ever starts.
    pub fn validate(&self) -> Result<(), KeymapError> {
        for (row, cols) in self.slots.iter().enumerate() {
            for (col, slot) in cols.iter().enumerate() {
                let Some(spec) = slot else { continue };
                let bad = |code| KeymapError::BadCode {
                    row: row as u8,
                    col: col as u8,
                    code,
                };
                match *spec {
                    KeySpec::Plain(code) => {
                        if !is_reportable(code) {
                            return Err(bad(code));
                        }
                    }
                    KeySpec::Shifted(code) => {
                        if !is_reportable(code) || is_modifier(code) {
                            return Err(bad(code));
                        }
                    }
                    KeySpec::Conditional(primary, alternate) => {
                        for key in [primary, alternate] {
                            let code = key.code();
                            if !is_reportable(code) || is_modifier(code) {
                                return Err(bad(code));
                            }
                        }
                    }
                }
            }
        }

        for (row, col) in [MODIFIER_KEY, CONTROL_KEY] {
            match self.get(row, col) {
                Some(KeySpec::Plain(code)) if is_modifier(code) => {}
                _ => {
                    return Err(KeymapError::ModifierSlot {
                        row: row as u8,
                        col: col as u8,
                    })
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "keymap_test.rs"]
mod test;
