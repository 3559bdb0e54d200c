//! USB HID Keyboard/Keypad page (0x07) usage ids.
//!
//! Only the codes reachable from the BBC Micro matrix and the US text layout
//! are named here; the ranges cover everything a report may carry.

pub mod key_range {
    pub const BASIC_MIN: u8 = 0x04;
    pub const BASIC_MAX: u8 = 0xa4;
    pub const MODIFIER_MIN: u8 = 0xe0;
    pub const MODIFIER_MAX: u8 = 0xe7;
}

/// Is `code` one of the eight modifier usages (0xe0..=0xe7)?
pub fn is_modifier(code: u8) -> bool {
    (key_range::MODIFIER_MIN..=key_range::MODIFIER_MAX).contains(&code)
}

/// Is `code` a usage id a keyboard report can legally carry?
pub fn is_reportable(code: u8) -> bool {
    (key_range::BASIC_MIN..=key_range::BASIC_MAX).contains(&code) || is_modifier(code)
}

pub mod kc {
    pub const A: u8 = 0x04;
    pub const B: u8 = 0x05;
    pub const C: u8 = 0x06;
    pub const D: u8 = 0x07;
    pub const E: u8 = 0x08;
    pub const F: u8 = 0x09;
    pub const G: u8 = 0x0a;
    pub const H: u8 = 0x0b;
    pub const I: u8 = 0x0c;
    pub const J: u8 = 0x0d;
    pub const K: u8 = 0x0e;
    pub const L: u8 = 0x0f;
    pub const M: u8 = 0x10;
    pub const N: u8 = 0x11;
    pub const O: u8 = 0x12;
    pub const P: u8 = 0x13;
    pub const Q: u8 = 0x14;
    pub const R: u8 = 0x15;
    pub const S: u8 = 0x16;
    pub const T: u8 = 0x17;
    pub const U: u8 = 0x18;
    pub const V: u8 = 0x19;
    pub const W: u8 = 0x1a;
    pub const X: u8 = 0x1b;
    pub const Y: u8 = 0x1c;
    pub const Z: u8 = 0x1d;

    pub const N1: u8 = 0x1e;
    pub const N2: u8 = 0x1f;
    pub const N3: u8 = 0x20;
    pub const N4: u8 = 0x21;
    pub const N5: u8 = 0x22;
    pub const N6: u8 = 0x23;
    pub const N7: u8 = 0x24;
    pub const N8: u8 = 0x25;
    pub const N9: u8 = 0x26;
    pub const N0: u8 = 0x27;

    pub const ENTER: u8 = 0x28;
    pub const ESCAPE: u8 = 0x29;
    pub const BACKSPACE: u8 = 0x2a;
    pub const TAB: u8 = 0x2b;
    pub const SPACE: u8 = 0x2c;
    pub const MINUS: u8 = 0x2d;
    pub const EQUALS: u8 = 0x2e;
    pub const LEFT_BRACKET: u8 = 0x2f;
    pub const RIGHT_BRACKET: u8 = 0x30;
    pub const BACKSLASH: u8 = 0x31;
    /// Non-US `#` — carries the pound sign on the UK layout.
    pub const POUND: u8 = 0x32;
    pub const SEMICOLON: u8 = 0x33;
    pub const QUOTE: u8 = 0x34;
    pub const GRAVE: u8 = 0x35;
    pub const COMMA: u8 = 0x36;
    pub const PERIOD: u8 = 0x37;
    pub const SLASH: u8 = 0x38;
    pub const CAPS_LOCK: u8 = 0x39;

    pub const F1: u8 = 0x3a;
    pub const F2: u8 = 0x3b;
    pub const F3: u8 = 0x3c;
    pub const F4: u8 = 0x3d;
    pub const F5: u8 = 0x3e;
    pub const F6: u8 = 0x3f;
    pub const F7: u8 = 0x40;
    pub const F8: u8 = 0x41;
    pub const F9: u8 = 0x42;
    pub const F10: u8 = 0x43;

    pub const DELETE: u8 = 0x4c;
    pub const RIGHT_ARROW: u8 = 0x4f;
    pub const LEFT_ARROW: u8 = 0x50;
    pub const DOWN_ARROW: u8 = 0x51;
    pub const UP_ARROW: u8 = 0x52;
    pub const KEYPAD_ASTERISK: u8 = 0x55;

    pub const LEFT_CONTROL: u8 = 0xe0;
    pub const LEFT_SHIFT: u8 = 0xe1;
    pub const LEFT_ALT: u8 = 0xe2;
    pub const LEFT_GUI: u8 = 0xe3;
}
