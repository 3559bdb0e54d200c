//! Minimal US-layout mapping for typing literal text.

use beeb_common::keycodes::kc;

/// Usage id and shift requirement for `ch`, if it is typeable on the US
/// layout. Anything else returns `None`.
pub fn keycode(ch: char) -> Option<(u8, bool)> {
    Some(match ch {
        'a'..='z' => (kc::A + (ch as u8 - b'a'), false),
        'A'..='Z' => (kc::A + (ch as u8 - b'A'), true),
        '1'..='9' => (kc::N1 + (ch as u8 - b'1'), false),
        '0' => (kc::N0, false),
        ' ' => (kc::SPACE, false),
        '\n' => (kc::ENTER, false),
        '\t' => (kc::TAB, false),
        '!' => (kc::N1, true),
        '@' => (kc::N2, true),
        '#' => (kc::N3, true),
        '$' => (kc::N4, true),
        '%' => (kc::N5, true),
        '^' => (kc::N6, true),
        '&' => (kc::N7, true),
        '*' => (kc::N8, true),
        '(' => (kc::N9, true),
        ')' => (kc::N0, true),
        '-' => (kc::MINUS, false),
        '_' => (kc::MINUS, true),
        '=' => (kc::EQUALS, false),
        '+' => (kc::EQUALS, true),
        '[' => (kc::LEFT_BRACKET, false),
        '{' => (kc::LEFT_BRACKET, true),
        ']' => (kc::RIGHT_BRACKET, false),
        '}' => (kc::RIGHT_BRACKET, true),
        '\\' => (kc::BACKSLASH, false),
        '|' => (kc::BACKSLASH, true),
        ';' => (kc::SEMICOLON, false),
        ':' => (kc::SEMICOLON, true),
        '\'' => (kc::QUOTE, false),
        '"' => (kc::QUOTE, true),
        '`' => (kc::GRAVE, false),
        '~' => (kc::GRAVE, true),
        ',' => (kc::COMMA, false),
        '<' => (kc::COMMA, true),
        '.' => (kc::PERIOD, false),
        '>' => (kc::PERIOD, true),
        '/' => (kc::SLASH, false),
        '?' => (kc::SLASH, true),
        _ => return None,
    })
}

#[cfg(test)]
#[path = "layout_us_test.rs"]
mod test;
