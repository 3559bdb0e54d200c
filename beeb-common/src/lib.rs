#![no_std]
pub mod keycodes;

#[cfg(test)]
#[path = "keycodes_test.rs"]
mod test;
