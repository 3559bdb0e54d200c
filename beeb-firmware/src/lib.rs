#![no_std]
pub mod controller;
pub mod debounce;
pub mod firmware_functions;
pub mod hid;
pub mod keymap;
pub mod layout_us;
pub mod pin;
pub mod reporter;
pub mod scanner;
pub mod usb;

#[cfg(any(test, feature = "test-utils"))]
pub mod pin_test_stub;
#[cfg(any(test, feature = "test-utils"))]
pub mod usb_test_stub;
#[cfg(test)]
pub mod time_driver_test_stub;

#[macro_use]
mod macros;

/// Bytes in the NKRO key bitmap of a keyboard report.
pub(crate) const KEY_BITS_SIZE: usize = 32;

/// Set the bit for `kc`. True if the key was not already down.
fn add_key_bit(keys_down: &mut [u8], kc: u8) -> bool {
    let i = (kc >> 3) as usize;
    if i >= KEY_BITS_SIZE {
        crate::error!("key out of report range: {}", kc);
        return false;
    }
    let bp = 1 << (kc & 7);
    let old = keys_down[i];
    keys_down[i] |= bp;
    old & bp == 0
}

/// Clear the bit for `kc`. True if the key was down.
fn del_key_bit(keys_down: &mut [u8], kc: u8) -> bool {
    let i = (kc >> 3) as usize;
    if i >= KEY_BITS_SIZE {
        crate::error!("key out of report range: {}", kc);
        return false;
    }
    let bp = 1 << (kc & 7);
    let old = keys_down[i];
    keys_down[i] &= !bp;
    old & bp != 0
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
