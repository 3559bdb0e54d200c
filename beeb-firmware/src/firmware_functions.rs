//! Hooks into board-level machine control.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

pub type ResetFn = &'static (dyn Fn() + Sync);

static RESET: CriticalSectionMutex<RefCell<Option<ResetFn>>> =
    CriticalSectionMutex::new(RefCell::new(None));

/// Reset the machine, if the board registered a way to.
pub fn reset() {
    RESET.lock(|r| {
        if let Some(f) = r.borrow_mut().take() {
            f();
        }
    });
}

/// Register the board's reset function; invoked on the break chord.
pub fn handle_reset(value: Option<ResetFn>) {
    RESET.lock(|r| *r.borrow_mut() = value);
}

#[cfg(all(not(test), feature = "reset-on-panic", target_os = "none"))]
mod panic {
    #[panic_handler]
    fn panic(_info: &core::panic::PanicInfo) -> ! {
        super::reset();

        loop {}
    }
}
