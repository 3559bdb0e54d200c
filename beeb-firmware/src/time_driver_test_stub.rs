extern crate std;

use core::cell::RefCell;
use embassy_time_driver::{AlarmHandle, Driver};
use std::time::SystemTime;

// Settable clock; falls back to the wall clock until the test pins it.
std::thread_local! {
    static NOW: RefCell<u64> = const { RefCell::new(0) };
}

struct TestTimeDriver;

impl Driver for TestTimeDriver {
    fn now(&self) -> u64 {
        NOW.with_borrow(|now| {
            if *now == 0 {
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .unwrap()
                    .as_micros() as u64
            } else {
                *now
            }
        })
    }

    unsafe fn allocate_alarm(&self) -> Option<AlarmHandle> {
        Some(AlarmHandle::new(0))
    }

    fn set_alarm_callback(&self, _alarm: AlarmHandle, _callback: fn(*mut ()), _ctx: *mut ()) {}

    fn set_alarm(&self, _alarm: AlarmHandle, timestamp: u64) -> bool {
        // jump straight to the deadline and report it as already passed;
        // a waiting timer then completes on its next poll
        NOW.with_borrow_mut(|now| {
            if *now != 0 && timestamp > *now {
                *now = timestamp;
            }
        });
        false
    }
}

embassy_time_driver::time_driver_impl!(static TIME_DRIVER: TestTimeDriver = TestTimeDriver);

pub fn set_time(t: u64) {
    NOW.with_borrow_mut(|now| *now = t);
}

pub fn advance(d: u64) {
    NOW.with_borrow_mut(|now| *now += d);
}
