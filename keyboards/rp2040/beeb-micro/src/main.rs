#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;

use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_usb::Config;
use static_cell::StaticCell;

use beeb_firmware::controller::{Indicators, ScanLoopController};
use beeb_firmware::debounce::DebounceTiming;
use beeb_firmware::firmware_functions;
use beeb_firmware::hid::{HidReader, HidWriter};
use beeb_firmware::keymap::KeyTable;
use beeb_firmware::pin::{Drive, EdgeDebouncer, Sense};
use beeb_firmware::reporter::{HidChannel, HidSink, LedState, Reporter};
use beeb_firmware::scanner::{MatrixScanner, ScanMode};
use beeb_firmware::usb::{Configurator, DeviceState, UsbBuffers};

// ---------------- User config ------------------

const VENDOR_ID: u16 = 0x2e8a;
const PRODUCT_ID: u16 = 0x0107;
const MANUFACTURER: &str = "Owlet Works";
const PRODUCT: &str = "BBC Micro keyboard";
const SERIAL_NUMBER: &str = "beeb:0001";
const MAX_POWER: u16 = 100;

// How many key events can queue before the scan loop drops them
const EVENT_BUFFER_SIZE: usize = 32;

// Consecutive ticks the break button must agree before it counts
const BREAK_SETTLE_TICKS: u8 = 5;

// ----------- End of user config ----------------

type EventChannel = HidChannel<NoopRawMutex, EVENT_BUFFER_SIZE>;
type BeebScanner = MatrixScanner<Input<'static>, Output<'static>, 3, 4>;
type BeebController =
    ScanLoopController<'static, Input<'static>, Output<'static>, NoopRawMutex, 3, 4, EVENT_BUFFER_SIZE>;

static EVENT_CHANNEL: StaticCell<EventChannel> = StaticCell::new();
static LED_STATE: LedState = LedState::new();

static USB_CONFIG: StaticCell<Configurator<'static>> = StaticCell::new();
static USB_BUFFERS: StaticCell<UsbBuffers> = StaticCell::new();
static DEVICE_STATE: StaticCell<DeviceState<'static>> = StaticCell::new();

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

fn reset() {
    cortex_m::peripheral::SCB::sys_reset()
}

#[embassy_executor::task]
async fn scan_loop(controller: BeebController) {
    controller.run().await
}

#[embassy_executor::task]
async fn hid_reporter(
    channel: &'static EventChannel,
    writer: HidWriter<'static, Driver<'static, USB>, 34>,
) {
    let mut reporter = Reporter::new(writer);
    loop {
        reporter.report(channel.receive().await).await;
    }
}

#[embassy_executor::task]
async fn led_reader(reader: HidReader<'static, Driver<'static, USB>, 4>) {
    reader.run(true, &LED_STATE).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    firmware_functions::handle_reset(Some(&reset));

    // keyboard connector: select bus is wired most significant bit first
    let row_select = [
        Drive::new(Output::new(p.PIN_5, Level::Low)),
        Drive::new(Output::new(p.PIN_4, Level::Low)),
        Drive::new(Output::new(p.PIN_3, Level::Low)),
    ];
    let col_select = [
        Drive::new(Output::new(p.PIN_9, Level::Low)),
        Drive::new(Output::new(p.PIN_8, Level::Low)),
        Drive::new(Output::new(p.PIN_7, Level::Low)),
        Drive::new(Output::new(p.PIN_6, Level::Low)),
    ];
    let strobe = Drive::new(Output::new(p.PIN_1, Level::High));
    // the scan-enable line is active low
    let enable = Drive::inverted(Output::new(p.PIN_2, Level::High));
    let sense = Sense::new(Input::new(p.PIN_10, Pull::Down));
    let activity = Sense::new(Input::new(p.PIN_12, Pull::Up));

    let break_button = EdgeDebouncer::new(
        Sense::inverted(Input::new(p.PIN_0, Pull::Up)),
        BREAK_SETTLE_TICKS,
    );

    // case leds are wired reversed, except the on-board one
    let indicators = Indicators {
        heartbeat: Drive::new(Output::new(p.PIN_25, Level::Low)),
        lock: Drive::inverted(Output::new(p.PIN_15, Level::High)),
        shift_lock: Drive::inverted(Output::new(p.PIN_14, Level::High)),
        motor: Drive::inverted(Output::new(p.PIN_13, Level::High)),
    };

    let scanner = BeebScanner::new(
        row_select,
        col_select,
        strobe,
        enable,
        sense,
        ScanMode::Interrupt(activity),
    );

    let channel: &'static EventChannel = EVENT_CHANNEL.init(EventChannel::default());
    let sink = HidSink::new(channel, &LED_STATE);

    let controller = match ScanLoopController::new(
        scanner,
        KeyTable::bbc_model_b(),
        DebounceTiming::default(),
        sink,
        break_button,
        indicators,
    ) {
        Ok(controller) => controller,
        Err(_) => panic!("key table failed validation"),
    };

    let mut config = Config::new(VENDOR_ID, PRODUCT_ID);
    config.manufacturer = Some(MANUFACTURER);
    config.product = Some(PRODUCT);
    config.serial_number = Some(SERIAL_NUMBER);
    config.max_power = MAX_POWER;

    let usb_config: &'static mut Configurator<'static> =
        USB_CONFIG.init(Configurator::new(config));
    let usb_buffers: &'static mut UsbBuffers = USB_BUFFERS.init(UsbBuffers::default());
    let device_state: &'static mut DeviceState<'static> =
        DEVICE_STATE.init(DeviceState::default());

    let driver = Driver::new(p.USB, Irqs);
    let mut usb_builder = usb_config.usb_builder(driver, usb_buffers).unwrap();
    let (writer, reader) =
        usb_config.add_keyboard_iface::<_, 4, 34>(&mut usb_builder, device_state, &LED_STATE);
    let mut usb = usb_builder.build();

    spawner.spawn(scan_loop(controller)).unwrap();
    spawner.spawn(hid_reporter(channel, writer)).unwrap();
    spawner.spawn(led_reader(reader)).unwrap();

    usb.run().await
}
