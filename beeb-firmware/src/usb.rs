//! USB device plumbing for the single HID keyboard interface.

use core::mem::MaybeUninit;

use embassy_usb::{
    class::hid::ReportId,
    control::{InResponse, OutResponse, Recipient, Request, RequestType},
    driver::Driver,
    types::InterfaceNumber,
    Builder, Config, Handler,
};

use crate::hid::{HidReader, HidWriter};
use crate::reporter::{LedState, KEYBOARD_REPORT_ID};

const HID_DESC_DESCTYPE_HID: u8 = 0x21;
const HID_DESC_DESCTYPE_HID_REPORT: u8 = 0x22;
const HID_DESC_SPEC_1_11: [u8; 2] = [0x11, 0x01];
const HID_DESC_COUNTRY_UNSPEC: u8 = 0x00;

const HID_REQ_SET_IDLE: u8 = 0x0a;
const HID_REQ_GET_IDLE: u8 = 0x02;
const HID_REQ_GET_REPORT: u8 = 0x01;
const HID_REQ_SET_REPORT: u8 = 0x09;
const HID_REQ_GET_PROTOCOL: u8 = 0x03;
const HID_REQ_SET_PROTOCOL: u8 = 0x0b;

/// NKRO keyboard: 8 modifier bits, a 255-key bitmap, 5 LED bits back.
#[rustfmt::skip]
pub const KEYBOARD_REPORT_DESC: [u8; 59] = [
    0x05, 0x01,               // USAGE_PAGE   Generic Desktop
    0x09, 0x06,               // USAGE        Keyboard
    0xA1, 0x01,               // COLLECTION   Application
    0x85, KEYBOARD_REPORT_ID, //   REPORT_ID
    0x05, 0x07,               //   USAGE_PAGE Keyboard/Keypad
    0x19, 0xE0,               //   USAGE_MINIMUM  LeftControl
    0x29, 0xE7,               //   USAGE_MAXIMUM  Right GUI
    0x15, 0x00,               //   LOGICAL_MINIMUM 0
    0x25, 0x01,               //   LOGICAL_MAXIMUM 1
    0x95, 0x08,               //   REPORT_COUNT 8
    0x75, 0x01,               //   REPORT_SIZE  1
    0x81, 0x02,               //   INPUT        (Data, Variable, Absolute)
    0x05, 0x07,               //   USAGE_PAGE   Keyboard/Keypad
    0x19, 0x00,               //   USAGE_MINIMUM 0
    0x29, 0xFE,               //   USAGE_MAXIMUM 0xfe
    0x15, 0x00,               //   LOGICAL_MINIMUM 0
    0x25, 0x01,               //   LOGICAL_MAXIMUM 1
    0x95, 0xFF,               //   REPORT_COUNT 255
    0x75, 0x01,               //   REPORT_SIZE  1
    0x81, 0x02,               //   INPUT        (Data, Variable, Absolute)
    0x05, 0x08,               //   USAGE_PAGE   LED
    0x19, 0x01,               //   USAGE_MINIMUM Num Lock
    0x29, 0x05,               //   USAGE_MAXIMUM Kana
    0x95, 0x05,               //   REPORT_COUNT 5
    0x75, 0x01,               //   REPORT_SIZE  1
    0x91, 0x02,               //   OUTPUT       (Data, Variable, Absolute)
    0x95, 0x01,               //   REPORT_COUNT 1
    0x75, 0x03,               //   REPORT_SIZE  3
    0x91, 0x01,               //   OUTPUT       (Constant) padding
    0xC0,                     // END_COLLECTION
];

/// Internal state for the HID interface.
pub struct DeviceState<'d> {
    control: MaybeUninit<Control<'d>>,
}

impl Default for DeviceState<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceState<'_> {
    pub const fn new() -> Self {
        DeviceState {
            control: MaybeUninit::uninit(),
        }
    }
}

const CONFIG_SIZE: usize = 128;
const BOS_SIZE: usize = 32;
const MSOS_SIZE: usize = 0;
const CONTROL_SIZE: usize = 64;

pub struct UsbBuffers {
    config_descriptor_buf: [u8; CONFIG_SIZE],
    bos_descriptor_buf: [u8; BOS_SIZE],
    msos_descriptor_buf: [u8; MSOS_SIZE],
    control_buf: [u8; CONTROL_SIZE],
}

impl Default for UsbBuffers {
    fn default() -> Self {
        Self {
            config_descriptor_buf: [0; CONFIG_SIZE],
            bos_descriptor_buf: [0; BOS_SIZE],
            msos_descriptor_buf: [0; MSOS_SIZE],
            control_buf: [0; CONTROL_SIZE],
        }
    }
}

pub struct Configurator<'d> {
    device_config: Option<Config<'d>>,
    max_packet_size: u16,
    poll_ms: u8,
}

impl<'d> Configurator<'d> {
    pub fn new(device_config: Config<'d>) -> Self {
        Self {
            device_config: Some(device_config),
            max_packet_size: device_config.max_packet_size_0 as u16,
            poll_ms: 1,
        }
    }

    /// The builder can only be taken once.
    pub fn usb_builder<D: Driver<'d>>(
        &mut self,
        driver: D,
        buffers: &'d mut UsbBuffers,
    ) -> Option<Builder<'d, D>> {
        self.device_config.take().map(|device_config| {
            Builder::new(
                driver,
                device_config,
                &mut buffers.config_descriptor_buf,
                &mut buffers.bos_descriptor_buf,
                &mut buffers.msos_descriptor_buf,
                &mut buffers.control_buf,
            )
        })
    }

    /// Add the keyboard interface: one interrupt-in endpoint for reports,
    /// one interrupt-out for LED state, and a control handler that answers
    /// the class requests and latches control-pipe LED writes into `leds`.
    pub fn add_keyboard_iface<'a, D: Driver<'d>, const READ_N: usize, const WRITE_N: usize>(
        &'d self,
        builder: &'a mut Builder<'d, D>,
        state: &'d mut DeviceState<'d>,
        leds: &'d LedState,
    ) -> (HidWriter<'d, D, WRITE_N>, HidReader<'d, D, READ_N>) {
        let mut func = builder.function(3, 1, 1);
        let mut iface = func.interface();
        let if_num = iface.interface_number();
        let mut alt = iface.alt_setting(3, 1, 1, None);

        let len = KEYBOARD_REPORT_DESC.len();
        alt.descriptor(
            HID_DESC_DESCTYPE_HID,
            &[
                HID_DESC_SPEC_1_11[0],
                HID_DESC_SPEC_1_11[1],
                HID_DESC_COUNTRY_UNSPEC,
                1, // one descriptor follows
                HID_DESC_DESCTYPE_HID_REPORT,
                (len & 0xFF) as u8,
                (len >> 8 & 0xFF) as u8,
            ],
        );

        let ep_in = alt.endpoint_interrupt_in(self.max_packet_size, self.poll_ms);
        let ep_out = alt.endpoint_interrupt_out(self.max_packet_size, self.poll_ms);

        drop(func);

        let control = Control::new(if_num, &KEYBOARD_REPORT_DESC, leds);
        builder.handler(state.control.write(control));

        (HidWriter::new(ep_in), HidReader::new(ep_out))
    }
}

struct Control<'d> {
    if_num: InterfaceNumber,
    report_descriptor: &'d [u8],
    leds: &'d LedState,
    hid_descriptor: [u8; 9],
}

impl<'d> Control<'d> {
    fn new(if_num: InterfaceNumber, report_descriptor: &'d [u8], leds: &'d LedState) -> Self {
        Control {
            if_num,
            report_descriptor,
            leds,
            hid_descriptor: [
                9, // length, including this byte
                HID_DESC_DESCTYPE_HID,
                HID_DESC_SPEC_1_11[0],
                HID_DESC_SPEC_1_11[1],
                HID_DESC_COUNTRY_UNSPEC,
                1, // one descriptor follows
                HID_DESC_DESCTYPE_HID_REPORT,
                (report_descriptor.len() & 0xFF) as u8,
                (report_descriptor.len() >> 8 & 0xFF) as u8,
            ],
        }
    }

    fn set_led_report(&self, data: &[u8]) -> OutResponse {
        // with report ids in play the id byte leads the LED bits
        match data {
            [KEYBOARD_REPORT_ID, bits, ..] | [bits] => {
                self.leds.set(*bits);
                OutResponse::Accepted
            }
            _ => OutResponse::Rejected,
        }
    }
}

impl Handler for Control<'_> {
    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        if (req.request_type, req.recipient, req.index)
            != (
                RequestType::Class,
                Recipient::Interface,
                self.if_num.0 as u16,
            )
        {
            return None;
        }

        match req.request {
            // how often to resend an unchanged report; we only send changes
            HID_REQ_SET_IDLE => Some(OutResponse::Accepted),
            HID_REQ_SET_REPORT => match report_id_try_from(req.value) {
                Ok(ReportId::Out(_)) => Some(self.set_led_report(data)),
                _ => Some(OutResponse::Rejected),
            },
            HID_REQ_SET_PROTOCOL => {
                if req.value == 1 {
                    Some(OutResponse::Accepted)
                } else {
                    crate::warn!("HID boot protocol is unsupported");
                    Some(OutResponse::Rejected)
                }
            }
            _ => Some(OutResponse::Rejected),
        }
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if req.index != self.if_num.0 as u16 {
            return None;
        }

        match (req.request_type, req.recipient) {
            (RequestType::Standard, Recipient::Interface) => match req.request {
                Request::GET_DESCRIPTOR => match (req.value >> 8) as u8 {
                    HID_DESC_DESCTYPE_HID_REPORT => {
                        Some(InResponse::Accepted(self.report_descriptor))
                    }
                    HID_DESC_DESCTYPE_HID => Some(InResponse::Accepted(&self.hid_descriptor)),
                    _ => Some(InResponse::Rejected),
                },
                _ => Some(InResponse::Rejected),
            },
            (RequestType::Class, Recipient::Interface) => match req.request {
                HID_REQ_GET_IDLE => {
                    buf[0] = 0;
                    Some(InResponse::Accepted(&buf[0..1]))
                }
                HID_REQ_GET_PROTOCOL => {
                    // report protocol only
                    buf[0] = 1;
                    Some(InResponse::Accepted(&buf[0..1]))
                }
                HID_REQ_GET_REPORT => Some(InResponse::Rejected),
                _ => Some(InResponse::Rejected),
            },
            _ => None,
        }
    }
}

const fn report_id_try_from(value: u16) -> Result<ReportId, ()> {
    match value >> 8 {
        1 => Ok(ReportId::In(value as u8)),
        2 => Ok(ReportId::Out(value as u8)),
        3 => Ok(ReportId::Feature(value as u8)),
        _ => Err(()),
    }
}
