//! Raw HID endpoint transport.

use embassy_usb::driver::{Driver, Endpoint, EndpointError, EndpointIn, EndpointOut};

use crate::reporter::LedState;

pub struct HidWriter<'d, D: Driver<'d>, const N: usize> {
    ep_in: D::EndpointIn,
}

impl<'d, D: Driver<'d>, const N: usize> HidWriter<'d, D, N> {
    pub fn new(ep_in: <D>::EndpointIn) -> Self {
        Self { ep_in }
    }

    /// Writes `report` to its interrupt endpoint.
    pub async fn write(&mut self, report: &[u8]) -> Result<(), EndpointError> {
        assert!(report.len() <= N);

        let max_packet_size = usize::from(self.ep_in.info().max_packet_size);
        let zlp_needed = report.len() < N && report.len() % max_packet_size == 0;
        for chunk in report.chunks(max_packet_size) {
            self.ep_in.write(chunk).await?;
        }

        if zlp_needed {
            self.ep_in.write(&[]).await?;
        }

        Ok(())
    }
}

pub struct HidReader<'d, D: Driver<'d>, const N: usize> {
    ep_out: D::EndpointOut,
}

impl<'d, D: Driver<'d>, const N: usize> HidReader<'d, D, N> {
    pub fn new(ep_out: <D>::EndpointOut) -> Self {
        Self { ep_out }
    }

    /// Latch LED output reports from the Interrupt Out pipe into `leds`.
    ///
    /// With `use_report_ids` the first byte of each report is the report id
    /// and the LED bits follow; otherwise the bits are the first byte. The
    /// host may also set LEDs over the control pipe; that path latches into
    /// the same [`LedState`] (see [`crate::usb`]).
    pub async fn run(mut self, use_report_ids: bool, leds: &LedState) -> ! {
        let mut buf = [0; N];
        loop {
            match self.ep_out.read(&mut buf).await {
                Ok(len) => {
                    let bits = if use_report_ids { buf.get(1) } else { buf.first() };
                    match bits {
                        Some(&bits) if len > usize::from(use_report_ids) => leds.set(bits),
                        _ => crate::warn!("runt output report ({} bytes)", len),
                    }
                }
                Err(EndpointError::Disabled) => self.ep_out.wait_enabled().await,
                Err(e) => crate::warn!("output endpoint error: {:?}", e),
            }
        }
    }
}
