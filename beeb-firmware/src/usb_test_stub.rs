//! A fake `embassy-usb` driver whose in-endpoint records every write.

extern crate std;

use core::cmp::min;
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, channel::Channel};
use embassy_usb::driver::{
    Bus, ControlPipe, Driver, Endpoint, EndpointAddress, EndpointIn, EndpointInfo, EndpointOut,
    EndpointType,
};
use std::rc::Rc;
use std::vec::Vec;

const MAX_PACKET: usize = 64;

#[derive(Clone)]
pub struct MessageChannel(Rc<Channel<NoopRawMutex, Vec<u8>, 16>>);

impl MessageChannel {
    pub async fn send(&self, msg: Vec<u8>) {
        self.0.send(msg).await;
    }

    pub fn get(&self) -> Vec<u8> {
        self.0.try_receive().unwrap()
    }

    pub fn try_get(&self) -> Option<Vec<u8>> {
        self.0.try_receive().ok()
    }

    pub async fn receive(&self) -> Vec<u8> {
        self.0.receive().await
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self(Rc::new(Channel::new()))
    }
}

pub struct FakeEndpointIn {
    pub messages: MessageChannel,
    pub info: EndpointInfo,
}

impl Endpoint for FakeEndpointIn {
    fn info(&self) -> &EndpointInfo {
        &self.info
    }

    async fn wait_enabled(&mut self) {}
}

impl EndpointIn for FakeEndpointIn {
    async fn write(&mut self, buf: &[u8]) -> Result<(), embassy_usb::driver::EndpointError> {
        self.messages.send(Vec::from(buf)).await;
        Ok(())
    }
}

impl Default for FakeEndpointIn {
    fn default() -> Self {
        Self {
            messages: MessageChannel::default(),
            info: EndpointInfo {
                addr: EndpointAddress::from(0),
                ep_type: EndpointType::Interrupt,
                max_packet_size: MAX_PACKET as u16,
                interval_ms: 1,
            },
        }
    }
}

pub struct FakeEndpointOut {
    pub messages: Channel<NoopRawMutex, Vec<u8>, 16>,
}

impl Endpoint for FakeEndpointOut {
    fn info(&self) -> &EndpointInfo {
        unimplemented!()
    }

    async fn wait_enabled(&mut self) {}
}

impl EndpointOut for FakeEndpointOut {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, embassy_usb::driver::EndpointError> {
        let msg = self.messages.receive().await;
        let msg = &msg[..min(buf.len(), msg.len())];
        buf[..msg.len()].copy_from_slice(msg);
        Ok(msg.len())
    }
}

impl Default for FakeEndpointOut {
    fn default() -> Self {
        Self {
            messages: Channel::new(),
        }
    }
}

pub struct FakeBus;

impl Bus for FakeBus {
    async fn enable(&mut self) {}

    async fn disable(&mut self) {}

    async fn poll(&mut self) -> embassy_usb::driver::Event {
        unimplemented!()
    }

    fn endpoint_set_enabled(&mut self, _ep_addr: EndpointAddress, _enabled: bool) {
        unimplemented!()
    }

    fn endpoint_set_stalled(&mut self, _ep_addr: EndpointAddress, _stalled: bool) {
        unimplemented!()
    }

    fn endpoint_is_stalled(&mut self, _ep_addr: EndpointAddress) -> bool {
        unimplemented!()
    }

    async fn remote_wakeup(&mut self) -> Result<(), embassy_usb::driver::Unsupported> {
        unimplemented!()
    }
}

pub struct FakeControlPipe;

impl ControlPipe for FakeControlPipe {
    fn max_packet_size(&self) -> usize {
        unimplemented!()
    }

    async fn setup(&mut self) -> [u8; 8] {
        unimplemented!()
    }

    async fn data_out(
        &mut self,
        _buf: &mut [u8],
        _first: bool,
        _last: bool,
    ) -> Result<usize, embassy_usb::driver::EndpointError> {
        unimplemented!()
    }

    async fn data_in(
        &mut self,
        _data: &[u8],
        _first: bool,
        _last: bool,
    ) -> Result<(), embassy_usb::driver::EndpointError> {
        unimplemented!()
    }

    async fn accept(&mut self) {
        unimplemented!()
    }

    async fn reject(&mut self) {
        unimplemented!()
    }

    async fn accept_set_address(&mut self, _addr: u8) {
        unimplemented!()
    }
}

pub struct FakeDriver;

impl Driver<'_> for FakeDriver {
    type EndpointOut = FakeEndpointOut;

    type EndpointIn = FakeEndpointIn;

    type ControlPipe = FakeControlPipe;

    type Bus = FakeBus;

    fn alloc_endpoint_out(
        &mut self,
        _ep_type: EndpointType,
        _max_packet_size: u16,
        _interval_ms: u8,
    ) -> Result<Self::EndpointOut, embassy_usb::driver::EndpointAllocError> {
        unimplemented!()
    }

    fn alloc_endpoint_in(
        &mut self,
        _ep_type: EndpointType,
        _max_packet_size: u16,
        _interval_ms: u8,
    ) -> Result<Self::EndpointIn, embassy_usb::driver::EndpointAllocError> {
        unimplemented!()
    }

    fn start(self, _control_max_packet_size: u16) -> (Self::Bus, Self::ControlPipe) {
        unimplemented!()
    }
}
