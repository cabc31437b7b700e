//! The exerciser device class.
//!
//! [`BenchDevice`] owns every protocol behavior of the device: descriptor
//! composition, the vendor control-request router, and the bulk endpoint
//! engine. The enumeration state machine and the packet FIFOs live in the
//! `usb-device` core and the bus driver; this type only reacts to their
//! callbacks and to the firmware's service loop.

use usb_device::class_prelude::*;
use usb_device::device::{StringDescriptors, UsbDeviceBuilder, UsbVidPid};
use usb_device::prelude::BuilderError;
use usb_device::{Result, UsbDirection};

use crate::profile::{PollMode, Profile, TimeoutMode};
use crate::slot::EchoSlot;
use crate::ForceNak;

/// Vendor ID of the exerciser device.
pub const VID: u16 = 0x59e3;
/// Product ID of the exerciser device.
pub const PID: u16 = 0x0a23;

/// Manufacturer string, descriptor index 1.
pub const MANUFACTURER: &str = "Nonolith Labs";
/// Product string, descriptor index 2. Host-side fixtures match this
/// literal exactly.
pub const PRODUCT: &str = "STM32F103 Example Device";
/// Serial string, descriptor index 3.
pub const SERIAL_NUMBER: &str = "DEMO";

/// The one vendor control request the device understands. IN reads the
/// scratch register, OUT writes it; every other vendor request stalls.
pub const VENDOR_REQUEST_SCRATCH: u8 = 0x81;

/// Size of the control-request scratch register.
pub const SCRATCH_LEN: usize = 16;

/// Max packet size of every bulk endpoint, and of the control endpoint.
pub const MAX_PACKET_LEN: usize = 64;

/// Endpoint index of the polling IN endpoint.
pub const POLL_IN_EP: u8 = 1;
/// Endpoint index of the throughput drain OUT endpoint.
pub const DRAIN_OUT_EP: u8 = 2;
/// Endpoint index of the starved IN endpoint.
pub const TIMEOUT_IN_EP: u8 = 3;
/// Endpoint index of the starved OUT endpoint.
pub const TIMEOUT_OUT_EP: u8 = 4;
/// Endpoint index of the echo OUT endpoint (echo profile only).
pub const ECHO_OUT_EP: u8 = 5;
/// Endpoint index of the echo IN endpoint (echo profile only).
pub const ECHO_IN_EP: u8 = 6;

/// The bulk-endpoint exerciser device.
///
/// Construct it from a bus allocator and a [`Profile`], build the
/// `UsbDevice` from [`device_builder`](Self::device_builder), then call
/// [`poll`](Self::poll) after every `UsbDevice::poll` and, for the
/// tick-driven profile, [`tick`](Self::tick) from the periodic timer.
pub struct BenchDevice<'a, B: UsbBus> {
    profile: Profile,
    iface: InterfaceNumber,
    poll_in: EndpointIn<'a, B>,
    drain_out: EndpointOut<'a, B>,
    timeout_in: EndpointIn<'a, B>,
    timeout_out: EndpointOut<'a, B>,
    echo_out: Option<EndpointOut<'a, B>>,
    echo_in: Option<EndpointIn<'a, B>>,
    /// Vendor scratch register. Read back verbatim; writes are clamped.
    scratch: [u8; SCRATCH_LEN],
    /// Outgoing poll packet template. Touched only by the refill context
    /// (completion callback or tick handler, per profile).
    poll_buf: [u8; MAX_PACKET_LEN],
    /// Staging area for drained throughput packets; contents discarded.
    drain_buf: [u8; MAX_PACKET_LEN],
    /// Staging area for the echo path, valid while the slot is staged.
    echo_buf: [u8; MAX_PACKET_LEN],
    echo_slot: EchoSlot,
    counter: u16,
    nak_held: bool,
}

fn bulk_in<'a, B: UsbBus>(alloc: &'a UsbBusAllocator<B>, index: u8) -> EndpointIn<'a, B> {
    alloc
        .alloc(
            Some(EndpointAddress::from_parts(index as usize, UsbDirection::In)),
            EndpointType::Bulk,
            MAX_PACKET_LEN as u16,
            0,
        )
        .expect("bulk IN endpoint already allocated")
}

fn bulk_out<'a, B: UsbBus>(alloc: &'a UsbBusAllocator<B>, index: u8) -> EndpointOut<'a, B> {
    alloc
        .alloc(
            Some(EndpointAddress::from_parts(index as usize, UsbDirection::Out)),
            EndpointType::Bulk,
            MAX_PACKET_LEN as u16,
            0,
        )
        .expect("bulk OUT endpoint already allocated")
}

impl<'a, B: UsbBus> BenchDevice<'a, B> {
    /// Allocate the interface and the profile's endpoint complement.
    ///
    /// # Panics
    ///
    /// Panics if another class already claimed any of endpoints 1 through
    /// 4 (6 for the echo profile).
    pub fn new(alloc: &'a UsbBusAllocator<B>, profile: Profile) -> Self {
        BenchDevice {
            profile,
            iface: alloc.interface(),
            poll_in: bulk_in(alloc, POLL_IN_EP),
            drain_out: bulk_out(alloc, DRAIN_OUT_EP),
            timeout_in: bulk_in(alloc, TIMEOUT_IN_EP),
            timeout_out: bulk_out(alloc, TIMEOUT_OUT_EP),
            echo_out: profile.echo_endpoints.then(|| bulk_out(alloc, ECHO_OUT_EP)),
            echo_in: profile.echo_endpoints.then(|| bulk_in(alloc, ECHO_IN_EP)),
            scratch: [0; SCRATCH_LEN],
            poll_buf: [0; MAX_PACKET_LEN],
            drain_buf: [0; MAX_PACKET_LEN],
            echo_buf: [0; MAX_PACKET_LEN],
            echo_slot: EchoSlot::new(),
            counter: 0,
            nak_held: false,
        }
    }

    /// The profile this device was built with.
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// A `UsbDeviceBuilder` carrying the device's identity: VID/PID,
    /// strings, bcdUSB and power attributes per the profile, and the
    /// 64-byte control max packet size.
    pub fn device_builder(
        &self,
        alloc: &'a UsbBusAllocator<B>,
    ) -> core::result::Result<UsbDeviceBuilder<'a, B>, BuilderError> {
        Ok(UsbDeviceBuilder::new(alloc, UsbVidPid(VID, PID))
            .strings(&[StringDescriptors::default()
                .manufacturer(MANUFACTURER)
                .product(PRODUCT)
                .serial_number(SERIAL_NUMBER)])?
            .usb_rev(self.profile.usb_rev)
            .device_release(0x0200)
            .self_powered(self.profile.self_powered)
            .max_power(self.profile.max_power_ma as usize)?
            .max_packet_size_0(MAX_PACKET_LEN as u8)?)
    }

    /// Service step, called once per loop iteration after
    /// `UsbDevice::poll`, whether or not that reported activity.
    ///
    /// Keeps the polling endpoint topped up (the first accepted write is
    /// the preload; later ones are refused while a packet is in flight)
    /// and flushes a staged echo packet. Busy endpoints are simply
    /// retried on the next iteration.
    pub fn poll(&mut self) {
        if self.profile.poll_mode == PollMode::Immediate {
            self.write_poll_packet();
        }
        self.flush_echo();
    }

    /// Periodic timer service for the tick-driven profile.
    ///
    /// Stamps the sequence counter into the next poll packet and writes
    /// it, then drains one waiting packet from the throughput OUT
    /// endpoint. May run from a timer interrupt: it touches only the poll
    /// and drain buffers, which no other context touches in this profile.
    /// No-op in the other profiles.
    pub fn tick(&mut self) {
        if self.profile.poll_mode != PollMode::Tick {
            return;
        }
        self.write_poll_packet();
        self.drain_out.read(&mut self.drain_buf).ok();
    }

    /// Hold the timeout OUT endpoint in a permanent NAK state.
    ///
    /// Call with the device's bus once enumeration reaches the configured
    /// state. Does nothing unless the profile selects
    /// [`TimeoutMode::ForceNak`]; held state is dropped on bus reset so
    /// the next configuration can re-apply it.
    pub fn hold_timeout_endpoint(&mut self, bus: &B)
    where
        B: ForceNak,
    {
        if self.profile.timeout_mode == TimeoutMode::ForceNak && !self.nak_held {
            bus.force_nak(self.timeout_out.address(), true);
            self.nak_held = true;
            debug!("TIMEOUT EP{} held in NAK", TIMEOUT_OUT_EP);
        }
    }

    /// Write the next poll packet, stamping the counter first in the
    /// tick-driven profile. A refused write leaves the counter unchanged,
    /// so the next attempt re-sends the same stamp and the host never
    /// observes a gap.
    fn write_poll_packet(&mut self) {
        if self.profile.poll_mode == PollMode::Tick {
            self.poll_buf[..2].copy_from_slice(&self.counter.to_le_bytes());
        }
        let wrote = self.poll_in.write(&self.poll_buf).is_ok();
        if wrote && self.profile.poll_mode == PollMode::Tick {
            // Wraps silently; the host accounts for 65535 -> 0.
            self.counter = self.counter.wrapping_add(1);
        }
    }

    /// Attempt the IN write for a staged echo packet. The slot is released
    /// only on success, so a busy endpoint never loses the packet.
    fn flush_echo(&mut self) {
        let Some(len) = self.echo_slot.staged() else {
            return;
        };
        let Some(ep) = &self.echo_in else {
            return;
        };
        if ep.write(&self.echo_buf[..len]).is_ok() {
            debug!("ECHO {} bytes", len);
            self.echo_slot.clear();
        }
    }
}

impl<B: UsbBus> UsbClass<B> for BenchDevice<'_, B> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> Result<()> {
        writer.interface(self.iface, 0xff, 0x00, 0x00)?;
        writer.endpoint(&self.poll_in)?;
        writer.endpoint(&self.drain_out)?;
        writer.endpoint(&self.timeout_in)?;
        writer.endpoint(&self.timeout_out)?;
        if let Some(ep) = &self.echo_out {
            writer.endpoint(ep)?;
        }
        if let Some(ep) = &self.echo_in {
            writer.endpoint(ep)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.echo_slot.clear();
        self.counter = 0;
        self.nak_held = false;
    }

    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();
        if req.request_type != control::RequestType::Vendor {
            return;
        }
        match req.request {
            VENDOR_REQUEST_SCRATCH => {
                debug!("SCRATCH READ");
                xfer.accept_with(&self.scratch).ok();
            }
            request => {
                warn!("VENDOR IN {} rejected", request);
                xfer.reject().ok();
            }
        }
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = *xfer.request();
        if req.request_type != control::RequestType::Vendor {
            return;
        }
        match req.request {
            VENDOR_REQUEST_SCRATCH => {
                // Clamp to the register size; trailing bytes are dropped.
                let data = xfer.data();
                let len = data.len().min(SCRATCH_LEN);
                self.scratch[..len].copy_from_slice(&data[..len]);
                debug!("SCRATCH WRITE {}", len);
                xfer.accept().ok();
            }
            request => {
                warn!("VENDOR OUT {} rejected", request);
                xfer.reject().ok();
            }
        }
    }

    fn endpoint_out(&mut self, addr: EndpointAddress) {
        if addr == self.drain_out.address() {
            if self.profile.poll_mode == PollMode::Immediate {
                // Drain and discard; the pipe only measures host write
                // throughput. The tick handler services this endpoint in
                // the tick-driven profile.
                self.drain_out.read(&mut self.drain_buf).ok();
            }
        } else if let Some(ep) = &self.echo_out {
            if addr == ep.address() && self.echo_slot.staged().is_none() {
                // While a previous packet awaits its IN write, leave this
                // one in the bus buffer; the completion stays signaled and
                // we consume it after the flush.
                if let Ok(len) = ep.read(&mut self.echo_buf) {
                    debug!("ECHO stage {} bytes", len);
                    self.echo_slot.stage(len);
                }
            }
        }
        // Packets for the timeout endpoint stay unserviced.
    }

    fn endpoint_in_complete(&mut self, addr: EndpointAddress) {
        if addr == self.poll_in.address() && self.profile.poll_mode == PollMode::Immediate {
            self.write_poll_packet();
        }
    }
}
