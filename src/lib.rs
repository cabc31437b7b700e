//! A bulk-endpoint exerciser device class for the [`usb-device`] ecosystem.
//!
//! `usbd-bench` reimplements a small family of test-bench firmwares used to
//! exercise host-side USB stacks. The device enumerates as a vendor-class
//! device with a fixed identity and a complement of bulk endpoints, each
//! with a deliberately simple behavior:
//!
//! - a polling IN endpoint that always has a packet ready,
//! - a drain OUT endpoint that accepts and discards everything,
//! - an IN/OUT pair that is never serviced, for host timeout testing,
//! - optionally, an OUT/IN pair that echoes packets back to the host.
//!
//! A single vendor control request exposes a 16-byte scratch register for
//! control-transfer round-trip tests. The [`Profile`] selects between the
//! three firmware variants.
//!
//! # Usage
//!
//! Allocate the class before building the device, then drive both from
//! your firmware's main loop:
//!
//! ```
//! use usb_device::class_prelude::*;
//! use usb_device::prelude::*;
//! use usbd_bench::{BenchDevice, Profile};
//!
//! fn run<B: UsbBus>(alloc: &UsbBusAllocator<B>) -> ! {
//!     let mut bench = BenchDevice::new(alloc, Profile::classic());
//!     let mut device = bench
//!         .device_builder(alloc)
//!         .unwrap()
//!         .build();
//!     loop {
//!         device.poll(&mut [&mut bench]);
//!         bench.poll();
//!     }
//! }
//! ```
//!
//! [`BenchDevice::poll`] runs unconditionally, not just when
//! `UsbDevice::poll` reports activity: it retries writes that a busy
//! endpoint refused on an earlier iteration.
//!
//! The [`Profile::counter`] variant additionally needs a periodic timer
//! calling [`BenchDevice::tick`], and [`Profile::classic`] asks the bus to
//! force-NAK its timeout endpoint through [`ForceNak`] once the device is
//! configured.
//!
//! [`usb-device`]: https://docs.rs/usb-device

#![no_std]

#[macro_use]
mod log;

mod device;
mod profile;
mod slot;

pub use device::{
    BenchDevice, DRAIN_OUT_EP, ECHO_IN_EP, ECHO_OUT_EP, MANUFACTURER, MAX_PACKET_LEN, PID,
    POLL_IN_EP, PRODUCT, SCRATCH_LEN, SERIAL_NUMBER, TIMEOUT_IN_EP, TIMEOUT_OUT_EP,
    VENDOR_REQUEST_SCRATCH, VID,
};
pub use profile::{PollMode, Profile, TimeoutMode};

use usb_device::bus::UsbBus;
use usb_device::endpoint::EndpointAddress;

/// A bus that can hold an endpoint in a NAK state on demand.
///
/// `usb-device` has no portable primitive for refusing traffic on an
/// otherwise-enabled endpoint, but most peripherals can do it natively.
/// Implement this on your bus driver to support
/// [`TimeoutMode::ForceNak`]; the other timeout mode works on any bus.
pub trait ForceNak: UsbBus {
    /// Set or release a forced NAK on `addr`.
    ///
    /// While forced, the endpoint must NAK every token without consuming
    /// or producing data, regardless of buffer state.
    fn force_nak(&self, addr: EndpointAddress, nak: bool);
}
