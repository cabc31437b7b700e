//! Per-variant configuration.
//!
//! The exerciser firmware shipped in three variants sharing one shape. A
//! [`Profile`] captures everything that differs between them: the endpoint
//! complement, the advertised USB revision, the power attributes, how the
//! polling endpoint is refilled, and how the timeout endpoint is starved.
//! Firmware picks a profile at build time.

use usb_device::device::UsbRev;

/// How the polling IN endpoint is refilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Refill as soon as the previous packet completes. The first packet
    /// is preloaded as soon as the bus accepts writes.
    Immediate,
    /// Refill only from [`BenchDevice::tick`](crate::BenchDevice::tick),
    /// with a 16-bit sequence counter stamped into the packet's leading
    /// bytes so the host can detect dropped or reordered packets.
    Tick,
}

/// How the timeout endpoint pair is starved.
///
/// Both mechanisms shipped across the firmware variants with no documented
/// reason for the divergence, so both are preserved as selectable modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutMode {
    /// Never service the pair. The OUT endpoint accepts the first packet
    /// into the bus buffer and NAKs from then on; the IN endpoint is never
    /// written. Portable to any `UsbBus`.
    Starve,
    /// Additionally hold the OUT endpoint in a permanent NAK state so even
    /// the first host write goes unacknowledged. Requires a bus that
    /// implements [`ForceNak`](crate::ForceNak); see
    /// [`BenchDevice::hold_timeout_endpoint`](crate::BenchDevice::hold_timeout_endpoint).
    ForceNak,
}

/// One firmware variant.
///
/// All profiles advertise a 64-byte bMaxPacketSize0. The newest firmware
/// variant sized its control scratch constant at 16 bytes while still
/// advertising 64; the advertised value is authoritative for host
/// compatibility, and 16 only sizes the vendor scratch register
/// ([`SCRATCH_LEN`](crate::SCRATCH_LEN)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    /// USB specification revision advertised in the device descriptor.
    pub usb_rev: UsbRev,
    /// Self- vs bus-powered configuration attribute.
    pub self_powered: bool,
    /// Maximum current draw in mA (stored halved in bMaxPower).
    pub max_power_ma: u16,
    /// Poll endpoint refill strategy.
    pub poll_mode: PollMode,
    /// Timeout endpoint starvation mechanism.
    pub timeout_mode: TimeoutMode,
    /// Whether the echo endpoint pair (eps 5/6) exists.
    pub echo_endpoints: bool,
}

impl Profile {
    /// The first variant: four endpoints, USB 1.1, bus powered, poll
    /// endpoint refilled on completion, timeout OUT endpoint force-NAK'd.
    pub const fn classic() -> Self {
        Profile {
            usb_rev: UsbRev::Usb110,
            self_powered: false,
            max_power_ma: 500,
            poll_mode: PollMode::Immediate,
            timeout_mode: TimeoutMode::ForceNak,
            echo_endpoints: false,
        }
    }

    /// The counter variant: four endpoints, USB 2.0, tick-driven polling
    /// with sequence stamping.
    pub const fn counter() -> Self {
        Profile {
            usb_rev: UsbRev::Usb200,
            self_powered: false,
            max_power_ma: 500,
            poll_mode: PollMode::Tick,
            timeout_mode: TimeoutMode::Starve,
            echo_endpoints: false,
        }
    }

    /// The newest variant: six endpoints including the echo pair, USB 2.0,
    /// self powered.
    pub const fn echo() -> Self {
        Profile {
            usb_rev: UsbRev::Usb200,
            self_powered: true,
            max_power_ma: 200,
            poll_mode: PollMode::Immediate,
            timeout_mode: TimeoutMode::Starve,
            echo_endpoints: true,
        }
    }

    /// Number of bulk endpoints this profile declares.
    pub const fn endpoint_count(&self) -> u8 {
        if self.echo_endpoints {
            6
        } else {
            4
        }
    }
}
