//! Two-channel join/leave indicator.
//!
//! The hardware side is a character device exposing GPIO writes through
//! `ioctl`. The request struct layout must match the driver's `gpio_pin`.

use fs_err as fs;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PresenceError, Result};

pub const DEFAULT_DEVICE_PATH: &str = "/dev/ledControllerDev";
pub const DEFAULT_JOIN_PIN: u32 = 23;
pub const DEFAULT_LEAVE_PIN: u32 = 24;

const IOCTL_GPIO_WRITE: libc::c_ulong = 0x66;
const LED_ON: libc::c_int = 1;
const LED_OFF: libc::c_int = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Join,
    Leave,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Join => "join",
            Channel::Leave => "leave",
        }
    }
}

pub trait Indicator {
    fn set(&mut self, channel: Channel, on: bool) -> Result<()>;
}

impl<I: Indicator + ?Sized> Indicator for Box<I> {
    fn set(&mut self, channel: Channel, on: bool) -> Result<()> {
        (**self).set(channel, on)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    pub join: u32,
    pub leave: u32,
}

impl PinMap {
    pub fn pin(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Join => self.join,
            Channel::Leave => self.leave,
        }
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            join: DEFAULT_JOIN_PIN,
            leave: DEFAULT_LEAVE_PIN,
        }
    }
}

#[repr(C)]
struct GpioPin {
    pin: libc::c_uint,
    value: libc::c_int,
}

/// Drives the LED controller device. The file handle is released on drop.
#[derive(Debug)]
pub struct DeviceIndicator {
    device: fs::File,
    pins: PinMap,
}

impl DeviceIndicator {
    pub fn open(path: &Path, pins: PinMap) -> Result<Self> {
        let device = fs::File::open(path)
            .map_err(|err| PresenceError::io("Failed to open indicator device", err))?;
        info!(path = %path.display(), join_pin = pins.join, leave_pin = pins.leave, "Indicator device opened");
        Ok(Self { device, pins })
    }
}

impl Indicator for DeviceIndicator {
    fn set(&mut self, channel: Channel, on: bool) -> Result<()> {
        let pin = self.pins.pin(channel);
        let mut request = GpioPin {
            pin: pin as libc::c_uint,
            value: if on { LED_ON } else { LED_OFF },
        };
        let fd = self.device.file().as_raw_fd();
        // SAFETY: `fd` is an open descriptor owned by `self.device` and
        // `request` lives for the duration of the call.
        let rc = unsafe { libc::ioctl(fd, IOCTL_GPIO_WRITE as _, &mut request as *mut GpioPin) };
        if rc < 0 {
            return Err(PresenceError::Indicator {
                pin,
                details: std::io::Error::last_os_error().to_string(),
            });
        }
        debug!(channel = channel.as_str(), pin, on, "Indicator set");
        Ok(())
    }
}

/// Stand-in used when no indicator hardware is configured.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set(&mut self, channel: Channel, on: bool) -> Result<()> {
        debug!(channel = channel.as_str(), on, "Indicator disabled; ignoring");
        Ok(())
    }
}
