use crate::error::{Error, Result};
use crate::transport::{TransportSettings, UsbTransport};
use rusb::{Device, DeviceHandle};
use std::fmt;
use tracing::debug;

pub use rusb::UsbContext;

/// Vendor ID of the chipKIT boards (Microchip).
pub const DEFAULT_VENDOR_ID: u16 = 0x04d8;

/// Interface the benchmark firmware exposes its data endpoint on.
const INTERFACE: u8 = 0;

pub struct Context<T: UsbContext = rusb::Context> {
    pub usb_context: T,
}

impl Context {
    pub fn new() -> Result<Self> {
        let usb_context = rusb::Context::new()?;
        Ok(Context { usb_context })
    }
}

impl<T: UsbContext> Context<T> {
    /// Lists all connected devices from the given vendor.
    pub fn find_devices(&self, vendor_id: u16) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();

        for device in self.usb_context.devices()?.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(_) => continue,
            };
            if descriptor.vendor_id() == vendor_id {
                devices.push(DeviceInfo {
                    vendor_id,
                    product_id: descriptor.product_id(),
                    usb_bus_number: device.bus_number(),
                    usb_bus_address: device.address(),
                });
            }
        }

        debug!(
            "Found {} device(s) from vendor {:#06x}",
            devices.len(),
            vendor_id
        );
        Ok(devices)
    }

    /// Picks the first device from the given vendor. Fails with [`Error::DeviceNotFound`] if
    /// there is none.
    ///
    /// [`Error::DeviceNotFound`]: enum.Error.html#variant.DeviceNotFound
    pub fn pick_device(&self, vendor_id: u16) -> Result<DeviceInfo> {
        self.find_devices(vendor_id)?
            .into_iter()
            .next()
            .ok_or(Error::DeviceNotFound { vendor_id })
    }

    /// Finds and opens the first device from the given vendor.
    pub fn open_usb(
        &self,
        vendor_id: u16,
        settings: TransportSettings,
    ) -> Result<UsbTransport<DeviceHandle<T>>> {
        self.pick_device(vendor_id)?.open(&self.usb_context, settings)
    }
}

/// Contains necessary information to connect to a device via USB.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceInfo {
    pub vendor_id: u16,

    pub product_id: u16,

    /// USB bus ID the device is connected to.
    pub usb_bus_number: u8,

    /// USB device address of the device.
    pub usb_bus_address: u8,
}

impl DeviceInfo {
    /// Connects to the device, selects its first configuration and claims the data interface.
    pub fn open<T: UsbContext>(
        &self,
        context: &T,
        settings: TransportSettings,
    ) -> Result<UsbTransport<DeviceHandle<T>>> {
        for device in context.devices()?.iter() {
            if device.bus_number() == self.usb_bus_number
                && device.address() == self.usb_bus_address
            {
                // Guard against a reenumeration between discovery and opening
                if device.device_descriptor()?.vendor_id() != self.vendor_id {
                    return Err(Error::DeviceNotFound {
                        vendor_id: self.vendor_id,
                    });
                }
                let handle = claim(&device)?;
                debug!("Opened {}", self);
                return Ok(UsbTransport::new(handle, settings));
            }
        }
        Err(Error::DeviceNotFound {
            vendor_id: self.vendor_id,
        })
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} on bus {:03} address {:03}",
            self.vendor_id, self.product_id, self.usb_bus_number, self.usb_bus_address
        )
    }
}

fn claim<T: UsbContext>(device: &Device<T>) -> Result<DeviceHandle<T>> {
    let mut handle = device.open()?;
    // Not supported on every platform, a kernel driver may not be bound anyway
    if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
        debug!("Kernel driver auto-detach unavailable: {}", err);
    }

    let configuration = device.config_descriptor(0)?.number();
    handle.set_active_configuration(configuration)?;
    handle.claim_interface(INTERFACE)?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_display() {
        let info = DeviceInfo {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: 0x0204,
            usb_bus_number: 1,
            usb_bus_address: 12,
        };
        assert_eq!(info.to_string(), "04d8:0204 on bus 001 address 012");
    }

    #[test]
    fn device_not_found_names_vendor() {
        let error = Error::DeviceNotFound {
            vendor_id: DEFAULT_VENDOR_ID,
        };
        assert_eq!(
            error.to_string(),
            "couldn't find a USB device from vendor 0x04d8"
        );
    }
}
