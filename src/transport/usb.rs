use super::{Transport, TransportSettings, TrialCounter};
use crate::error::{Result, ValidationError};
use rusb::{DeviceHandle, UsbContext};
use serde_json::{Map, Value};
use std::time::Duration;

/// Bulk IN endpoint the firmware streams its records on.
pub const DATA_ENDPOINT: u8 = 0x81;

/// Fields every record sent over USB has to carry.
const REQUIRED_FIELDS: [&str; 2] = ["name", "value"];

/// Anything a bulk transfer can be read from. Implemented for [`rusb::DeviceHandle`].
///
/// [`rusb::DeviceHandle`]: https://docs.rs/rusb/latest/rusb/struct.DeviceHandle.html
pub trait BulkRead {
    /// Reads from `endpoint` into `buffer`, returning the number of bytes transferred.
    fn read_bulk_into(
        &self,
        endpoint: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;
}

impl<T: UsbContext> BulkRead for DeviceHandle<T> {
    fn read_bulk_into(
        &self,
        endpoint: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        self.read_bulk(endpoint, buffer, timeout)
    }
}

/// Benchmarks a USB bulk endpoint. The device packs its records into whatever transfer size is
/// requested, so the message size is purely a property of the read.
pub struct UsbTransport<H> {
    handle: H,
    endpoint: u8,
    settings: TransportSettings,
    counter: TrialCounter,
}

impl<H: BulkRead> UsbTransport<H> {
    pub fn new(handle: H, settings: TransportSettings) -> Self {
        Self::with_endpoint(handle, DATA_ENDPOINT, settings)
    }

    pub fn with_endpoint(handle: H, endpoint: u8, settings: TransportSettings) -> Self {
        Self {
            handle,
            endpoint,
            settings,
            counter: TrialCounter::default(),
        }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn endpoint(&self) -> u8 {
        self.endpoint
    }
}

impl<H: BulkRead> Transport for UsbTransport<H> {
    fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    fn counter(&self) -> &TrialCounter {
        &self.counter
    }

    fn counter_mut(&mut self) -> &mut TrialCounter {
        &mut self.counter
    }

    fn signal_message_size(&mut self, _message_size: usize) -> Result<()> {
        Ok(())
    }

    fn read_chunk(&mut self, message_size: usize) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; message_size];
        let read = self
            .handle
            .read_bulk_into(self.endpoint, &mut chunk, self.settings.timeout)?;
        chunk.truncate(read);
        Ok(chunk)
    }

    fn validate(&self, chunk: &[u8]) -> std::result::Result<(), ValidationError> {
        let record: Map<String, Value> = serde_json::from_slice(chunk)
            .map_err(|err| ValidationError::Malformed(err.to_string()))?;

        match REQUIRED_FIELDS
            .iter()
            .find(|field| !record.contains_key(**field))
        {
            Some(field) => Err(ValidationError::MissingField(*field)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;

    /// Replays a list of bulk transfer results.
    struct ScriptedEndpoint {
        transfers: RefCell<Vec<rusb::Result<Vec<u8>>>>,
        requests: RefCell<Vec<(u8, Duration)>>,
    }

    impl ScriptedEndpoint {
        fn new(mut transfers: Vec<rusb::Result<Vec<u8>>>) -> Self {
            transfers.reverse();
            Self {
                transfers: RefCell::new(transfers),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl BulkRead for ScriptedEndpoint {
        fn read_bulk_into(
            &self,
            endpoint: u8,
            buffer: &mut [u8],
            timeout: Duration,
        ) -> rusb::Result<usize> {
            self.requests.borrow_mut().push((endpoint, timeout));
            let data = self
                .transfers
                .borrow_mut()
                .pop()
                .unwrap_or(Err(rusb::Error::Timeout))?;
            let len = data.len().min(buffer.len());
            buffer[..len].copy_from_slice(&data[..len]);
            Ok(len)
        }
    }

    fn transport(transfers: Vec<rusb::Result<Vec<u8>>>) -> UsbTransport<ScriptedEndpoint> {
        UsbTransport::new(ScriptedEndpoint::new(transfers), TransportSettings::USB)
    }

    #[test]
    fn configure_only_resets_counter() {
        let mut transport = transport(vec![Ok(b"{}".to_vec())]);
        transport.counter_mut().reset(64);
        transport.counter_mut().record(500);
        transport.configure(128).unwrap();
        assert_eq!(transport.counter().message_size(), 128);
        assert_eq!(transport.counter().bytes_received(), 0);
        // Nothing was consumed from the device
        assert_eq!(transport.handle().transfers.borrow().len(), 1);
    }

    #[test]
    fn read_chunk_is_bounded_by_message_size() {
        let mut transport = transport(vec![Ok(vec![b'x'; 100])]);
        assert_eq!(transport.read_chunk(64).unwrap().len(), 64);
        assert_eq!(
            *transport.handle().requests.borrow(),
            vec![(DATA_ENDPOINT, TransportSettings::USB.timeout)]
        );
    }

    #[test]
    fn reads_use_configured_endpoint_and_timeout() {
        let settings = TransportSettings::USB.with_timeout(Duration::from_millis(250));
        let mut transport = UsbTransport::with_endpoint(
            ScriptedEndpoint::new(vec![Ok(b"{}".to_vec())]),
            0x82,
            settings,
        );
        assert_eq!(transport.endpoint(), 0x82);

        transport.read_chunk(64).unwrap();
        assert_eq!(
            *transport.handle().requests.borrow(),
            vec![(0x82, Duration::from_millis(250))]
        );
    }

    #[test]
    fn usb_errors_are_classified() {
        let mut transport = transport(vec![Err(rusb::Error::NoDevice), Err(rusb::Error::Pipe)]);
        assert!(matches!(transport.read_chunk(64), Err(Error::Disconnected)));
        assert!(matches!(
            transport.read_chunk(64),
            Err(Error::Usb(rusb::Error::Pipe))
        ));
        assert!(matches!(transport.read_chunk(64), Err(Error::Timeout)));
    }

    #[test]
    fn complete_record_validates() {
        let transport = transport(Vec::new());
        assert_eq!(transport.validate(br#"{"name": "x", "value": 1}"#), Ok(()));
    }

    #[test]
    fn record_without_value_is_flagged() {
        let transport = transport(Vec::new());
        assert_eq!(
            transport.validate(br#"{"name": "x"}"#),
            Err(ValidationError::MissingField("value"))
        );
    }

    #[test]
    fn undecodable_record_is_flagged() {
        let transport = transport(Vec::new());
        assert!(matches!(
            transport.validate(b"{\"name\": \"x\", \"val"),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            transport.validate(b"[1, 2]"),
            Err(ValidationError::Malformed(_))
        ));
    }
}
