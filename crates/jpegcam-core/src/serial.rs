//! Serial port discovery and setup.

use serialport::{SerialPort, SerialPortType};
use std::time::Duration;

use crate::error::ProtocolError;

/// Poll timeout applied to the port so reads never block for long;
/// response deadlines are enforced above this layer.
const PORT_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor/product IDs when the port is a USB adapter
    pub usb_id: Option<(u16, u16)>,

    /// Product string reported by the adapter, if any
    pub product: Option<String>,
}

/// Sort key placing ttyACM* ports first, then ttyUSB*, each ordered
/// numerically by suffix, then everything else by name.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List available serial ports in deterministic order
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| {
            let (usb_id, product) = match info.port_type {
                SerialPortType::UsbPort(usb) => (Some((usb.vid, usb.pid)), usb.product),
                _ => (None, None),
            };
            PortInfo {
                name: info.port_name,
                usb_id,
                product,
            }
        })
        .collect();
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports
}

/// Open a serial port configured for the camera (8N1, no flow control)
pub fn open_port(name: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, ProtocolError> {
    serialport::new(name, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(PORT_POLL_TIMEOUT)
        .open()
        .map_err(|e| ProtocolError::Serial(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_sorting() {
        let names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/ttyACM0",
            "/dev/someport",
            "/dev/ttyACM10",
        ];
        let mut sorted: Vec<&str> = names.clone();
        sorted.sort_by_key(|n| port_sort_key(n));

        assert_eq!(
            sorted,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn test_list_ports() {
        // Just ensure enumeration doesn't panic on this machine
        let _ = list_ports();
    }
}
