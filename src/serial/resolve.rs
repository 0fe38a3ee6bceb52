//! Picking the serial port the measurement board is attached to

use super::port::{list_ports, PortInfo};
use crate::error::{PortCandidate, PortError};
use log::info;

/// Substring that identifies the board in manufacturer/description fields
pub const BOARD_MATCH: &str = "Arduino";

/// Return the explicit port untouched, otherwise auto-detect one
///
/// An explicit port is not validated here; opening it will fail loudly
/// if it is wrong.
pub fn resolve(explicit: Option<&str>) -> Result<String, PortError> {
    if let Some(port) = explicit {
        return Ok(port.to_string());
    }

    let ports = list_ports()?;
    let port = select_port(&ports)?;
    info!("Auto-detected Arduino on {}", port);
    Ok(port)
}

fn is_board(port: &PortInfo) -> bool {
    port.manufacturer
        .as_deref()
        .is_some_and(|m| m.contains(BOARD_MATCH))
        || port.description().contains(BOARD_MATCH)
}

/// First port whose manufacturer or description mentions the board
pub fn select_port(ports: &[PortInfo]) -> Result<String, PortError> {
    if ports.is_empty() {
        return Err(PortError::NoPortsFound);
    }

    match ports.iter().find(|p| is_board(p)) {
        Some(port) => Ok(port.path.clone()),
        None => Err(PortError::NoMatchFound {
            candidates: ports
                .iter()
                .map(|p| PortCandidate {
                    name: p.path.clone(),
                    description: p.description(),
                })
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port::PortType;

    fn usb(path: &str, manufacturer: Option<&str>, product: Option<&str>) -> PortInfo {
        PortInfo {
            path: path.to_string(),
            port_type: PortType::UsbSerial,
            manufacturer: manufacturer.map(str::to_string),
            product: product.map(str::to_string),
            serial_number: None,
            vid: Some(0x2341),
            pid: Some(0x805a),
        }
    }

    fn builtin(path: &str) -> PortInfo {
        PortInfo {
            path: path.to_string(),
            port_type: PortType::Unknown,
            manufacturer: None,
            product: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    #[test]
    fn test_explicit_port_returned_unchanged() {
        assert_eq!(resolve(Some("not-a-real-port")).unwrap(), "not-a-real-port");
    }

    #[test]
    fn test_empty_enumeration() {
        assert!(matches!(select_port(&[]), Err(PortError::NoPortsFound)));
    }

    #[test]
    fn test_match_on_manufacturer() {
        let ports = vec![
            builtin("/dev/ttyS0"),
            usb("/dev/ttyACM0", Some("Arduino LLC"), Some("Nano 33 BLE")),
        ];
        assert_eq!(select_port(&ports).unwrap(), "/dev/ttyACM0");
    }

    #[test]
    fn test_match_on_description() {
        let ports = vec![usb("COM7", None, Some("Arduino Nano 33 BLE"))];
        assert_eq!(select_port(&ports).unwrap(), "COM7");
    }

    #[test]
    fn test_first_match_wins() {
        let ports = vec![
            usb("/dev/ttyACM0", Some("Arduino"), None),
            usb("/dev/ttyACM1", Some("Arduino"), None),
        ];
        assert_eq!(select_port(&ports).unwrap(), "/dev/ttyACM0");
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let ports = vec![usb("/dev/ttyACM0", Some("arduino"), Some("ARDUINO board"))];
        assert!(matches!(
            select_port(&ports),
            Err(PortError::NoMatchFound { .. })
        ));
    }

    #[test]
    fn test_no_match_carries_all_candidates() {
        let ports = vec![
            builtin("/dev/ttyS0"),
            usb("/dev/ttyUSB0", Some("Silicon Labs"), Some("CP2102 USB to UART")),
        ];

        match select_port(&ports) {
            Err(PortError::NoMatchFound { candidates }) => {
                assert_eq!(
                    candidates,
                    vec![
                        PortCandidate {
                            name: "/dev/ttyS0".to_string(),
                            description: "n/a".to_string(),
                        },
                        PortCandidate {
                            name: "/dev/ttyUSB0".to_string(),
                            description: "CP2102 USB to UART".to_string(),
                        },
                    ]
                );
            }
            other => panic!("expected NoMatchFound, got {:?}", other),
        }
    }
}
