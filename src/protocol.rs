// MIT License - Copyright (c) 2026 Peter Wright

//! Wire codec for the field-controller protocol.
//!
//! Two fixed-width, big-endian frame shapes travel on two different sockets:
//!
//! | Frame | Direction | Layout | Size |
//! |---|---|---|---|
//! | state | controller → hub | `u8 type, u64 bitmap, f32 temp, f32 humidity` | 17 |
//! | command | hub → controller | `u8 type, u64 bitmap` | 9 |
//!
//! Bit `i` of a bitmap is the state of the device with slot id `i`;
//! bit 0 is the least-significant bit.

use crate::devices::{Device, DeviceRegistry, DeviceType};
use crate::error::{HubError, Result};

/// Size of one state frame on the wire.
pub const STATE_FRAME_LEN: usize = 17;

/// Size of one command frame on the wire.
pub const COMMAND_FRAME_LEN: usize = 9;

/// One decoded device-state report from the field controller.
///
/// Ephemeral: lives only in transit through the state queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateReport {
    pub device_type: DeviceType,
    /// Bit `i` set means device `(device_type, slot i)` is active/detecting
    pub bitmap: u64,
    pub temperature: f32,
    pub humidity: f32,
}

impl StateReport {
    /// Decode one 17-byte state frame.
    pub fn decode(buf: &[u8; STATE_FRAME_LEN]) -> Result<Self> {
        let device_type = DeviceType::from_code(buf[0])
            .ok_or(HubError::InvalidDeviceType { code: buf[0] })?;

        let mut bitmap = [0u8; 8];
        bitmap.copy_from_slice(&buf[1..9]);
        let mut temperature = [0u8; 4];
        temperature.copy_from_slice(&buf[9..13]);
        let mut humidity = [0u8; 4];
        humidity.copy_from_slice(&buf[13..17]);

        Ok(Self {
            device_type,
            bitmap: u64::from_be_bytes(bitmap),
            temperature: f32::from_be_bytes(temperature),
            humidity: f32::from_be_bytes(humidity),
        })
    }

    /// Encode back into a 17-byte frame. The codec is symmetric; the
    /// simulated field controller uses this side.
    pub fn encode(&self) -> [u8; STATE_FRAME_LEN] {
        let mut buf = [0u8; STATE_FRAME_LEN];
        buf[0] = self.device_type.code();
        buf[1..9].copy_from_slice(&self.bitmap.to_be_bytes());
        buf[9..13].copy_from_slice(&self.temperature.to_be_bytes());
        buf[13..17].copy_from_slice(&self.humidity.to_be_bytes());
        buf
    }

    /// Whether the device with the given slot id is reported active.
    pub fn slot_active(&self, slot: u8) -> bool {
        (slot as usize) < 64 && (self.bitmap >> slot) & 1 == 1
    }

    /// Slot ids reported active, ascending.
    pub fn active_slots(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..64).filter(|slot| self.slot_active(*slot))
    }
}

/// One outbound command frame: the desired on/off bitmap for one device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    pub device_type: DeviceType,
    pub bitmap: u64,
}

impl CommandFrame {
    /// Encode into the 9-byte wire form.
    pub fn encode(&self) -> [u8; COMMAND_FRAME_LEN] {
        let mut buf = [0u8; COMMAND_FRAME_LEN];
        buf[0] = self.device_type.code();
        buf[1..9].copy_from_slice(&self.bitmap.to_be_bytes());
        buf
    }

    /// Decode one 9-byte command frame (the field-controller side).
    pub fn decode(buf: &[u8; COMMAND_FRAME_LEN]) -> Result<Self> {
        let device_type = DeviceType::from_code(buf[0])
            .ok_or(HubError::InvalidDeviceType { code: buf[0] })?;
        let mut bitmap = [0u8; 8];
        bitmap.copy_from_slice(&buf[1..9]);
        Ok(Self {
            device_type,
            bitmap: u64::from_be_bytes(bitmap),
        })
    }
}

/// One operator submission, encoded as a sequence of command frames.
///
/// Contains one frame per commandable device type of the registry (non-auto
/// types with at least one registered device), in registry first-appearance
/// order; a type whose devices are all unselected still gets a frame with a
/// zero bitmap, which turns those devices off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBatch {
    pub frames: Vec<CommandFrame>,
}

impl CommandBatch {
    /// Build the batch for an operator selection.
    ///
    /// Passive and auto devices that slip into the selection are ignored;
    /// they cannot be commanded.
    pub fn from_selection(registry: &DeviceRegistry, selection: &[Device]) -> Self {
        let frames = registry
            .commandable_types()
            .into_iter()
            .map(|device_type| {
                let mut bitmap = 0u64;
                for device in selection {
                    if device.device_type == device_type && !device.passive {
                        bitmap |= 1u64 << device.slot;
                    }
                }
                CommandFrame { device_type, bitmap }
            })
            .collect();
        Self { frames }
    }
}

/// Render a bitmap the way audit rows expect it: 64 binary digits,
/// most-significant bit first, zero-padded.
pub fn bitmap_string(bitmap: u64) -> String {
    format!("{bitmap:064b}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_frame_layout() {
        let report = StateReport {
            device_type: DeviceType::SensorPresence,
            bitmap: 0b1,
            temperature: 22.5,
            humidity: 40.0,
        };
        let buf = report.encode();
        assert_eq!(buf.len(), STATE_FRAME_LEN);
        assert_eq!(buf[0], 2);
        assert_eq!(&buf[1..9], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&buf[9..13], &22.5f32.to_be_bytes());
        assert_eq!(&buf[13..17], &40.0f32.to_be_bytes());
    }

    #[test]
    fn test_state_roundtrip() {
        let report = StateReport {
            device_type: DeviceType::Lamp,
            bitmap: 0xDEAD_BEEF_0042_1001,
            temperature: -3.25,
            humidity: 87.5,
        };
        let decoded = StateReport::decode(&report.encode()).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn test_state_decode_rejects_unknown_type() {
        let mut buf = [0u8; STATE_FRAME_LEN];
        buf[0] = 99;
        assert!(matches!(
            StateReport::decode(&buf),
            Err(HubError::InvalidDeviceType { code: 99 })
        ));
    }

    #[test]
    fn test_command_frame_layout() {
        let frame = CommandFrame {
            device_type: DeviceType::Lamp,
            bitmap: 0b101,
        };
        assert_eq!(frame.encode(), [3, 0, 0, 0, 0, 0, 0, 0, 0b101]);
    }

    #[test]
    fn test_command_roundtrip_extremes() {
        for bitmap in [0u64, 1, 0b101, u64::MAX, 1 << 63] {
            let frame = CommandFrame {
                device_type: DeviceType::AirConditioning,
                bitmap,
            };
            assert_eq!(CommandFrame::decode(&frame.encode()).unwrap(), frame);
        }
    }

    #[test]
    fn test_slot_indexing_is_lsb_first() {
        let report = StateReport {
            device_type: DeviceType::SensorOpening,
            bitmap: 0b100000001,
            temperature: 0.0,
            humidity: 0.0,
        };
        assert!(report.slot_active(0));
        assert!(!report.slot_active(1));
        assert!(report.slot_active(8));
        assert_eq!(report.active_slots().collect::<Vec<_>>(), vec![0, 8]);
    }

    #[test]
    fn test_batch_from_selection() {
        let registry = DeviceRegistry::build([
            ("Lamp A", DeviceType::Lamp),
            ("Lamp B", DeviceType::Lamp),
            ("Lamp C", DeviceType::Lamp),
            ("AC", DeviceType::AirConditioning),
            ("Auto", DeviceType::AirConditioningAuto),
        ])
        .unwrap();

        let selection = vec![
            registry.lookup(DeviceType::Lamp, 0).unwrap().clone(),
            registry.lookup(DeviceType::Lamp, 2).unwrap().clone(),
        ];
        let batch = CommandBatch::from_selection(&registry, &selection);

        // One frame per commandable type, in declaration order; the AC frame
        // carries a zero bitmap (nothing of that type selected), the auto
        // type is absent entirely.
        assert_eq!(
            batch.frames,
            vec![
                CommandFrame {
                    device_type: DeviceType::Lamp,
                    bitmap: 0b101,
                },
                CommandFrame {
                    device_type: DeviceType::AirConditioning,
                    bitmap: 0,
                },
            ]
        );
    }

    #[test]
    fn test_batch_ignores_passive_devices() {
        let registry = DeviceRegistry::build([
            ("Door", DeviceType::SensorOpening),
            ("Lamp", DeviceType::Lamp),
        ])
        .unwrap();

        // A sensor forced into the selection must not set bits.
        let selection: Vec<Device> = registry.devices().to_vec();
        let batch = CommandBatch::from_selection(&registry, &selection);
        assert_eq!(
            batch.frames,
            vec![
                CommandFrame {
                    device_type: DeviceType::SensorOpening,
                    bitmap: 0,
                },
                CommandFrame {
                    device_type: DeviceType::Lamp,
                    bitmap: 0b1,
                },
            ]
        );
    }

    #[test]
    fn test_bitmap_string_is_msb_first() {
        assert_eq!(bitmap_string(0), "0".repeat(64));
        assert_eq!(
            bitmap_string(0b101),
            format!("{}101", "0".repeat(61))
        );
        assert_eq!(bitmap_string(u64::MAX), "1".repeat(64));
        assert_eq!(bitmap_string(1 << 63), format!("1{}", "0".repeat(63)));
    }
}
