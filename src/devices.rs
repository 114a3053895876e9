// MIT License - Copyright (c) 2026 Peter Wright

//! Device identity model: type, per-type slot id, and the static registry.

use std::fmt;

use crate::error::{HubError, Result};

/// Width of the state bitmap, and therefore the slot budget per device type.
pub const MAX_SLOTS_PER_TYPE: usize = 64;

/// Device type as carried in the wire protocol's type byte.
///
/// The wire codes are part of the deployed contract with the field
/// controller; see [`DeviceType::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Door/window opening sensor (passive, alarm category)
    SensorOpening,
    /// Presence/movement sensor (passive, alarm category)
    SensorPresence,
    /// Lamp actuator
    Lamp,
    /// Air conditioner actuator
    AirConditioning,
    /// Automatic temperature control pseudo-device. Excluded from command
    /// encoding: the observed protocol defines no setpoint frame for it.
    AirConditioningAuto,
}

impl DeviceType {
    pub const ALL: [DeviceType; 5] = [
        DeviceType::SensorOpening,
        DeviceType::SensorPresence,
        DeviceType::Lamp,
        DeviceType::AirConditioning,
        DeviceType::AirConditioningAuto,
    ];

    /// The wire code used in the type byte of state and command frames.
    pub fn code(self) -> u8 {
        match self {
            Self::SensorOpening => 1,
            Self::SensorPresence => 2,
            Self::Lamp => 3,
            Self::AirConditioning => 4,
            Self::AirConditioningAuto => 5,
        }
    }

    /// Parse a wire code back into a device type.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::SensorOpening),
            2 => Some(Self::SensorPresence),
            3 => Some(Self::Lamp),
            4 => Some(Self::AirConditioning),
            5 => Some(Self::AirConditioningAuto),
            _ => None,
        }
    }

    /// The spelling used in audit rows and configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Self::SensorOpening => "SensorOpening",
            Self::SensorPresence => "SensorPresence",
            Self::Lamp => "Lamp",
            Self::AirConditioning => "AirConditioning",
            Self::AirConditioningAuto => "AirConditioningAuto",
        }
    }

    /// Parse a configuration-file spelling (case-insensitive).
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
    }

    /// Whether activity on this type trips the alarm.
    pub fn triggers_alarm(self) -> bool {
        match self {
            Self::SensorOpening | Self::SensorPresence => true,
            Self::Lamp | Self::AirConditioning | Self::AirConditioningAuto => false,
        }
    }

    /// Whether this type is automatically controlled and therefore excluded
    /// from command batches.
    pub fn is_auto(self) -> bool {
        match self {
            Self::AirConditioningAuto => true,
            Self::SensorOpening
            | Self::SensorPresence
            | Self::Lamp
            | Self::AirConditioning => false,
        }
    }

    /// Whether devices of this type are sensors: observed, never commanded.
    pub fn is_sensor(self) -> bool {
        match self {
            Self::SensorOpening | Self::SensorPresence => true,
            Self::Lamp | Self::AirConditioning | Self::AirConditioningAuto => false,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single registered device.
///
/// Identity is `(device_type, slot)`; the slot doubles as the device's bit
/// position in state and command bitmaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Display name shown to the operator
    pub name: String,
    pub device_type: DeviceType,
    /// Bit position within this device's type, `0..=63`
    pub slot: u8,
    /// Passive devices are observed but never commanded
    pub passive: bool,
}

/// The static device catalog.
///
/// Built once at startup from the declaration list and immutable afterwards.
/// Slot assignment is a pure function of declaration order: one counter per
/// type, incremented as declarations of that type appear. The declaration
/// order is therefore part of the deployed contract: reordering the list
/// changes which physical device a bit position names.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    /// Build the registry from `(name, type)` declarations.
    ///
    /// Fails with [`HubError::SlotsExhausted`] if more than 64 devices of
    /// one type are declared.
    pub fn build<I, S>(declarations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, DeviceType)>,
        S: Into<String>,
    {
        let mut counters = [0usize; DeviceType::ALL.len()];
        let mut devices = Vec::new();

        for (name, device_type) in declarations {
            let counter = &mut counters[device_type.code() as usize - 1];
            if *counter >= MAX_SLOTS_PER_TYPE {
                return Err(HubError::SlotsExhausted {
                    device_type,
                    max: MAX_SLOTS_PER_TYPE,
                });
            }
            devices.push(Device {
                name: name.into(),
                device_type,
                slot: *counter as u8,
                passive: device_type.is_sensor(),
            });
            *counter += 1;
        }

        Ok(Self { devices })
    }

    /// All registered devices, in declaration order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Look up one device by identity.
    pub fn lookup(&self, device_type: DeviceType, slot: u8) -> Result<&Device> {
        self.devices
            .iter()
            .find(|d| d.device_type == device_type && d.slot == slot)
            .ok_or(HubError::UnknownDevice { device_type, slot })
    }

    /// Number of registered devices of one type.
    pub fn count(&self, device_type: DeviceType) -> usize {
        self.devices
            .iter()
            .filter(|d| d.device_type == device_type)
            .count()
    }

    /// Device types that appear in command batches: non-auto types with at
    /// least one registered device, in order of first appearance in the
    /// declaration list. This order fixes the frame order within a batch.
    pub fn commandable_types(&self) -> Vec<DeviceType> {
        let mut types = Vec::new();
        for device in &self.devices {
            if !device.device_type.is_auto() && !types.contains(&device.device_type) {
                types.push(device.device_type);
            }
        }
        types
    }
}

/// Declarations for the built-in catalog, used when the configuration file
/// does not declare its own devices.
pub fn default_declarations() -> Vec<(&'static str, DeviceType)> {
    vec![
        ("Front Door Sensor", DeviceType::SensorOpening),
        ("Balcony Window Sensor", DeviceType::SensorOpening),
        ("Living Room Presence", DeviceType::SensorPresence),
        ("Kitchen Presence", DeviceType::SensorPresence),
        ("Living Room Lamp", DeviceType::Lamp),
        ("Kitchen Lamp", DeviceType::Lamp),
        ("Bedroom Lamp", DeviceType::Lamp),
        ("Living Room AC", DeviceType::AirConditioning),
        ("Auto Temperature", DeviceType::AirConditioningAuto),
    ]
}
