//! Arm and connection type definitions
//!
//! This module defines the actuators of the arm, the actions each of them
//! accepts, and the connection status reported by the controller.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One independently controllable mechanism on the arm
///
/// The discriminant is the bit offset of the actuator's 2-bit field inside
/// the command word. Offsets are not contiguous: bits 10..16 and 18..32 are
/// unused and always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Actuator {
    Gripper = 0,
    Wrist = 2,
    Elbow = 4,
    Shoulder = 6,
    Base = 8,
    Light = 16,
}

impl Actuator {
    /// Every actuator, in command word bit order
    pub const ALL: [Actuator; 6] = [
        Actuator::Gripper,
        Actuator::Wrist,
        Actuator::Elbow,
        Actuator::Shoulder,
        Actuator::Base,
        Actuator::Light,
    ];

    /// Bit offset of this actuator's field in the command word
    pub const fn offset(self) -> u32 {
        self as u32
    }

    /// Lowercase name, as accepted by `FromStr`
    pub const fn name(self) -> &'static str {
        match self {
            Actuator::Gripper => "gripper",
            Actuator::Wrist => "wrist",
            Actuator::Elbow => "elbow",
            Actuator::Shoulder => "shoulder",
            Actuator::Base => "base",
            Actuator::Light => "light",
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Actuator {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Actuator::ALL
            .into_iter()
            .find(|actuator| actuator.name() == lower)
            .ok_or_else(|| ProtocolError::UnknownActuator(s.to_string()))
    }
}

/// Direction or state requested for an actuator
///
/// The hardware only knows three field values. The direction names used by
/// the individual actuators are aliases of these values (see the associated
/// constants), so `Action::CLOSE == Action::UP == Action::ON`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Action {
    /// Field value 0: motor stopped, light off
    Stop = 0,
    /// Field value 1: close, up, clockwise, light on
    Forward = 1,
    /// Field value 2: open, down, counter-clockwise
    Reverse = 2,
}

impl Action {
    pub const OFF: Action = Action::Stop;
    pub const ON: Action = Action::Forward;
    pub const CLOSE: Action = Action::Forward;
    pub const UP: Action = Action::Forward;
    pub const CW: Action = Action::Forward;
    pub const OPEN: Action = Action::Reverse;
    pub const DOWN: Action = Action::Reverse;
    pub const CCW: Action = Action::Reverse;

    /// Raw 2-bit field value
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Decode a raw 2-bit field value
    ///
    /// Returns `None` for `0b11`, which no action maps to.
    pub const fn from_value(value: u8) -> Option<Action> {
        match value {
            0 => Some(Action::Stop),
            1 => Some(Action::Forward),
            2 => Some(Action::Reverse),
            _ => None,
        }
    }

    /// The name this action goes by for a given actuator
    ///
    /// Returns `None` when the pair is not a valid command.
    pub const fn label(self, actuator: Actuator) -> Option<&'static str> {
        match (actuator, self) {
            (Actuator::Light, Action::Stop) => Some("off"),
            (Actuator::Light, Action::Forward) => Some("on"),
            (Actuator::Light, Action::Reverse) => None,
            (_, Action::Stop) => Some("stop"),
            (Actuator::Gripper, Action::Forward) => Some("close"),
            (Actuator::Gripper, Action::Reverse) => Some("open"),
            (Actuator::Base, Action::Forward) => Some("cw"),
            (Actuator::Base, Action::Reverse) => Some("ccw"),
            (_, Action::Forward) => Some("up"),
            (_, Action::Reverse) => Some("down"),
        }
    }
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" | "off" => Ok(Action::Stop),
            "forward" | "on" | "close" | "up" | "cw" => Ok(Action::Forward),
            "reverse" | "open" | "down" | "ccw" => Ok(Action::Reverse),
            _ => Err(ProtocolError::UnknownAction(s.to_string())),
        }
    }
}

/// Connection status of the controller
///
/// Negative codes are failure outcomes returned by an operation; the others
/// describe where the connection lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i8)]
pub enum ConnectionStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    /// A control transfer failed while connected; requires disconnect/reconnect
    IoError = 3,
    Disconnecting = 4,
    DeviceNotFound = -1,
    ConnectionFailed = -2,
    InvalidCommand = -3,
}

impl ConnectionStatus {
    /// Stable numeric code of the status
    pub const fn code(self) -> i8 {
        self as i8
    }

    /// Human-readable description
    pub const fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::IoError => "input/output error",
            ConnectionStatus::Disconnecting => "disconnecting",
            ConnectionStatus::DeviceNotFound => "device not found",
            ConnectionStatus::ConnectionFailed => "connection failed",
            ConnectionStatus::InvalidCommand => "invalid command",
        }
    }

    /// Returns true for the failure outcomes (negative codes)
    pub const fn is_failure(self) -> bool {
        self.code() < 0
    }

    /// Returns true if the arm accepts commands in this state
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
