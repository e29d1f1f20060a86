//! Command word encoding
//!
//! The arm is driven by a single 32-bit word holding a 2-bit field per
//! actuator. Everything here is pure: building, validating and decoding
//! words never touches the device.

use crate::error::{ProtocolError, Result};
use crate::types::{Action, Actuator};
use serde::{Deserialize, Serialize};
use std::fmt;

const FIELD_MASK: u32 = 0b11;

/// The 32-bit bitmask transmitted to the arm
///
/// Holds the simultaneous desired state of every actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CommandWord(pub u32);

impl CommandWord {
    /// All actuators stopped, light off
    pub const ZERO: CommandWord = CommandWord(0);

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every field is zero
    pub const fn is_stopped(self) -> bool {
        self.0 == 0
    }

    /// Raw 2-bit field of an actuator
    pub const fn field(self, actuator: Actuator) -> u8 {
        ((self.0 >> actuator.offset()) & FIELD_MASK) as u8
    }

    /// Decoded action of an actuator
    pub const fn action(self, actuator: Actuator) -> Option<Action> {
        Action::from_value(self.field(actuator))
    }

    /// Copy of this word with one actuator's field replaced
    pub const fn with(self, actuator: Actuator, action: Action) -> CommandWord {
        encode(self, actuator, action)
    }
}

impl From<u32> for CommandWord {
    fn from(bits: u32) -> Self {
        CommandWord(bits)
    }
}

impl From<CommandWord> for u32 {
    fn from(word: CommandWord) -> Self {
        word.0
    }
}

impl fmt::Display for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::LowerHex for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Whether an actuator accepts an action
///
/// Every motor accepts all three field values. The light only has on and
/// off, so it rejects `Reverse`.
pub const fn is_command_valid(actuator: Actuator, action: Action) -> bool {
    match actuator {
        Actuator::Gripper
        | Actuator::Wrist
        | Actuator::Elbow
        | Actuator::Shoulder
        | Actuator::Base => true,
        Actuator::Light => matches!(action, Action::Stop | Action::Forward),
    }
}

/// Replace one actuator's field in a command word
///
/// Does not validate; callers check `is_command_valid` first.
pub const fn encode(word: CommandWord, actuator: Actuator, action: Action) -> CommandWord {
    let offset = actuator.offset();
    let cleared = word.0 & !(FIELD_MASK << offset);
    CommandWord(cleared | ((action.value() as u32) << offset))
}

/// Apply a batch of commands, all or nothing
///
/// Every pair is validated before any is applied. When an actuator appears
/// more than once the last pair wins.
pub fn encode_batch<I>(word: CommandWord, commands: I) -> Result<CommandWord>
where
    I: IntoIterator<Item = (Actuator, Action)>,
{
    let commands: Vec<(Actuator, Action)> = commands.into_iter().collect();

    if let Some(&(actuator, action)) = commands
        .iter()
        .find(|(actuator, action)| !is_command_valid(*actuator, *action))
    {
        return Err(ProtocolError::InvalidCommand { actuator, action });
    }

    Ok(commands
        .into_iter()
        .fold(word, |word, (actuator, action)| encode(word, actuator, action)))
}

/// Parse `actuator=action` text, e.g. `"wrist=up"`
///
/// The pair is validated, so `"light=open"` is rejected.
pub fn parse_command(text: &str) -> Result<(Actuator, Action)> {
    let (actuator, action) = text
        .split_once('=')
        .ok_or_else(|| ProtocolError::MalformedCommand(text.to_string()))?;

    let actuator: Actuator = actuator.parse()?;
    let action: Action = action.parse()?;

    if !is_command_valid(actuator, action) {
        return Err(ProtocolError::InvalidCommand { actuator, action });
    }

    Ok((actuator, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_table() {
        for actuator in [
            Actuator::Gripper,
            Actuator::Wrist,
            Actuator::Elbow,
            Actuator::Shoulder,
            Actuator::Base,
        ] {
            assert!(is_command_valid(actuator, Action::Stop));
            assert!(is_command_valid(actuator, Action::Forward));
            assert!(is_command_valid(actuator, Action::Reverse));
        }
        assert!(is_command_valid(Actuator::Light, Action::ON));
        assert!(is_command_valid(Actuator::Light, Action::OFF));
        assert!(!is_command_valid(Actuator::Light, Action::OPEN));
    }

    #[test]
    fn test_encode_single_fields() {
        assert_eq!(encode(CommandWord::ZERO, Actuator::Gripper, Action::CLOSE).bits(), 0x1);
        assert_eq!(encode(CommandWord::ZERO, Actuator::Wrist, Action::DOWN).bits(), 0x8);
        assert_eq!(encode(CommandWord::ZERO, Actuator::Base, Action::CCW).bits(), 0x200);
        assert_eq!(encode(CommandWord::ZERO, Actuator::Light, Action::ON).bits(), 0x10000);
    }

    #[test]
    fn test_encode_replaces_field() {
        let word = CommandWord::ZERO.with(Actuator::Elbow, Action::UP);
        let word = word.with(Actuator::Elbow, Action::DOWN);
        assert_eq!(word.bits(), 0x20);
        assert_eq!(word.with(Actuator::Elbow, Action::Stop), CommandWord::ZERO);
    }

    #[test]
    fn test_gripper_then_wrist() {
        let word = CommandWord::ZERO
            .with(Actuator::Gripper, Action::CLOSE)
            .with(Actuator::Wrist, Action::UP);
        assert_eq!(word.bits(), 0x5);
        assert_eq!(word.action(Actuator::Gripper), Some(Action::CLOSE));
        assert_eq!(word.action(Actuator::Wrist), Some(Action::UP));
        assert_eq!(word.action(Actuator::Base), Some(Action::Stop));
    }

    #[test]
    fn test_batch_applies_all() {
        let word = encode_batch(
            CommandWord::ZERO,
            [
                (Actuator::Shoulder, Action::UP),
                (Actuator::Base, Action::CW),
                (Actuator::Light, Action::ON),
            ],
        )
        .unwrap();
        assert_eq!(word.bits(), 0x40 | 0x100 | 0x10000);
    }

    #[test]
    fn test_batch_rejects_whole_batch() {
        let start = CommandWord(0x1);
        let err = encode_batch(
            start,
            [(Actuator::Wrist, Action::UP), (Actuator::Light, Action::Reverse)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidCommand {
                actuator: Actuator::Light,
                action: Action::Reverse
            }
        );
    }

    #[test]
    fn test_batch_last_pair_wins() {
        let word = encode_batch(
            CommandWord::ZERO,
            [(Actuator::Gripper, Action::OPEN), (Actuator::Gripper, Action::CLOSE)],
        )
        .unwrap();
        assert_eq!(word.bits(), 0x1);
    }

    #[test]
    fn test_empty_batch_is_identity() {
        let word = CommandWord(0x105);
        assert_eq!(encode_batch(word, []).unwrap(), word);
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("gripper=close").unwrap(),
            (Actuator::Gripper, Action::CLOSE)
        );
        assert_eq!(parse_command("light=off").unwrap(), (Actuator::Light, Action::OFF));
        assert!(matches!(
            parse_command("gripper"),
            Err(ProtocolError::MalformedCommand(_))
        ));
        assert!(matches!(
            parse_command("light=open"),
            Err(ProtocolError::InvalidCommand { .. })
        ));
        assert!(matches!(
            parse_command("neck=up"),
            Err(ProtocolError::UnknownActuator(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(CommandWord(0x5).to_string(), "0x00000005");
        assert_eq!(format!("{:x}", CommandWord(0x10000)), "10000");
    }
}
