//! Protocol library for robotic-arm-usb
//!
//! This crate defines the command encoding of the Velleman KSR10 / OWI-535
//! robotic arm USB interface: the actuators and their actions, the 32-bit
//! command word, the control transfer parameters, and the connection status
//! reported by the controller. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use protocol::{Action, Actuator, CommandWord, encode_batch, is_command_valid};
//!
//! assert!(is_command_valid(Actuator::Gripper, Action::CLOSE));
//! assert!(!is_command_valid(Actuator::Light, Action::OPEN));
//!
//! let word = encode_batch(
//!     CommandWord::ZERO,
//!     [(Actuator::Gripper, Action::CLOSE), (Actuator::Wrist, Action::UP)],
//! )
//! .unwrap();
//! assert_eq!(word.bits(), 0x5);
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod types;

pub use codec::{
    ARM_INTERFACE, COMMAND_WORD_LEN, DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID, INDEX, REQUEST,
    REQUEST_TYPE, VALUE, decode_command_word, encode_command_word,
};
pub use command::{CommandWord, encode, encode_batch, is_command_valid, parse_command};
pub use error::{ProtocolError, Result};
pub use types::{Action, Actuator, ConnectionStatus};
