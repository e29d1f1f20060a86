//! Control transfer wire format
//!
//! The arm accepts a single vendor-specific OUT control transfer whose data
//! stage is the raw command word.
//!
//! # Transfer Format
//!
//! ```text
//! bmRequestType = 0x40 (vendor, host-to-device, device recipient)
//! bRequest      = 0x06
//! wValue        = 0x0100
//! wIndex        = 0x0000
//! data          = [command word: u32 (host byte order)]
//! ```
//!
//! The payload is written in host byte order, as the reference driver does.

use crate::command::CommandWord;
use crate::error::{ProtocolError, Result};
use byteorder::{ByteOrder, NativeEndian};

/// Default USB vendor ID of the arm's interface board
pub const DEFAULT_VENDOR_ID: u16 = 0x1267;

/// Default USB product ID of the arm's interface board
pub const DEFAULT_PRODUCT_ID: u16 = 0x0000;

/// Interface claimed for control transfers
pub const ARM_INTERFACE: u8 = 0;

/// bmRequestType of the command transfer
pub const REQUEST_TYPE: u8 = 0x40;

/// bRequest of the command transfer
pub const REQUEST: u8 = 0x06;

/// wValue of the command transfer
pub const VALUE: u16 = 0x0100;

/// wIndex of the command transfer
pub const INDEX: u16 = 0x0000;

/// Size of the command transfer's data stage
pub const COMMAND_WORD_LEN: usize = std::mem::size_of::<u32>();

/// Encode a command word as the transfer payload
pub fn encode_command_word(word: CommandWord) -> [u8; COMMAND_WORD_LEN] {
    let mut buf = [0u8; COMMAND_WORD_LEN];
    NativeEndian::write_u32(&mut buf, word.bits());
    buf
}

/// Decode a transfer payload back into a command word
pub fn decode_command_word(bytes: &[u8]) -> Result<CommandWord> {
    if bytes.len() != COMMAND_WORD_LEN {
        return Err(ProtocolError::InvalidLength {
            expected: COMMAND_WORD_LEN,
            actual: bytes.len(),
        });
    }
    Ok(CommandWord(NativeEndian::read_u32(bytes)))
}
