//! USB transfer execution
//!
//! The arm only ever receives one kind of transfer: a vendor OUT control
//! transfer carrying the command word. A transfer succeeds only if the
//! device accepts the whole word.

use crate::usb::ArmDevice;
use protocol::{
    COMMAND_WORD_LEN, CommandWord, INDEX, REQUEST, REQUEST_TYPE, VALUE, encode_command_word,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// A command word transfer that did not go through
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The transport reported an error
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// The device accepted fewer bytes than the word holds
    #[error("Short write: {sent} of {expected} bytes sent")]
    ShortWrite { sent: usize, expected: usize },
}

/// Send a command word to the arm
///
/// A zero `timeout` waits for the device indefinitely.
pub fn send_command_word<D: ArmDevice>(
    device: &mut D,
    word: CommandWord,
    timeout: Duration,
) -> Result<(), TransferError> {
    let payload = encode_command_word(word);

    debug!(
        "Control transfer: request_type={:#x}, request={:#x}, value={:#x}, index={:#x}, word={}",
        REQUEST_TYPE, REQUEST, VALUE, INDEX, word
    );

    let result = match device.write_control(REQUEST_TYPE, REQUEST, VALUE, INDEX, &payload, timeout)
    {
        Ok(sent) if sent == COMMAND_WORD_LEN => Ok(()),
        Ok(sent) => Err(TransferError::ShortWrite {
            sent,
            expected: COMMAND_WORD_LEN,
        }),
        Err(e) => Err(TransferError::Usb(e)),
    };

    match &result {
        Ok(()) => debug!("Control transfer succeeded: {}", word),
        Err(e) => warn!("Failed to send command word {} to the arm: {}", word, e),
    }

    result
}
