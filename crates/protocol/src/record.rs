//! Record framing: write, blocking read, and incremental parse.

use std::io::{Read, Write};

use crate::command::Command;
use crate::error::ProtocolError;

/// Maximum payload size encodable in the 4-hex-digit length field.
pub const MAX_PAYLOAD_LEN: usize = 0xFFFF;

/// Bytes in a record header: 1 command byte + 4 length digits.
const HEADER_LEN: usize = 5;

/// One decoded record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// The record's command tag.
    pub command: Command,
    /// The raw payload bytes.
    pub payload: Vec<u8>,
}

impl Record {
    /// Convenience constructor.
    #[must_use]
    pub fn new(command: Command, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }

    /// Returns the payload as UTF-8 text, or a malformed-payload error.
    pub fn payload_str(&self) -> Result<&str, ProtocolError> {
        std::str::from_utf8(&self.payload).map_err(|err| ProtocolError::MalformedPayload {
            context: "text",
            detail: err.to_string(),
        })
    }
}

/// Writes one record to `writer`.
///
/// Fails before touching the writer if the payload cannot be represented in
/// the length field. Any short write surfaces as an I/O error from the
/// underlying writer.
pub fn write_record<W: Write>(
    writer: &mut W,
    command: Command,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut header = [0u8; HEADER_LEN];
    header[0] = command.as_byte();
    encode_len(payload.len() as u16, &mut header[1..]);
    writer.write_all(&header)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads one record from `reader`.
///
/// Returns `Ok(None)` on a clean end of stream (no bytes where a header
/// would start). End of stream inside a header or payload is a
/// [`ProtocolError::Truncated`] hard error.
pub fn read_record<R: Read>(reader: &mut R) -> Result<Option<Record>, ProtocolError> {
    let mut header = [0u8; HEADER_LEN];
    match read_exact_or_eof(reader, &mut header)? {
        0 => return Ok(None),
        HEADER_LEN => {}
        got => {
            return Err(ProtocolError::Truncated {
                context: "record header",
                expected: HEADER_LEN - got,
            });
        }
    }

    let (command, len) = decode_header(&header)?;
    let mut payload = vec![0u8; len];
    let got = read_exact_or_eof(reader, &mut payload)?;
    if got != len {
        return Err(ProtocolError::Truncated {
            context: "record payload",
            expected: len - got,
        });
    }

    Ok(Some(Record { command, payload }))
}

/// Attempts to parse one record from the front of `buf` without consuming it.
///
/// Returns the record and the number of bytes it occupied, or `Ok(None)` when
/// `buf` does not yet hold a complete record. Used by the daemon's
/// nonblocking read path, where records arrive in arbitrary fragments.
pub fn try_parse_record(buf: &[u8]) -> Result<Option<(Record, usize)>, ProtocolError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    let (command, len) = decode_header(&buf[..HEADER_LEN])?;
    let total = HEADER_LEN + len;
    if buf.len() < total {
        return Ok(None);
    }

    let payload = buf[HEADER_LEN..total].to_vec();
    Ok(Some((Record { command, payload }, total)))
}

fn decode_header(header: &[u8]) -> Result<(Command, usize), ProtocolError> {
    let command =
        Command::from_byte(header[0]).ok_or(ProtocolError::UnknownCommand(header[0]))?;
    let digits = &header[1..HEADER_LEN];
    let text = std::str::from_utf8(digits)
        .map_err(|_| ProtocolError::InvalidLength(format!("{digits:?}")))?;
    let len = u16::from_str_radix(text, 16)
        .map_err(|_| ProtocolError::InvalidLength(text.to_owned()))?;
    Ok((command, len as usize))
}

fn encode_len(len: u16, out: &mut [u8]) {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    out[0] = DIGITS[(len >> 12) as usize & 0xF];
    out[1] = DIGITS[(len >> 8) as usize & 0xF];
    out[2] = DIGITS[(len >> 4) as usize & 0xF];
    out[3] = DIGITS[len as usize & 0xF];
}

/// Reads until `buf` is full or the stream ends, returning the bytes read.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(filled)
}
