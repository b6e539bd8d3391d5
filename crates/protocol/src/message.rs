//! Typed payload helpers for the record commands.

use checksums::{StrongSum, WeakSum};

use crate::error::ProtocolError;

/// Prefix of the client-identification control payload.
pub const CNAME_PREFIX: &str = "cname:";

/// Control payload acknowledging a client name.
pub const CNAME_OK: &str = "cname ok";

/// Control payload ending a client's signature stream.
pub const SIGS_END: &str = "sigs_end";

/// Save-path placeholder in match replies for the reserved empty-block
/// pair, which has no storage address.
pub const EMPTY_SAVE_PATH: &str = "-";

/// Bytes in a signature payload: 16 hex weak + 32 hex strong.
pub const SIGNATURE_PAYLOAD_LEN: usize = WeakSum::HEX_LEN + StrongSum::HEX_LEN;

/// Encodes a signature payload: the weak sum's 16 uppercase hex characters
/// immediately followed by the strong sum's 32 lowercase hex characters.
#[must_use]
pub fn signature_payload(weak: WeakSum, strong: &StrongSum) -> Vec<u8> {
    format!("{weak}{strong}").into_bytes()
}

/// Decodes a signature payload produced by [`signature_payload`].
pub fn parse_signature(payload: &[u8]) -> Result<(WeakSum, StrongSum), ProtocolError> {
    if payload.len() != SIGNATURE_PAYLOAD_LEN {
        return Err(ProtocolError::MalformedPayload {
            context: "signature",
            detail: format!(
                "expected {SIGNATURE_PAYLOAD_LEN} bytes, got {}",
                payload.len()
            ),
        });
    }
    let weak =
        WeakSum::parse_hex(&payload[..WeakSum::HEX_LEN]).map_err(signature_malformed)?;
    let strong =
        StrongSum::parse_hex(&payload[WeakSum::HEX_LEN..]).map_err(signature_malformed)?;
    Ok((weak, strong))
}

fn signature_malformed(err: checksums::ChecksumError) -> ProtocolError {
    ProtocolError::MalformedPayload {
        context: "signature",
        detail: err.to_string(),
    }
}

/// Encodes a match payload: the duplicate block's index (16 uppercase hex
/// characters) followed by a space and its save path.
#[must_use]
pub fn match_payload(index: u64, save_path: &str) -> Vec<u8> {
    format!("{index:016X} {save_path}").into_bytes()
}

/// Decodes a match payload into `(block index, save path)`.
pub fn parse_match_payload(payload: &[u8]) -> Result<(u64, String), ProtocolError> {
    let text = std::str::from_utf8(payload).map_err(|err| ProtocolError::MalformedPayload {
        context: "match",
        detail: err.to_string(),
    })?;
    let (index_text, path) =
        text.split_once(' ')
            .ok_or_else(|| ProtocolError::MalformedPayload {
                context: "match",
                detail: "missing space between index and save path".to_owned(),
            })?;
    let index =
        u64::from_str_radix(index_text, 16).map_err(|err| ProtocolError::MalformedPayload {
            context: "match",
            detail: format!("bad index {index_text:?}: {err}"),
        })?;
    Ok((index, path.to_owned()))
}

/// Encodes a wrap-up payload: the newest resolved block index as 16
/// uppercase hex characters.
#[must_use]
pub fn wrap_up_payload(index: u64) -> Vec<u8> {
    format!("{index:016X}").into_bytes()
}

/// Decodes a wrap-up payload.
pub fn parse_wrap_up(payload: &[u8]) -> Result<u64, ProtocolError> {
    let text = std::str::from_utf8(payload).map_err(|err| ProtocolError::MalformedPayload {
        context: "wrap-up",
        detail: err.to_string(),
    })?;
    u64::from_str_radix(text, 16).map_err(|err| ProtocolError::MalformedPayload {
        context: "wrap-up",
        detail: format!("bad index {text:?}: {err}"),
    })
}

/// Extracts the client name from a `cname:<name>` control payload.
pub fn parse_client_name(payload: &[u8]) -> Result<&str, ProtocolError> {
    let text = std::str::from_utf8(payload).map_err(|err| ProtocolError::MalformedPayload {
        context: "cname",
        detail: err.to_string(),
    })?;
    let name = text
        .strip_prefix(CNAME_PREFIX)
        .ok_or_else(|| ProtocolError::MalformedPayload {
            context: "cname",
            detail: format!("missing {CNAME_PREFIX:?} prefix in {text:?}"),
        })?;
    if name.is_empty() {
        return Err(ProtocolError::MalformedPayload {
            context: "cname",
            detail: "empty client name".to_owned(),
        });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use checksums::strong_sum;

    #[test]
    fn signature_payload_is_48_bytes_weak_then_strong() {
        let weak = WeakSum::new(0xDEAD_BEEF_0000_0001);
        let strong = strong_sum(b"payload");
        let payload = signature_payload(weak, &strong);
        assert_eq!(payload.len(), SIGNATURE_PAYLOAD_LEN);
        assert!(payload.starts_with(b"DEADBEEF00000001"));

        let (parsed_weak, parsed_strong) = parse_signature(&payload).unwrap();
        assert_eq!(parsed_weak, weak);
        assert_eq!(parsed_strong, strong);
    }

    #[test]
    fn signature_rejects_wrong_length() {
        assert!(matches!(
            parse_signature(b"short"),
            Err(ProtocolError::MalformedPayload {
                context: "signature",
                ..
            })
        ));
    }

    #[test]
    fn match_payload_round_trips() {
        let payload = match_payload(42, "0000/0001/0002/0003");
        let (index, path) = parse_match_payload(&payload).unwrap();
        assert_eq!(index, 42);
        assert_eq!(path, "0000/0001/0002/0003");
    }

    #[test]
    fn match_payload_requires_separator() {
        assert!(parse_match_payload(b"0000000000000001").is_err());
    }

    #[test]
    fn wrap_up_round_trips() {
        let payload = wrap_up_payload(10_000);
        assert_eq!(parse_wrap_up(&payload).unwrap(), 10_000);
    }

    #[test]
    fn client_name_parses_and_validates() {
        assert_eq!(parse_client_name(b"cname:laptop-1").unwrap(), "laptop-1");
        assert!(parse_client_name(b"cname:").is_err());
        assert!(parse_client_name(b"hello").is_err());
    }
}
