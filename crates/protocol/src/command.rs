//! Record command tags.

use std::fmt;

/// Command tag carried in the first byte of every record.
///
/// Tag bytes are part of the on-disk and wire format contract; changing them
/// breaks compatibility with existing stores.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Command {
    /// Raw block payload, stored in `dat` files.
    Data,
    /// A bare weak fingerprint (16 hex chars), used in the sparse file.
    Fingerprint,
    /// A full signature: weak + strong fingerprints (48 hex chars).
    Signature,
    /// A storage address (`PPPP/SSSS/TTTT/IIII`), paired with the preceding
    /// signature record in manifests.
    SavePath,
    /// Path of a backup manifest, heading its fingerprints in the sparse file.
    ManifestPath,
    /// Duplicate verdict on the wire: block index plus save path.
    Match,
    /// Backpressure signal: all blocks up to the carried index are resolved.
    WrapUp,
    /// Free-form control text (`cname:<name>`, `cname ok`, `sigs_end`).
    Control,
}

impl Command {
    /// Returns the wire byte for this command.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Data => b'a',
            Self::Fingerprint => b'f',
            Self::Signature => b'S',
            Self::SavePath => b's',
            Self::ManifestPath => b'M',
            Self::Match => b'm',
            Self::WrapUp => b'w',
            Self::Control => b'c',
        }
    }

    /// Decodes a wire byte into a command, if it names one.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'a' => Some(Self::Data),
            b'f' => Some(Self::Fingerprint),
            b'S' => Some(Self::Signature),
            b's' => Some(Self::SavePath),
            b'M' => Some(Self::ManifestPath),
            b'm' => Some(Self::Match),
            b'w' => Some(Self::WrapUp),
            b'c' => Some(Self::Control),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Data => "data",
            Self::Fingerprint => "fingerprint",
            Self::Signature => "signature",
            Self::SavePath => "save-path",
            Self::ManifestPath => "manifest-path",
            Self::Match => "match",
            Self::WrapUp => "wrap-up",
            Self::Control => "control",
        };
        f.write_str(name)
    }
}
