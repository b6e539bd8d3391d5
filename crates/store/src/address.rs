//! Storage addresses in the sharded `prim/seco/tert/sig` scheme.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Signature slots per `dat`/`sig` file pair.
///
/// On-disk format contract; changing it breaks existing stores.
pub const SIG_MAX: u16 = 4096;

/// Directory entries per `seco` and `tert` level (and the `prim` cap).
///
/// On-disk format contract; changing it breaks existing stores.
pub const MAX_STORAGE_SUBDIRS: u16 = 30000;

/// Address of one stored block: three directory levels, one file level and
/// the slot within the file.
///
/// Displays as `PPPP/SSSS/TTTT/IIII` (4 uppercase hex digits each), the
/// "save path" recorded in manifests and sent in match replies. The derived
/// ordering is lexicographic over `(prim, seco, tert, sig)`, which is the
/// order addresses are handed out in.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address {
    /// Top-level directory.
    pub prim: u16,
    /// Second-level directory.
    pub seco: u16,
    /// Data/signature file within the second level.
    pub tert: u16,
    /// Record slot within the file; `< SIG_MAX`.
    pub sig: u16,
}

impl Address {
    /// Builds an address from its four components.
    #[must_use]
    pub const fn new(prim: u16, seco: u16, tert: u16, sig: u16) -> Self {
        Self {
            prim,
            seco,
            tert,
            sig,
        }
    }

    /// The 3-component `PPPP/SSSS/TTTT` prefix naming the `dat`/`sig` file
    /// pair this address stores into.
    #[must_use]
    pub fn subtree(&self) -> String {
        format!("{:04X}/{:04X}/{:04X}", self.prim, self.seco, self.tert)
    }

    /// Reports whether `other` stores into a different `dat`/`sig` file pair.
    #[must_use]
    pub const fn crosses_file_boundary(&self, other: &Self) -> bool {
        self.prim != other.prim || self.seco != other.seco || self.tert != other.tert
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}/{:04X}/{:04X}/{:04X}",
            self.prim, self.seco, self.tert, self.sig
        )
    }
}

impl FromStr for Address {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || StoreError::MalformedAddress(s.to_owned());

        let mut parts = s.split('/');
        let mut component = |limit: u16| -> Result<u16, StoreError> {
            let text = parts.next().ok_or_else(malformed)?;
            if text.len() != 4 {
                return Err(malformed());
            }
            let value = u16::from_str_radix(text, 16).map_err(|_| malformed())?;
            if value >= limit {
                return Err(malformed());
            }
            Ok(value)
        };

        let prim = component(MAX_STORAGE_SUBDIRS)?;
        let seco = component(MAX_STORAGE_SUBDIRS)?;
        let tert = component(MAX_STORAGE_SUBDIRS)?;
        let sig = component(SIG_MAX)?;
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Self::new(prim, seco, tert, sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_four_hex_components() {
        let addr = Address::new(0, 1, 0x2A, 0xFFF);
        assert_eq!(addr.to_string(), "0000/0001/002A/0FFF");
        assert_eq!(addr.subtree(), "0000/0001/002A");
    }

    #[test]
    fn parse_round_trips_display() {
        let addr = Address::new(3, 29999, 17, 4095);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn parse_rejects_out_of_bounds_components() {
        // sig must stay below SIG_MAX.
        assert!("0000/0000/0000/1000".parse::<Address>().is_err());
        // directory levels must stay below MAX_STORAGE_SUBDIRS (0x7530).
        assert!("7530/0000/0000/0000".parse::<Address>().is_err());
    }

    #[test]
    fn parse_rejects_malformed_strings() {
        for bad in ["", "0000", "0000/0000/0000", "00000/0000/0000/0000",
                    "0000/0000/0000/0000/0000", "zzzz/0000/0000/0000"] {
            assert!(bad.parse::<Address>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn ordering_is_lexicographic_over_components() {
        let a = Address::new(0, 0, 0, 4095);
        let b = Address::new(0, 0, 1, 0);
        let c = Address::new(0, 1, 0, 0);
        let d = Address::new(1, 0, 0, 0);
        assert!(a < b && b < c && c < d);
    }

    #[test]
    fn file_boundary_ignores_sig_component() {
        let a = Address::new(0, 0, 1, 10);
        assert!(!a.crosses_file_boundary(&Address::new(0, 0, 1, 4000)));
        assert!(a.crosses_file_boundary(&Address::new(0, 0, 2, 10)));
    }
}
