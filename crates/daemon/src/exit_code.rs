//! Process exit codes for the daemon entry points.

/// Typed exit codes, stable across releases so wrappers can dispatch on
/// them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ExitCode {
    /// Clean shutdown.
    Ok = 0,
    /// Bad configuration or command-line usage.
    Config = 1,
    /// A peer violated the record protocol.
    Protocol = 2,
    /// The store's address space is exhausted.
    Capacity = 3,
    /// Another process holds the store lock.
    LockHeld = 4,
    /// An I/O failure outside the categories above.
    Io = 5,
}

impl ExitCode {
    /// The code as the u8 the process exits with.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExitCode::Ok.as_u8(), 0);
        assert_eq!(ExitCode::Config.as_u8(), 1);
        assert_eq!(ExitCode::Protocol.as_u8(), 2);
        assert_eq!(ExitCode::Capacity.as_u8(), 3);
        assert_eq!(ExitCode::LockHeld.as_u8(), 4);
        assert_eq!(ExitCode::Io.as_u8(), 5);
    }
}
