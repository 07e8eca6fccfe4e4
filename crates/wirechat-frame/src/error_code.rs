use std::fmt;

use serde::Serialize;

/// Server error codes carried by the `Error` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The requested username is already connected. Fatal for the session.
    UsernameTaken,
    InvalidStatus,
    EmptyMessage,
    RecipientOffline,
    /// A code this client does not know; treated as recoverable.
    Unknown(u8),
}

impl ErrorCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::UsernameTaken,
            2 => Self::InvalidStatus,
            3 => Self::EmptyMessage,
            4 => Self::RecipientOffline,
            other => Self::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::UsernameTaken => 1,
            Self::InvalidStatus => 2,
            Self::EmptyMessage => 3,
            Self::RecipientOffline => 4,
            Self::Unknown(other) => other,
        }
    }

    /// Only `UsernameTaken` ends the session.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::UsernameTaken)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::UsernameTaken => "username already taken",
            Self::InvalidStatus => "invalid status",
            Self::EmptyMessage => "empty message",
            Self::RecipientOffline => "recipient is offline",
            Self::Unknown(_) => "unknown server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "{} ({code})", self.description()),
            other => f.write_str(other.description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_username_taken_is_fatal() {
        assert!(ErrorCode::from_byte(1).is_fatal());
        for byte in [2u8, 3, 4, 9] {
            assert!(!ErrorCode::from_byte(byte).is_fatal());
        }
    }

    #[test]
    fn unknown_code_keeps_its_byte() {
        let code = ErrorCode::from_byte(42);
        assert_eq!(code, ErrorCode::Unknown(42));
        assert_eq!(code.as_byte(), 42);
        assert_eq!(code.to_string(), "unknown server error (42)");
    }
}
