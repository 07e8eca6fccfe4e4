use std::fmt;

use serde::Serialize;

/// A user's presence status as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Only seen inside `UserStatusChanged`: the user went away.
    Offline,
    Active,
    Busy,
    Inactive,
}

impl Status {
    /// Map a wire byte to a status. Unknown values yield `None`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Offline),
            1 => Some(Self::Active),
            2 => Some(Self::Busy),
            3 => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Offline => 0,
            Self::Active => 1,
            Self::Busy => 2,
            Self::Inactive => 3,
        }
    }

    /// True for the statuses a connected user can hold (1-3).
    pub fn is_online(self) -> bool {
        !matches!(self, Self::Offline)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Active => "active",
            Self::Busy => "busy",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "1" => Ok(Self::Active),
            "busy" | "2" => Ok(Self::Busy),
            "inactive" | "3" => Ok(Self::Inactive),
            other => Err(format!(
                "unknown status `{other}` (expected active, busy or inactive)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_mapping() {
        for byte in 0..=3u8 {
            let status = Status::from_byte(byte).unwrap();
            assert_eq!(status.as_byte(), byte);
        }
        assert_eq!(Status::from_byte(4), None);
        assert!(!Status::Offline.is_online());
        assert!(Status::Busy.is_online());
    }

    #[test]
    fn parse_rejects_offline() {
        assert_eq!("Busy".parse::<Status>(), Ok(Status::Busy));
        assert!("offline".parse::<Status>().is_err());
    }
}
