//! Wire opcodes.
//!
//! Opcodes 1-6 are sent by the client, opcodes 50-57 by the server.

/// Ask for the list of connected users.
pub const REQUEST_USER_LIST: u8 = 1;

/// Ask for one user's status.
pub const REQUEST_USER_INFO: u8 = 2;

/// Change a user's status.
pub const CHANGE_STATUS: u8 = 3;

/// Send a chat message to a user or to the broadcast channel.
pub const SEND_MESSAGE: u8 = 4;

/// Ask for a conversation's history.
pub const REQUEST_HISTORY: u8 = 5;

/// Announce a graceful disconnect.
pub const DISCONNECT: u8 = 6;

/// Server error notification.
pub const ERROR: u8 = 50;

/// Connected users and their statuses.
pub const USER_LIST: u8 = 51;

/// One user's status.
pub const USER_INFO: u8 = 52;

/// A user joined.
pub const USER_CONNECTED: u8 = 53;

/// A user's status changed (status 0 means offline).
pub const USER_STATUS_CHANGED: u8 = 54;

/// A chat message pushed by the server.
pub const MESSAGE: u8 = 55;

/// A conversation's history.
pub const HISTORY: u8 = 56;

/// A user left.
pub const USER_DISCONNECTED: u8 = 57;

/// Returns a human-readable name for an opcode.
pub fn opcode_name(op: u8) -> &'static str {
    match op {
        REQUEST_USER_LIST => "REQUEST_USER_LIST",
        REQUEST_USER_INFO => "REQUEST_USER_INFO",
        CHANGE_STATUS => "CHANGE_STATUS",
        SEND_MESSAGE => "SEND_MESSAGE",
        REQUEST_HISTORY => "REQUEST_HISTORY",
        DISCONNECT => "DISCONNECT",
        ERROR => "ERROR",
        USER_LIST => "USER_LIST",
        USER_INFO => "USER_INFO",
        USER_CONNECTED => "USER_CONNECTED",
        USER_STATUS_CHANGED => "USER_STATUS_CHANGED",
        MESSAGE => "MESSAGE",
        HISTORY => "HISTORY",
        USER_DISCONNECTED => "USER_DISCONNECTED",
        _ => "UNKNOWN",
    }
}

/// Returns true if the opcode is sent by clients.
pub fn is_outbound(op: u8) -> bool {
    (REQUEST_USER_LIST..=DISCONNECT).contains(&op)
}

/// Returns true if the opcode is sent by the server.
pub fn is_inbound(op: u8) -> bool {
    (ERROR..=USER_DISCONNECTED).contains(&op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_do_not_overlap() {
        for op in 0..=u8::MAX {
            assert!(!(is_outbound(op) && is_inbound(op)));
        }
        assert!(is_outbound(DISCONNECT));
        assert!(is_inbound(USER_DISCONNECTED));
        assert!(!is_inbound(58));
        assert!(!is_outbound(0));
    }

    #[test]
    fn unknown_opcode_name() {
        assert_eq!(opcode_name(HISTORY), "HISTORY");
        assert_eq!(opcode_name(7), "UNKNOWN");
    }
}
