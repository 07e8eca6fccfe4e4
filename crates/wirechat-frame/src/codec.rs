use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{FrameError, Result};
use crate::opcode;

/// Longest string a 1-byte length prefix can describe.
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Most entries a 1-byte count can describe.
pub const MAX_ENTRIES: usize = u8::MAX as usize;

/// One `(username, status)` pair of a `UserList` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub username: String,
    pub status: u8,
}

impl UserEntry {
    pub fn new(username: impl Into<String>, status: u8) -> Self {
        Self {
            username: username.into(),
            status,
        }
    }
}

/// One `(sender, body)` pair of a `History` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub sender: String,
    pub body: String,
}

impl HistoryEntry {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }
}

/// A decoded protocol frame.
///
/// Status and error-code fields keep their raw wire byte so that any frame
/// the server sends survives a decode/encode cycle unchanged; interpret them
/// with [`crate::Status::from_byte`] and [`crate::ErrorCode::from_byte`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    RequestUserList,
    RequestUserInfo { username: String },
    ChangeStatus { username: String, status: u8 },
    SendMessage { recipient: String, body: String },
    RequestHistory { chat: String },
    Disconnect,
    Error { code: u8 },
    UserList { users: Vec<UserEntry> },
    UserInfo { username: String, status: u8 },
    UserConnected { username: String },
    UserStatusChanged { username: String, status: u8 },
    Message { sender: String, body: String },
    History { entries: Vec<HistoryEntry> },
    UserDisconnected { username: String },
}

impl Frame {
    /// The opcode byte this frame is written with.
    pub fn opcode(&self) -> u8 {
        match self {
            Self::RequestUserList => opcode::REQUEST_USER_LIST,
            Self::RequestUserInfo { .. } => opcode::REQUEST_USER_INFO,
            Self::ChangeStatus { .. } => opcode::CHANGE_STATUS,
            Self::SendMessage { .. } => opcode::SEND_MESSAGE,
            Self::RequestHistory { .. } => opcode::REQUEST_HISTORY,
            Self::Disconnect => opcode::DISCONNECT,
            Self::Error { .. } => opcode::ERROR,
            Self::UserList { .. } => opcode::USER_LIST,
            Self::UserInfo { .. } => opcode::USER_INFO,
            Self::UserConnected { .. } => opcode::USER_CONNECTED,
            Self::UserStatusChanged { .. } => opcode::USER_STATUS_CHANGED,
            Self::Message { .. } => opcode::MESSAGE,
            Self::History { .. } => opcode::HISTORY,
            Self::UserDisconnected { .. } => opcode::USER_DISCONNECTED,
        }
    }

    /// Human-readable opcode name, for logs.
    pub fn name(&self) -> &'static str {
        opcode::opcode_name(self.opcode())
    }

    /// Encode into a freshly allocated buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        encode_frame(self, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────────────────────────────────────────────┐
/// │ Opcode(1B) │ Fields, in fixed order for the opcode        │
/// │            │  string: len (1B) + len UTF-8 bytes          │
/// │            │  number: 1B                                  │
/// │            │  list:   count (1B) + count × entry          │
/// └────────────┴──────────────────────────────────────────────┘
/// ```
///
/// On error nothing is left appended to `dst`.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let start = dst.len();
    let result = write_fields(frame, dst);
    if result.is_err() {
        dst.truncate(start);
    }
    result
}

fn write_fields(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    dst.put_u8(frame.opcode());
    match frame {
        Frame::RequestUserList | Frame::Disconnect => {}
        Frame::RequestUserInfo { username }
        | Frame::UserConnected { username }
        | Frame::UserDisconnected { username } => {
            put_string(dst, "username", username)?;
        }
        Frame::ChangeStatus { username, status }
        | Frame::UserInfo { username, status }
        | Frame::UserStatusChanged { username, status } => {
            put_string(dst, "username", username)?;
            dst.put_u8(*status);
        }
        Frame::SendMessage { recipient, body } => {
            put_string(dst, "recipient", recipient)?;
            put_string(dst, "body", body)?;
        }
        Frame::RequestHistory { chat } => {
            put_string(dst, "chat", chat)?;
        }
        Frame::Error { code } => {
            dst.put_u8(*code);
        }
        Frame::UserList { users } => {
            put_count(dst, users.len())?;
            for user in users {
                put_string(dst, "username", &user.username)?;
                dst.put_u8(user.status);
            }
        }
        Frame::Message { sender, body } => {
            put_string(dst, "sender", sender)?;
            put_string(dst, "body", body)?;
        }
        Frame::History { entries } => {
            put_count(dst, entries.len())?;
            for entry in entries {
                put_string(dst, "sender", &entry.sender)?;
                put_string(dst, "body", &entry.body)?;
            }
        }
    }
    Ok(())
}

fn put_string(dst: &mut BytesMut, field: &'static str, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > MAX_FIELD_LEN {
        return Err(FrameError::FieldTooLong {
            field,
            len: bytes.len(),
        });
    }
    dst.reserve(1 + bytes.len());
    dst.put_u8(bytes.len() as u8);
    dst.put_slice(bytes);
    Ok(())
}

fn put_count(dst: &mut BytesMut, count: usize) -> Result<()> {
    if count > MAX_ENTRIES {
        return Err(FrameError::TooManyEntries { count });
    }
    dst.put_u8(count as u8);
    Ok(())
}

/// Decode one frame from a complete transport message.
///
/// Bytes after the last field of a known opcode are ignored so that newer
/// servers can append fields without breaking older clients.
pub fn decode_frame(src: &[u8]) -> Result<Frame> {
    let mut fields = FieldReader {
        buf: src,
        opcode: None,
    };
    let op = fields.u8()?;
    fields.opcode = Some(op);

    let frame = match op {
        opcode::REQUEST_USER_LIST => Frame::RequestUserList,
        opcode::REQUEST_USER_INFO => Frame::RequestUserInfo {
            username: fields.string()?,
        },
        opcode::CHANGE_STATUS => Frame::ChangeStatus {
            username: fields.string()?,
            status: fields.u8()?,
        },
        opcode::SEND_MESSAGE => Frame::SendMessage {
            recipient: fields.string()?,
            body: fields.string()?,
        },
        opcode::REQUEST_HISTORY => Frame::RequestHistory {
            chat: fields.string()?,
        },
        opcode::DISCONNECT => Frame::Disconnect,
        opcode::ERROR => Frame::Error { code: fields.u8()? },
        opcode::USER_LIST => {
            let count = fields.u8()? as usize;
            let mut users = Vec::with_capacity(count);
            for _ in 0..count {
                users.push(UserEntry {
                    username: fields.string()?,
                    status: fields.u8()?,
                });
            }
            Frame::UserList { users }
        }
        opcode::USER_INFO => Frame::UserInfo {
            username: fields.string()?,
            status: fields.u8()?,
        },
        opcode::USER_CONNECTED => Frame::UserConnected {
            username: fields.string()?,
        },
        opcode::USER_STATUS_CHANGED => Frame::UserStatusChanged {
            username: fields.string()?,
            status: fields.u8()?,
        },
        opcode::MESSAGE => Frame::Message {
            sender: fields.string()?,
            body: fields.string()?,
        },
        opcode::HISTORY => {
            let count = fields.u8()? as usize;
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                entries.push(HistoryEntry {
                    sender: fields.string()?,
                    body: fields.string()?,
                });
            }
            Frame::History { entries }
        }
        opcode::USER_DISCONNECTED => Frame::UserDisconnected {
            username: fields.string()?,
        },
        other => return Err(FrameError::UnknownOpcode(other)),
    };

    if fields.buf.has_remaining() {
        tracing::trace!(
            opcode = frame.name(),
            trailing = fields.buf.remaining(),
            "ignoring trailing frame bytes"
        );
    }

    Ok(frame)
}

struct FieldReader<'a> {
    buf: &'a [u8],
    opcode: Option<u8>,
}

impl FieldReader<'_> {
    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(FrameError::Truncated {
                opcode: self.opcode,
                needed: n - self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u8()? as usize;
        self.need(len)?;
        let (raw, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_frame() -> Vec<Frame> {
        vec![
            Frame::RequestUserList,
            Frame::RequestUserInfo {
                username: "alice".into(),
            },
            Frame::ChangeStatus {
                username: "alice".into(),
                status: 2,
            },
            Frame::SendMessage {
                recipient: "~".into(),
                body: "hola a todos".into(),
            },
            Frame::RequestHistory { chat: "bob".into() },
            Frame::Disconnect,
            Frame::Error { code: 4 },
            Frame::UserList {
                users: vec![UserEntry::new("alice", 1), UserEntry::new("bob", 3)],
            },
            Frame::UserInfo {
                username: "bob".into(),
                status: 1,
            },
            Frame::UserConnected {
                username: "carol".into(),
            },
            Frame::UserStatusChanged {
                username: "carol".into(),
                status: 0,
            },
            Frame::Message {
                sender: "dave".into(),
                body: "¿qué tal? 👋".into(),
            },
            Frame::History {
                entries: vec![HistoryEntry::new("alice", "hi"), HistoryEntry::new("bob", "yo")],
            },
            Frame::UserDisconnected {
                username: "erin".into(),
            },
        ]
    }

    #[test]
    fn test_roundtrip_every_opcode() {
        for frame in every_frame() {
            let wire = frame.encode().unwrap();
            assert_eq!(wire[0], frame.opcode());
            assert_eq!(decode_frame(&wire).unwrap(), frame, "{}", frame.name());
        }
    }

    #[test]
    fn test_send_message_wire_layout() {
        let wire = Frame::SendMessage {
            recipient: "bob".into(),
            body: "hi".into(),
        }
        .encode()
        .unwrap();
        assert_eq!(wire.as_ref(), &[4, 3, b'b', b'o', b'b', 2, b'h', b'i']);
    }

    #[test]
    fn test_string_length_counts_utf8_bytes() {
        // "ñ" is one code point but two bytes.
        let wire = Frame::UserConnected {
            username: "ñu".into(),
        }
        .encode()
        .unwrap();
        assert_eq!(wire[1], 3);
        assert_eq!(wire.len(), 5);
    }

    #[test]
    fn test_field_at_limit_encodes() {
        let body = "x".repeat(MAX_FIELD_LEN);
        let frame = Frame::SendMessage {
            recipient: "~".into(),
            body,
        };
        let wire = frame.encode().unwrap();
        assert_eq!(decode_frame(&wire).unwrap(), frame);
    }

    #[test]
    fn test_field_over_limit_fails() {
        let frame = Frame::SendMessage {
            recipient: "~".into(),
            body: "x".repeat(MAX_FIELD_LEN + 1),
        };
        let err = frame.encode().unwrap_err();
        assert_eq!(
            err,
            FrameError::FieldTooLong {
                field: "body",
                len: 256
            }
        );
    }

    #[test]
    fn test_multibyte_field_over_limit_fails() {
        // 128 two-byte characters: 128 code points, 256 bytes.
        let frame = Frame::RequestHistory {
            chat: "é".repeat(128),
        };
        assert!(matches!(
            frame.encode(),
            Err(FrameError::FieldTooLong { field: "chat", len: 256 })
        ));
    }

    #[test]
    fn test_failed_encode_leaves_buffer_untouched() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::RequestUserList, &mut buf).unwrap();
        let frame = Frame::SendMessage {
            recipient: "bob".into(),
            body: "x".repeat(300),
        };
        assert!(encode_frame(&frame, &mut buf).is_err());
        assert_eq!(buf.as_ref(), &[opcode::REQUEST_USER_LIST]);
    }

    #[test]
    fn test_too_many_entries() {
        let frame = Frame::UserList {
            users: (0..256).map(|i| UserEntry::new(format!("u{i}"), 1)).collect(),
        };
        assert_eq!(
            frame.encode().unwrap_err(),
            FrameError::TooManyEntries { count: 256 }
        );
    }

    #[test]
    fn test_decode_empty_buffer() {
        assert_eq!(
            decode_frame(&[]).unwrap_err(),
            FrameError::Truncated {
                opcode: None,
                needed: 1
            }
        );
    }

    #[test]
    fn test_decode_truncated_after_opcode() {
        for op in [
            opcode::REQUEST_USER_INFO,
            opcode::CHANGE_STATUS,
            opcode::SEND_MESSAGE,
            opcode::REQUEST_HISTORY,
            opcode::ERROR,
            opcode::USER_LIST,
            opcode::USER_INFO,
            opcode::USER_CONNECTED,
            opcode::USER_STATUS_CHANGED,
            opcode::MESSAGE,
            opcode::HISTORY,
            opcode::USER_DISCONNECTED,
        ] {
            let err = decode_frame(&[op]).unwrap_err();
            assert!(
                matches!(err, FrameError::Truncated { opcode: Some(o), .. } if o == op),
                "opcode {op}: {err:?}"
            );
        }
    }

    #[test]
    fn test_decode_truncated_mid_string() {
        let err = decode_frame(&[opcode::MESSAGE, 5, b'a', b'l']).unwrap_err();
        assert_eq!(
            err,
            FrameError::Truncated {
                opcode: Some(opcode::MESSAGE),
                needed: 3
            }
        );
    }

    #[test]
    fn test_decode_every_prefix_of_history() {
        let wire = Frame::History {
            entries: vec![HistoryEntry::new("alice", "hi"), HistoryEntry::new("bob", "yo")],
        }
        .encode()
        .unwrap();
        for cut in 0..wire.len() {
            assert!(matches!(
                decode_frame(&wire[..cut]),
                Err(FrameError::Truncated { .. })
            ));
        }
    }

    #[test]
    fn test_decode_list_count_larger_than_payload() {
        // Claims 255 users but carries one.
        let wire = [opcode::USER_LIST, 255, 1, b'a', 1];
        assert!(matches!(
            decode_frame(&wire),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_opcode() {
        assert_eq!(
            decode_frame(&[0x99, 1, 2, 3]).unwrap_err(),
            FrameError::UnknownOpcode(0x99)
        );
        assert_eq!(decode_frame(&[0]).unwrap_err(), FrameError::UnknownOpcode(0));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let wire = [opcode::USER_CONNECTED, 1, b'x', 0xFF, 0xFE];
        assert_eq!(
            decode_frame(&wire).unwrap(),
            Frame::UserConnected {
                username: "x".into()
            }
        );
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let wire = [opcode::USER_CONNECTED, 2, 0xC3, 0x28];
        match decode_frame(&wire).unwrap() {
            Frame::UserConnected { username } => assert!(username.contains('\u{FFFD}')),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn test_frame_json_shape() {
        let json = serde_json::to_value(Frame::Message {
            sender: "bob".into(),
            body: "yo".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["sender"], "bob");
    }
}
