//! Decides whether a chat message belongs in the active conversation.
//!
//! Inbound `Message` frames carry no recipient, so a live message in a
//! direct conversation is shown only when its sender is the peer on screen.

use crate::event::{ChatMessage, MessageKind, Origin, RenderedMessage};
use crate::state::BROADCAST;

/// Label shown for the local user's messages.
pub const SELF_LABEL: &str = "You";

/// Routing outcome for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Not part of the active conversation.
    Hidden,
    /// A server-originated notice (sender `"~"`).
    Notice(String),
    Shown(RenderedMessage),
}

/// Routing context: who we are and what is on screen.
#[derive(Debug, Clone, Copy)]
pub struct Router<'a> {
    local_username: &'a str,
    active_target: &'a str,
}

impl<'a> Router<'a> {
    pub fn new(local_username: &'a str, active_target: &'a str) -> Self {
        Self {
            local_username,
            active_target,
        }
    }

    pub fn route(&self, message: ChatMessage) -> Routed {
        if message.sender == BROADCAST {
            return Routed::Notice(message.body);
        }

        let visible = match message.origin {
            Origin::History => {
                message.requested_target.as_deref() == Some(self.active_target)
                    && (self.active_target == BROADCAST
                        || message.sender == self.active_target
                        || message.sender == self.local_username)
            }
            Origin::Live => {
                self.active_target == BROADCAST || message.sender == self.active_target
            }
        };

        if !visible {
            return Routed::Hidden;
        }
        Routed::Shown(self.render(message))
    }

    /// Render without visibility checks (used for the local echo).
    pub fn render(&self, message: ChatMessage) -> RenderedMessage {
        let own = message.sender == self.local_username;
        let kind = match (message.origin, own) {
            (Origin::History, _) => MessageKind::History,
            (Origin::Live, true) => MessageKind::Sent,
            (Origin::Live, false) => MessageKind::Received,
        };
        let label = if own {
            SELF_LABEL.to_string()
        } else {
            message.sender.clone()
        };
        RenderedMessage {
            sender: message.sender,
            body: message.body,
            origin: message.origin,
            kind,
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(routed: Routed) -> RenderedMessage {
        match routed {
            Routed::Shown(message) => message,
            other => panic!("expected a shown message, got {other:?}"),
        }
    }

    #[test]
    fn system_sender_is_a_notice_everywhere() {
        for active in ["~", "carol"] {
            let router = Router::new("alice", active);
            assert_eq!(
                router.route(ChatMessage::live("~", "server restarting")),
                Routed::Notice("server restarting".into())
            );
            assert_eq!(
                router.route(ChatMessage::history("~", "old notice", Some("elsewhere".into()))),
                Routed::Notice("old notice".into())
            );
        }
    }

    #[test]
    fn live_direct_shows_only_the_peer() {
        let router = Router::new("alice", "carol");
        assert_eq!(router.route(ChatMessage::live("dave", "psst")), Routed::Hidden);

        let message = shown(router.route(ChatMessage::live("carol", "hey")));
        assert_eq!(message.kind, MessageKind::Received);
        assert_eq!(message.label, "carol");
    }

    #[test]
    fn live_broadcast_shows_everyone() {
        let router = Router::new("alice", "~");
        let theirs = shown(router.route(ChatMessage::live("dave", "hola")));
        assert_eq!(theirs.label, "dave");

        let ours = shown(router.route(ChatMessage::live("alice", "hola")));
        assert_eq!(ours.label, SELF_LABEL);
        assert_eq!(ours.kind, MessageKind::Sent);
    }

    #[test]
    fn history_for_another_conversation_is_hidden() {
        let router = Router::new("alice", "carol");
        let stale = ChatMessage::history("bob", "late", Some("bob".into()));
        assert_eq!(router.route(stale), Routed::Hidden);
        assert_eq!(
            router.route(ChatMessage::history("carol", "unsolicited", None)),
            Routed::Hidden
        );
    }

    #[test]
    fn direct_history_keeps_both_participants_only() {
        let router = Router::new("alice", "carol");
        let target = Some("carol".to_string());

        let theirs = shown(router.route(ChatMessage::history("carol", "a", target.clone())));
        assert_eq!(theirs.kind, MessageKind::History);
        assert_eq!(theirs.label, "carol");

        let ours = shown(router.route(ChatMessage::history("alice", "b", target.clone())));
        assert_eq!(ours.kind, MessageKind::History);
        assert_eq!(ours.label, SELF_LABEL);

        assert_eq!(
            router.route(ChatMessage::history("dave", "c", target)),
            Routed::Hidden
        );
    }

    #[test]
    fn broadcast_history_shows_every_sender() {
        let router = Router::new("alice", "~");
        let target = Some("~".to_string());
        for sender in ["alice", "bob", "dave"] {
            let message = shown(router.route(ChatMessage::history(sender, "x", target.clone())));
            assert_eq!(message.origin, Origin::History);
        }
    }
}
