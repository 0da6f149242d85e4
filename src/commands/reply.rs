//! Command replies.

use serde_json::json;

/// Who gets to see a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only the caller.
    Ephemeral,
    /// Everyone in the channel.
    Broadcast,
}

impl Visibility {
    /// Chat `response_type` value for this visibility.
    pub fn response_type(&self) -> &'static str {
        match self {
            Visibility::Ephemeral => "ephemeral",
            Visibility::Broadcast => "in_channel",
        }
    }
}

/// Text returned to the transport for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub visibility: Visibility,
}

impl Reply {
    /// Reply visible only to the caller.
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visibility: Visibility::Ephemeral,
        }
    }

    /// Reply visible to the whole channel.
    pub fn broadcast(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visibility: Visibility::Broadcast,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.visibility == Visibility::Broadcast
    }

    /// Chat webhook payload: `{"response_type": ..., "text": ...}`.
    pub fn to_json(&self) -> String {
        json!({
            "response_type": self.visibility.response_type(),
            "text": self.text,
        })
        .to_string()
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_visibility() {
        assert_eq!(Reply::ephemeral("x").visibility, Visibility::Ephemeral);
        assert!(Reply::broadcast("x").is_broadcast());
        assert!(!Reply::ephemeral("x").is_broadcast());
    }

    #[test]
    fn test_chat_payload() {
        let json: serde_json::Value =
            serde_json::from_str(&Reply::broadcast("Token t now held by bob.").to_json()).unwrap();
        assert_eq!(json["response_type"], "in_channel");
        assert_eq!(json["text"], "Token t now held by bob.");

        let json: serde_json::Value =
            serde_json::from_str(&Reply::ephemeral("nope").to_json()).unwrap();
        assert_eq!(json["response_type"], "ephemeral");
    }

    #[test]
    fn test_chat_payload_escapes_text() {
        let text = "Tokens (2):\n- \"a\": free to take\n- b\t\u{1}: held by <@U1>";
        let payload = Reply::ephemeral(text).to_json();

        assert!(!payload.is_empty());
        assert!(!payload.contains('\n'));
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(json["text"], text);
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_display_is_text() {
        assert_eq!(Reply::ephemeral("hello").to_string(), "hello");
    }
}
