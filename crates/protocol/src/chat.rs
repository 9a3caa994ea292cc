//! Chat message payloads and the URL-classification heuristic.
//!
//! Classification is a best-effort heuristic and lives here as a single
//! pure predicate so the send and receive paths can never disagree.

use serde::{Deserialize, Serialize};

/// Which peer produced a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
}

/// Chat entry classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Text,
    Url,
}

/// The JSON body of a `MSG:` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub kind: ChatKind,
    pub text: String,
}

/// Classifies trimmed text as a URL or plain text.
///
/// Text counts as a URL when it parses as an absolute URL or begins with a
/// bare `www.` host.
pub fn classify(text: &str) -> ChatKind {
    let t = text.trim();
    if t.is_empty() {
        return ChatKind::Text;
    }
    if url::Url::parse(t).is_ok() {
        return ChatKind::Url;
    }
    if looks_like_www(t) {
        return ChatKind::Url;
    }
    ChatKind::Text
}

/// Re-derives the kind of a received message.
///
/// The declared kind is a hint: a declared `url` is kept, a declared `text`
/// is upgraded when the text itself is URL-like.
pub fn effective_kind(declared: ChatKind, text: &str) -> ChatKind {
    match declared {
        ChatKind::Url => ChatKind::Url,
        ChatKind::Text => classify(text),
    }
}

/// Makes a classified URL navigable: bare `www.` hosts get an `https://`
/// scheme, everything else is returned unchanged.
pub fn normalize_url(text: &str) -> String {
    let t = text.trim();
    let lower = t.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return t.to_string();
    }
    if looks_like_www(t) {
        return format!("https://{t}");
    }
    t.to_string()
}

fn looks_like_www(t: &str) -> bool {
    let lower = t.to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.chars().next().is_some_and(|c| !c.is_whitespace()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_text() {
        assert_eq!(classify("hello"), ChatKind::Text);
        assert_eq!(classify("hello world"), ChatKind::Text);
        assert_eq!(classify(""), ChatKind::Text);
        assert_eq!(classify("   "), ChatKind::Text);
    }

    #[test]
    fn absolute_urls_are_urls() {
        assert_eq!(classify("https://example.com"), ChatKind::Url);
        assert_eq!(classify("http://example.com/path?q=1"), ChatKind::Url);
        assert_eq!(classify("  https://example.com  "), ChatKind::Url);
    }

    #[test]
    fn bare_www_hosts_are_urls() {
        assert_eq!(classify("www.example.com"), ChatKind::Url);
        assert_eq!(classify("WWW.EXAMPLE.COM"), ChatKind::Url);
        assert_eq!(classify("www."), ChatKind::Text);
    }

    #[test]
    fn effective_kind_trusts_declared_url() {
        assert_eq!(effective_kind(ChatKind::Url, "not a url"), ChatKind::Url);
    }

    #[test]
    fn effective_kind_upgrades_declared_text() {
        assert_eq!(
            effective_kind(ChatKind::Text, "www.example.com"),
            ChatKind::Url
        );
        assert_eq!(effective_kind(ChatKind::Text, "hello"), ChatKind::Text);
    }

    #[test]
    fn normalize_keeps_schemes() {
        assert_eq!(normalize_url("https://a.example"), "https://a.example");
        assert_eq!(normalize_url("http://a.example"), "http://a.example");
    }

    #[test]
    fn normalize_adds_scheme_to_www() {
        assert_eq!(normalize_url("www.example.com"), "https://www.example.com");
    }

    #[test]
    fn normalize_leaves_plain_text_alone() {
        assert_eq!(normalize_url("hello"), "hello");
    }

    #[test]
    fn chat_payload_json_shape() {
        let p = ChatPayload {
            kind: ChatKind::Url,
            text: "www.example.com".into(),
        };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "{\"kind\":\"url\",\"text\":\"www.example.com\"}");
    }
}
