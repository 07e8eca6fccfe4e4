//! Chat endpoint URLs: `ws://host:port/?name=<username>`.

use url::Url;

use crate::error::{Result, TransportError};

/// Query parameter carrying the username.
pub const NAME_PARAM: &str = "name";

/// Build the endpoint URL for `host:port` and `username`.
pub fn chat_url(host: &str, port: u16, username: &str) -> Result<Url> {
    let host = host.trim();
    let base = if host.contains(':') && !host.starts_with('[') {
        format!("ws://[{host}]:{port}/")
    } else {
        format!("ws://{host}:{port}/")
    };
    with_username(&base, username)
}

/// Attach `username` to a full `ws://` or `wss://` base URL.
///
/// Any existing `name` parameter is replaced; other query parameters are kept.
pub fn with_username(base: &str, username: &str) -> Result<Url> {
    let mut url = Url::parse(base.trim()).map_err(|source| TransportError::InvalidUrl {
        url: base.to_string(),
        source,
    })?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => return Err(TransportError::UnsupportedScheme(other.to_string())),
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != NAME_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .append_pair(NAME_PARAM, username);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_of(url: &Url) -> Vec<String> {
        url.query_pairs()
            .filter(|(k, _)| k == NAME_PARAM)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    #[test]
    fn builds_ws_url_with_name() {
        let url = chat_url("127.0.0.1", 9000, "alice").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/?name=alice");
    }

    #[test]
    fn encodes_username() {
        let url = chat_url("localhost", 8080, "ana maría&co").unwrap();
        assert_eq!(name_of(&url), vec!["ana maría&co".to_string()]);
        assert!(url.as_str().starts_with("ws://localhost:8080/?name="));
    }

    #[test]
    fn brackets_ipv6_hosts() {
        let url = chat_url("::1", 9000, "bob").unwrap();
        assert_eq!(url.host_str(), Some("[::1]"));
        assert_eq!(url.port(), Some(9000));
    }

    #[test]
    fn replaces_existing_name() {
        let url = with_username("wss://chat.example/?room=7&name=old", "new").unwrap();
        assert_eq!(name_of(&url), vec!["new".to_string()]);
        assert!(url.query_pairs().any(|(k, v)| k == "room" && v == "7"));
    }

    #[test]
    fn rejects_non_websocket_scheme() {
        let err = with_username("http://chat.example/", "bob").unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme(s) if s == "http"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            with_username("not a url", "bob"),
            Err(TransportError::InvalidUrl { .. })
        ));
    }
}
