//! Real-time endpoint URL construction

use url::Url;

use shared::FeedName;
use crate::error::{RealtimeError, RealtimeResult};

/// Rewrite an HTTP API origin into the socket URL for a feed:
/// `{ws|wss}://{host}/api/ws/{feed}[/{sub_resource}][?token=..]`
pub fn socket_url(
    api_base: &Url,
    feed: &FeedName,
    sub_resource: Option<&str>,
    token: Option<&str>,
) -> RealtimeResult<Url> {
    let scheme = match api_base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(RealtimeError::InvalidEndpoint {
                message: format!("unsupported scheme '{other}' in {api_base}"),
            });
        }
    };
    if api_base.host_str().is_none() {
        return Err(RealtimeError::InvalidEndpoint { message: format!("missing host in {api_base}") });
    }

    let mut url = api_base.clone();
    url.set_scheme(scheme).map_err(|_| RealtimeError::InvalidEndpoint {
        message: format!("cannot use scheme '{scheme}' for {api_base}"),
    })?;
    url.set_fragment(None);
    url.set_query(None);
    url.set_path("");

    {
        let mut segments = url.path_segments_mut().map_err(|_| RealtimeError::InvalidEndpoint {
            message: format!("{api_base} cannot be a base URL"),
        })?;
        segments.clear().extend(["api", "ws", feed.as_str()]);
        if let Some(sub) = sub_resource.filter(|s| !s.is_empty()) {
            segments.push(sub);
        }
    }

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        url.query_pairs_mut().append_pair("token", token);
    }

    Ok(url)
}
