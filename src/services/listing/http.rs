//! Directory lister backed by the Crater storage HTTP API
//!
//! Listings come from `GET {base}/ss/files/{path}` (or the `rwfiles` / admin
//! variants) wrapped in the usual `{code, data, msg}` envelope. ureq is a
//! blocking client, so each request runs on tokio's blocking pool.

use super::backend::{DirectoryLister, FileEntry, ListingScope};
use async_trait::async_trait;
use serde::Deserialize;
use std::io;
use std::time::Duration;
use url::Url;

/// Response envelope shared by every Crater API endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    code: i64,
    data: Option<T>,
    #[serde(default)]
    msg: String,
}

pub struct HttpLister {
    agent: ureq::Agent,
    base_url: Url,
    scope: ListingScope,
    token: Option<String>,
}

impl std::fmt::Debug for HttpLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLister")
            .field("base_url", &self.base_url.as_str())
            .field("scope", &self.scope)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpLister {
    /// Create a lister for the API rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `base_url` is not an absolute http(s) URL.
    pub fn new(
        base_url: &str,
        scope: ListingScope,
        token: Option<String>,
        timeout: Duration,
    ) -> io::Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid API base URL {base_url:?}: {e}"),
            )
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("API base URL must be http(s): {base_url}"),
            ));
        }

        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Ok(Self {
            agent,
            base_url,
            scope,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn scope(&self) -> ListingScope {
        self.scope
    }

    /// Full URL of the listing endpoint for `path`
    ///
    /// A leading `/` is ignored and every segment is percent-encoded. The empty
    /// path ends with a trailing slash, which is what the server routes to the
    /// top-level listing.
    pub fn endpoint(&self, path: &str) -> io::Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "API base URL cannot be a base")
            })?;
            segments.pop_if_empty();
            segments.extend(self.scope.route_segments());

            let path = path.trim_start_matches('/');
            if path.is_empty() {
                segments.push("");
            } else {
                segments.extend(path.split('/'));
            }
        }
        Ok(url)
    }

    fn fetch_blocking(
        agent: &ureq::Agent,
        url: &Url,
        token: Option<&str>,
    ) -> io::Result<Vec<FileEntry>> {
        let mut request = agent
            .get(url.as_str())
            .set("Content-Type", "application/json");
        if let Some(token) = token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        match request.call() {
            Ok(response) => {
                let body = response.into_string()?;
                decode_listing(&body)
            }
            Err(ureq::Error::Status(status, response)) => {
                let detail = response
                    .into_string()
                    .ok()
                    .and_then(|body| serde_json::from_str::<ApiResponse<serde_json::Value>>(&body).ok())
                    .map(|envelope| envelope.msg)
                    .filter(|msg| !msg.is_empty())
                    .unwrap_or_else(|| "no details".to_string());
                Err(io::Error::new(
                    status_error_kind(status),
                    format!("GET {url} returned HTTP {status}: {detail}"),
                ))
            }
            Err(ureq::Error::Transport(transport)) => {
                let kind = std::error::Error::source(&transport)
                    .and_then(|source| source.downcast_ref::<io::Error>())
                    .map(|e| e.kind())
                    .unwrap_or(io::ErrorKind::Other);
                Err(io::Error::new(kind, format!("GET {url} failed: {transport}")))
            }
        }
    }
}

/// Decode a listing body; `null` data is an empty directory
fn decode_listing(body: &str) -> io::Result<Vec<FileEntry>> {
    let envelope: ApiResponse<Vec<FileEntry>> = serde_json::from_str(body).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed listing response: {e}"),
        )
    })?;
    tracing::trace!(code = envelope.code, msg = %envelope.msg, "listing envelope");
    Ok(envelope.data.unwrap_or_default())
}

fn status_error_kind(status: u16) -> io::ErrorKind {
    match status {
        401 | 403 => io::ErrorKind::PermissionDenied,
        404 => io::ErrorKind::NotFound,
        408 | 504 => io::ErrorKind::TimedOut,
        _ => io::ErrorKind::Other,
    }
}

#[async_trait]
impl DirectoryLister for HttpLister {
    async fn list_directory(&self, path: &str) -> io::Result<Vec<FileEntry>> {
        let url = self.endpoint(path)?;
        let agent = self.agent.clone();
        let token = self.token.clone();

        tracing::debug!("listing {:?} via {}", path, url);
        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &url, token.as_deref()))
            .await
            .map_err(io::Error::other)?
    }
}
