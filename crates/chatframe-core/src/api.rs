//! Snapshot calls — `GET /state` (colour overrides) and `GET /hist` (history).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::display::DisplayOverrides;
use crate::error::{FeedError, FeedResult};
use crate::types::Message;

/// The request/response side of the feed. Object-safe so the client can hold
/// any implementation behind an `Arc`.
#[async_trait]
pub trait FeedApi: Send + Sync + 'static {
    /// Colour overrides from `/state`.
    async fn fetch_display(&self) -> FeedResult<DisplayOverrides>;

    /// Message history from `/hist`, oldest first.
    async fn fetch_history(&self) -> FeedResult<Vec<Message>>;
}

/// Resolved URLs of the three server endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub state: Url,
    pub hist: Url,
    pub ws: Url,
}

impl Endpoints {
    /// Resolve against a base such as `http://host:8080` or
    /// `https://host/frame/`. The push URL uses `wss` when the base is `https`.
    pub fn new(server_url: &str) -> FeedResult<Self> {
        let mut base =
            Url::parse(server_url).map_err(|e| FeedError::InvalidUrl(format!("{}: {}", server_url, e)))?;
        let ws_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(FeedError::InvalidUrl(format!("unsupported scheme '{}'", other))),
        };
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let join = |segment: &str| {
            base.join(segment)
                .map_err(|e| FeedError::InvalidUrl(format!("{}: {}", segment, e)))
        };

        let state = join("state")?;
        let hist = join("hist")?;
        let mut ws = join("ws")?;
        ws.set_scheme(ws_scheme)
            .map_err(|_| FeedError::InvalidUrl(format!("cannot use {} for {}", ws_scheme, ws)))?;

        Ok(Self { state, hist, ws })
    }
}

/// `FeedApi` over HTTP with reqwest.
pub struct HttpApi {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpApi {
    pub fn new(config: &Config) -> FeedResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoints: Endpoints::new(&config.server_url)?,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str, url: &Url) -> FeedResult<T> {
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status { path, status });
        }

        let body = response.bytes().await?;
        debug!("GET {} -> {} bytes", path, body.len());
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl FeedApi for HttpApi {
    async fn fetch_display(&self) -> FeedResult<DisplayOverrides> {
        let overrides: Option<DisplayOverrides> = self.get_json("/state", &self.endpoints.state).await?;
        Ok(overrides.unwrap_or_default())
    }

    async fn fetch_history(&self) -> FeedResult<Vec<Message>> {
        // An empty history may be encoded as `null`
        let history: Option<Vec<Message>> = self.get_json("/hist", &self.endpoints.hist).await?;
        Ok(history.unwrap_or_default())
    }
}
