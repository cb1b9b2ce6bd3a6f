//! [`Client`] for the Replicate predictions API and related types.

use std::{sync::Arc, time::Duration};

use eventsource_stream::Eventsource;
use serde::{Deserialize, Serialize};

use crate::{
    key,
    prompt::{Input, PromptRequest},
    stream::FilterExt,
    Key, Model,
};

/// Result type for the client. See also [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Client for the Replicate predictions API.
///
/// See [`Self::new`] for creating a new client and [`Self::stream`] and
/// [`Self::complete`] to get started.
#[derive(Clone)]
pub struct Client {
    /// Inner [`reqwest::Client`].
    ///
    /// ## Note:
    /// - The API [`Key`] is **set automatically on requests**. Set
    ///   [`Self::key`] to change the [`Key`].
    /// - **Do not use** `client.inner.get` directly. Use [`Self::request_raw`]
    ///   instead to safely set the API [`Key`] as sensitive.
    pub inner: reqwest::Client,
    /// API [`Key`]. It can be set to a new [`Key`] to change the key used for
    /// requests.
    pub key: Arc<Key>,
    /// Base URL of the API, without a trailing slash.
    pub base_url: String,
}

impl Client {
    /// Our user agent.
    pub const USER_AGENT: &'static str =
        concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
    /// Default base URL for the API.
    pub const DEFAULT_URL: &'static str = "https://api.replicate.com/v1";

    /// Create a new client from any type that can be converted into a [`Key`].
    pub fn new<K>(key: K) -> Result<Self>
    where
        K: TryInto<Key, Error = key::MissingKey>,
    {
        Self::from_key(key.try_into()?, None)
    }

    /// Create a new client with the given key. `connect_timeout` bounds
    /// connection setup only. Streams are read until the prediction is done.
    pub fn from_key(key: Key, connect_timeout: Option<Duration>) -> Result<Self> {
        #[cfg(feature = "log")]
        {
            log::info!(concat!(
                "Creating ",
                env!("CARGO_PKG_NAME"),
                " client..."
            ));
            log::debug!(concat!("Crate version: ", env!("CARGO_PKG_VERSION")));
        }

        let mut headers = reqwest::header::HeaderMap::new();

        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(Self::USER_AGENT);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            inner: builder.build()?,
            key: Arc::new(key),
            base_url: Self::DEFAULT_URL.to_string(),
        })
    }

    /// Use a different base URL, for example a proxy or a test server.
    pub fn with_base_url<S>(mut self, url: S) -> Self
    where
        S: Into<String>,
    {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create a [`reqwest::RequestBuilder`] with the API key set as a sensitive
    /// bearer token.
    pub fn request_raw<U>(
        &self,
        method: reqwest::Method,
        url: U,
    ) -> reqwest::RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        #[cfg(feature = "log")]
        {
            log::debug!("{} request to {}", method, url.as_str());
        }

        // `bearer_auth` marks the header as sensitive.
        self.inner.request(method, url).bearer_auth(self.key.read())
    }

    /// Create a prediction for an official `model` with streaming enabled.
    pub async fn predict(&self, model: &Model, input: &Input) -> Result<Prediction> {
        let url = format!(
            "{}/models/{}/{}/predictions",
            self.base_url,
            model.owner(),
            model.name()
        );
        let body = PredictionRequest {
            input,
            stream: true,
        };

        #[cfg(feature = "log")]
        {
            if let Ok(json) = serde_json::to_string_pretty(&body) {
                log::debug!("Sending body:\n{}", json);
            } else {
                log::warn!("Could not serialize body. Request will fail.");
            }
        }

        let response = self
            .request_raw(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await.into());
        }

        let prediction: Prediction = response.json().await?;

        #[cfg(feature = "log")]
        log::debug!(
            "Prediction {} created with status `{}`",
            prediction.id,
            prediction.status
        );

        Ok(prediction)
    }

    /// Create a prediction and open its event stream.
    pub async fn stream(&self, model: &Model, input: &Input) -> Result<crate::Stream> {
        let prediction = self.predict(model, input).await?;
        let url = prediction.urls.stream.ok_or(Error::UnexpectedResponse {
            message: "Prediction has no stream URL.",
        })?;

        let response = self
            .request_raw(reqwest::Method::GET, url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await.into());
        }

        Ok(crate::Stream::new(response.bytes_stream().eventsource()))
    }

    /// Stream a completion for `request` and concatenate the output.
    pub async fn complete(
        &self,
        model: &Model,
        request: &PromptRequest,
    ) -> Result<String> {
        let text = self
            .stream(model, &request.input())
            .await?
            .collect_text()
            .await?;

        #[cfg(feature = "log")]
        log::debug!("Received {} bytes of output", text.len());

        Ok(text)
    }
}

/// Turn a non-success response into a [`ReplicateError`]. Bodies that are not
/// JSON are kept verbatim as the detail.
async fn api_error(response: reqwest::Response) -> ReplicateError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let mut error = serde_json::from_str::<ReplicateError>(&body)
        .unwrap_or_else(|_| ReplicateError {
            title: None,
            detail: body,
            status: None,
        });
    if error.status.is_none() {
        error.status = Some(status);
    }

    #[cfg(feature = "log")]
    log::error!("API error: {}", error);

    error
}

#[derive(Serialize)]
struct PredictionRequest<'a> {
    input: &'a Input,
    stream: bool,
}

/// A prediction as returned on creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    /// Prediction id.
    pub id: String,
    /// `starting`, `processing`, `succeeded`, `failed` or `canceled`.
    pub status: String,
    /// Related URLs.
    #[serde(default)]
    pub urls: Urls,
}

/// URLs attached to a [`Prediction`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Urls {
    /// Poll the prediction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    /// Cancel the prediction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,
    /// Server-sent event stream of the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
}

/// [`Client`] error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API key is absent.
    #[error(transparent)]
    Key(#[from] key::MissingKey),
    /// HTTP error.
    #[error("HTTP error: {0}")]
    HTTP(#[from] reqwest::Error),
    /// Data could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Replicate error.
    #[error("Replicate error: {0}")]
    Replicate(#[from] ReplicateError),
    /// Error while reading the event stream.
    #[error(transparent)]
    Stream(#[from] crate::stream::Error),
    /// Unexpected response from the API.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// What was wrong with it.
        message: &'static str,
    },
}

/// Replicate error body (`application/problem+json`) or the payload of an
/// `error` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicateError {
    /// Short summary, such as `Unauthenticated`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Human readable explanation.
    #[serde(default)]
    pub detail: String,
    /// HTTP status code, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl std::fmt::Display for ReplicateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(status) = self.status {
            write!(f, "({}) ", status)?;
        }
        match &self.title {
            Some(title) => write!(f, "{}: {}", title, self.detail),
            None => write!(f, "{}", self.detail),
        }
    }
}

impl std::error::Error for ReplicateError {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::prompt::Variant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Not a real token.
    const FAKE_API_KEY: &str = "r8_0000000000000000000000000000000000000";

    #[test]
    fn test_replicate_error_deserialize() {
        let error: ReplicateError = serde_json::from_str(
            r#"{"title":"Unauthenticated","detail":"You did not pass an authentication token","status":401}"#,
        )
        .unwrap();
        assert_eq!(
            error,
            ReplicateError {
                title: Some("Unauthenticated".into()),
                detail: "You did not pass an authentication token".into(),
                status: Some(401),
            }
        );
        assert_eq!(
            error.to_string(),
            "(401) Unauthenticated: You did not pass an authentication token"
        );

        let error: ReplicateError =
            serde_json::from_str(r#"{"detail":"Not found."}"#).unwrap();
        assert_eq!(error.to_string(), "Not found.");
    }

    #[test]
    fn test_prediction_deserialize() {
        let prediction: Prediction = serde_json::from_str(
            r#"{
  "id": "gm3qorzdhgbfurvjtvhg6dckhu",
  "model": "snowflake/snowflake-arctic-instruct",
  "version": "dp-4b8f0ac7c3ad4b7ab0e5a1f2a0b7c6d1",
  "input": {"prompt": "hi"},
  "logs": "",
  "error": null,
  "status": "starting",
  "created_at": "2024-05-01T00:00:00.000Z",
  "urls": {
    "cancel": "https://api.replicate.com/v1/predictions/gm3qorzdhgbfurvjtvhg6dckhu/cancel",
    "get": "https://api.replicate.com/v1/predictions/gm3qorzdhgbfurvjtvhg6dckhu",
    "stream": "https://streaming-api.svc.us.c.replicate.net/v1/streams/abc"
  }
}"#,
        )
        .unwrap();

        assert_eq!(prediction.id, "gm3qorzdhgbfurvjtvhg6dckhu");
        assert_eq!(prediction.status, "starting");
        assert_eq!(
            prediction.urls.stream.as_deref(),
            Some("https://streaming-api.svc.us.c.replicate.net/v1/streams/abc")
        );
    }

    #[test]
    fn test_client_new() {
        let client = Client::new(FAKE_API_KEY.to_string()).unwrap();
        assert_eq!(client.key.to_string(), FAKE_API_KEY);
        assert_eq!(client.base_url, Client::DEFAULT_URL);

        let client = client.with_base_url("http://localhost:1234/v1/");
        assert_eq!(client.base_url, "http://localhost:1234/v1");

        assert!(matches!(
            Client::new(String::new()),
            Err(Error::Key(key::MissingKey { .. }))
        ));
    }

    /// Read one HTTP/1.1 request (headers and `Content-Length` body).
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Serve one canned response per connection and hand back the requests.
    pub(crate) fn serve(
        listener: tokio::net::TcpListener,
        responses: Vec<String>,
    ) -> tokio::task::JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        })
    }

    pub(crate) fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn test_client_complete_local() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let prediction = format!(
            r#"{{"id":"p1","status":"starting","urls":{{"stream":"{base}/streams/p1"}}}}"#
        );
        let events = "event: output\ndata: {\"Primary_Color\":\n\nevent: output\ndata:  \"#000000\"}\n\nevent: done\ndata: {}\n\n";

        let server = serve(
            listener,
            vec![
                http_response("201 Created", "application/json", &prediction),
                http_response("200 OK", "text/event-stream", events),
            ],
        );

        let client = Client::new(FAKE_API_KEY.to_string())
            .unwrap()
            .with_base_url(base.clone());
        let request = PromptRequest {
            variant: Variant::Palette,
            text: "cats".into(),
        };
        let text = client.complete(&Model::default(), &request).await.unwrap();
        assert_eq!(text, "{\"Primary_Color\": \"#000000\"}");

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with(
            "POST /models/snowflake/snowflake-arctic-instruct/predictions"
        ));
        assert!(requests[0]
            .to_ascii_lowercase()
            .contains(&format!("authorization: bearer {}", FAKE_API_KEY).to_ascii_lowercase()));
        assert!(requests[0].contains("\"stream\":true"));
        assert!(requests[0].contains("\"prompt\":\"cats\""));
        assert!(requests[1].starts_with("GET /streams/p1"));
    }

    #[tokio::test]
    async fn test_client_api_error_local() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let server = serve(
            listener,
            vec![http_response(
                "401 Unauthorized",
                "application/problem+json",
                r#"{"title":"Unauthenticated","detail":"Invalid token."}"#,
            )],
        );

        let client = Client::new(FAKE_API_KEY.to_string())
            .unwrap()
            .with_base_url(base);
        let request = PromptRequest {
            variant: Variant::Idea,
            text: "cats".into(),
        };
        let err = client
            .complete(&Model::default(), &request)
            .await
            .unwrap_err();

        match err {
            Error::Replicate(error) => {
                assert_eq!(error.status, Some(401));
                assert_eq!(error.title.as_deref(), Some("Unauthenticated"));
            }
            other => panic!("Unexpected error: {:?}", other),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    #[ignore = "This test requires a real API key."]
    async fn test_client_complete() {
        let key = Key::from_env(key::ENV_VAR).unwrap();
        let client = Client::from_key(key, None).unwrap();

        let request = PromptRequest {
            variant: Variant::Palette,
            text: "a calendar for beekeepers".into(),
        };
        let text = client.complete(&Model::default(), &request).await.unwrap();
        assert!(!text.is_empty());
    }
}
