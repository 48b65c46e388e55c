//! HTTP transport used to reach Horizon.
use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, StatusCode};
use url::Url;

use crate::Result;

/// Header carrying the public key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response body text.
    pub body: String,
}

/// Sends JSON POST requests.
///
/// Implementations must read the whole response body before returning and should report
/// network failures as [`Error::Transport`](crate::Error::Transport). Non-2xx statuses are not
/// errors at this level.
pub trait Transport {
    /// POST `body` (already JSON-encoded) to `url` with `Content-Type: application/json` and
    /// the `x-api-key` header set to `api_key`.
    fn post(&self, url: &Url, api_key: &str, body: Vec<u8>) -> Result<TransportResponse>;
}

/// [`Transport`] backed by a blocking `reqwest` client.
pub struct ReqwestTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Create a transport applying `timeout` to every request.
    pub fn new(timeout: Option<Duration>) -> Result<ReqwestTransport> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hyphen-toggle-rust/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ReqwestTransport { client })
    }
}

impl Transport for ReqwestTransport {
    fn post(&self, url: &Url, api_key: &str, body: Vec<u8>) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, api_key)
            .body(body)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::{HashMap, VecDeque},
        io::{BufRead, BufReader, Read, Write},
        net::TcpListener,
        sync::{Arc, Mutex},
        thread::{self, JoinHandle},
        time::Duration,
    };

    use reqwest::StatusCode;
    use url::Url;

    use super::{ReqwestTransport, Transport, TransportResponse};
    use crate::{join_path, Error, Result};

    /// A request seen by [`FakeTransport`].
    #[derive(Debug, Clone)]
    pub(crate) struct Request {
        pub url: String,
        pub api_key: String,
        pub body: serde_json::Value,
    }

    /// Replays scripted responses in order and records every request.
    #[derive(Clone, Default)]
    pub(crate) struct FakeTransport {
        responses: Arc<Mutex<VecDeque<Result<TransportResponse>>>>,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl FakeTransport {
        pub fn respond(self, status: u16, body: &str) -> Self {
            self.responses.lock().unwrap().push_back(Ok(TransportResponse {
                status: StatusCode::from_u16(status).unwrap(),
                body: body.to_owned(),
            }));
            self
        }

        pub fn fail(self, message: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(Error::transport(message)));
            self
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests().into_iter().map(|r| r.url).collect()
        }
    }

    impl Transport for FakeTransport {
        fn post(&self, url: &Url, api_key: &str, body: Vec<u8>) -> Result<TransportResponse> {
            self.requests.lock().unwrap().push(Request {
                url: url.to_string(),
                api_key: api_key.to_owned(),
                body: serde_json::from_slice(&body).unwrap(),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::transport("no scripted response")))
        }
    }

    /// An HTTP request as received by [`serve_once`].
    #[derive(Debug)]
    pub(crate) struct ReceivedRequest {
        pub request_line: String,
        /// Header names are lowercased.
        pub headers: HashMap<String, String>,
        pub body: Vec<u8>,
    }

    /// Answer a single HTTP/1.1 request on a local port with `status` (e.g. `"200 OK"`) and
    /// `body`. Returns the base URL `http://127.0.0.1:<port>/api/` and a handle yielding the
    /// request.
    pub(crate) fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (Url, JoinHandle<ReceivedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = Url::parse(&format!("http://{}/api/", listener.local_addr().unwrap())).unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut headers = HashMap::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                let (name, value) = line.split_once(':').unwrap();
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
            }

            let length = headers
                .get("content-length")
                .map_or(0, |length| length.parse().unwrap());
            let mut request_body = vec![0; length];
            reader.read_exact(&mut request_body).unwrap();

            write!(
                stream,
                "HTTP/1.1 {status}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();

            ReceivedRequest {
                request_line: request_line.trim_end().to_owned(),
                headers,
                body: request_body,
            }
        });

        (base, handle)
    }

    #[test]
    fn reqwest_transport_sends_json_with_api_key() {
        let (base, server) = serve_once("200 OK", r#"{"toggles":{}}"#);
        let url = join_path(&base, "/toggle/evaluate").unwrap();
        let transport = ReqwestTransport::new(Some(Duration::from_secs(5))).unwrap();

        let response = transport
            .post(&url, "public-key", br#"{"targetingKey":"user-123"}"#.to_vec())
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, r#"{"toggles":{}}"#);

        let request = server.join().unwrap();
        assert_eq!(request.request_line, "POST /api/toggle/evaluate HTTP/1.1");
        assert_eq!(request.headers["content-type"], "application/json");
        assert_eq!(request.headers["x-api-key"], "public-key");
        assert!(request.headers["user-agent"].starts_with("hyphen-toggle-rust/"));
        assert_eq!(request.body, br#"{"targetingKey":"user-123"}"#);
    }

    #[test]
    fn reqwest_transport_reads_body_of_error_response() {
        let (base, server) = serve_once("500 Internal Server Error", "toggle store unavailable");
        let url = join_path(&base, "/toggle/telemetry").unwrap();
        let transport = ReqwestTransport::new(Some(Duration::from_secs(5))).unwrap();

        let response = transport.post(&url, "public-key", b"{}".to_vec()).unwrap();

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body, "toggle store unavailable");
        assert_eq!(
            server.join().unwrap().request_line,
            "POST /api/toggle/telemetry HTTP/1.1"
        );
    }

    #[test]
    fn reqwest_transport_reports_connection_errors() {
        let transport = ReqwestTransport::new(Some(Duration::from_secs(1))).unwrap();
        // Nothing listens on port 1.
        let url = Url::parse("http://127.0.0.1:1/toggle/evaluate").unwrap();

        let result = transport.post(&url, "key", b"{}".to_vec());

        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
