use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::transport::{join_url, Transport, TransportError};

/// HTTP transport against the deck service's base URL.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// `timeout` of `None` keeps reqwest's default (no overall timeout).
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::new(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Streams the file at `url` into `dest_dir`. Only the last component of
    /// `filename` is used, so a hostile name cannot escape the directory.
    pub async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, TransportError> {
        use futures_util::StreamExt;

        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| TransportError::new(format!("invalid file name: {filename}")))?;
        let dest = dest_dir.join(name);

        debug!(%url, dest = %dest.display(), "downloading export");
        let resp = self.http.get(url).send().await.map_err(TransportError::network)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, %url, "download failed");
            return Err(TransportError::from_status(status, &text));
        }

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| TransportError::new(format!("cannot create {}: {e}", dest_dir.display())))?;
        // Removed on drop unless persisted; `dest` only changes after a full write.
        let part = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(dest_dir)
            .map_err(|e| TransportError::new(format!("cannot create file in {}: {e}", dest_dir.display())))?;
        let handle = part
            .reopen()
            .map_err(|e| TransportError::new(format!("cannot open {}: {e}", part.path().display())))?;
        let mut file = tokio::fs::File::from_std(handle);

        let mut stream = Box::pin(resp.bytes_stream());
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| {
                warn!(%url, bytes = written, "download interrupted");
                TransportError::network(e)
            })?;
            written += bytes.len();
            file.write_all(&bytes)
                .await
                .map_err(|e| TransportError::new(format!("write failed: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| TransportError::new(format!("write failed: {e}")))?;
        drop(file);

        part.persist(&dest)
            .map_err(|e| TransportError::new(format!("cannot save {}: {}", dest.display(), e.error)))?;
        debug!(bytes = written, "download complete");
        Ok(dest)
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value, TransportError> {
        let status = resp.status();
        debug!(%status, "response received");

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let err = TransportError::from_status(status, &text);
            warn!(%status, error = %err, "request failed");
            return Err(err);
        }

        let text = resp.text().await.map_err(TransportError::network)?;
        serde_json::from_str(&text).map_err(TransportError::invalid_response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, endpoint: &str, payload: Value) -> Result<Value, TransportError> {
        let url = join_url(&self.base_url, endpoint);
        debug!(%url, "POST");
        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(TransportError::network)?;
        Self::read_json(resp).await
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, TransportError> {
        let url = join_url(&self.base_url, endpoint);
        debug!(%url, "GET");
        let resp = self
            .http
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(TransportError::network)?;
        Self::read_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;
    use std::thread::JoinHandle;

    struct Captured {
        method: String,
        url: String,
        content_type: Option<String>,
        body: String,
    }

    /// Answers exactly one request with `status` and `body`, then returns what it saw.
    fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = std::thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut received = String::new();
            request.as_reader().read_to_string(&mut received).unwrap();
            let content_type = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Content-Type"))
                .map(|h| h.value.as_str().to_string());
            let captured = Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                content_type,
                body: received,
            };
            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(header);
            request.respond(response).unwrap();
            captured
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_post_sends_json_and_decodes_body() {
        let (base, server) = serve_once(200, r#"{"title":"T","slides":[]}"#);
        let transport = HttpTransport::new(base, None).unwrap();

        let value = transport
            .post_json("/propose-outline", json!({"topic": "Rust"}))
            .await
            .unwrap();
        assert_eq!(value, json!({"title": "T", "slides": []}));

        let seen = server.join().unwrap();
        assert_eq!(seen.method, "POST");
        assert_eq!(seen.url, "/propose-outline");
        assert_eq!(seen.content_type.as_deref(), Some("application/json"));
        let sent: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(sent, json!({"topic": "Rust"}));
    }

    #[tokio::test]
    async fn test_non_success_uses_message_field() {
        let (base, server) = serve_once(429, r#"{"error":"too_many","message":"rate limited"}"#);
        let transport = HttpTransport::new(base, None).unwrap();

        let err = transport.post_json("/propose-outline", json!({})).await.unwrap_err();
        assert_eq!(err.message, "rate limited");
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_non_success_without_body_uses_status_line() {
        let (base, server) = serve_once(500, "");
        let transport = HttpTransport::new(base, None).unwrap();

        let err = transport.post_json("/generate-deck", json!({})).await.unwrap_err();
        assert_eq!(err.message, "API request failed: 500 Internal Server Error");
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_json_is_transport_error() {
        let (base, server) = serve_once(200, "{not json");
        let transport = HttpTransport::new(base, None).unwrap();

        let err = transport.post_json("/export-pptx", json!({})).await.unwrap_err();
        assert!(err.message.starts_with("Invalid response:"), "{}", err.message);
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = HttpTransport::new(format!("http://127.0.0.1:{port}"), None).unwrap();

        let err = transport.get_json("/health").await.unwrap_err();
        assert!(err.message.starts_with("Network error:"), "{}", err.message);
    }

    /// Promises `Content-Length: 1000`, sends `PARTIAL`, then hangs up.
    fn serve_truncated() -> (String, JoinHandle<()>) {
        use std::io::Write;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut byte = [0u8; 1];
            while !head.ends_with(b"\r\n\r\n") {
                if stream.read(&mut byte).unwrap() == 0 {
                    break;
                }
                head.push(byte[0]);
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nPARTIAL")
                .unwrap();
            stream.flush().unwrap();
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_no_file() {
        let (base, server) = serve_truncated();
        let transport = HttpTransport::new(base.clone(), None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("deck.pptx");
        std::fs::write(&dest, "EARLIER").unwrap();

        let url = join_url(&base, "/downloads/deck.pptx");
        let err = transport
            .download(&url, dir.path(), "deck.pptx")
            .await
            .unwrap_err();
        server.join().unwrap();

        assert!(err.message.starts_with("Network error:"), "{}", err.message);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "EARLIER");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("deck.pptx")]);
    }

    #[tokio::test]
    async fn test_download_writes_file_under_dest_dir() {
        let (base, server) = serve_once(200, "PPTXDATA");
        let transport = HttpTransport::new(base.clone(), None).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let url = join_url(&base, "/downloads/deck.pptx");
        let path = transport
            .download(&url, dir.path(), "../../etc/deck.pptx")
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("deck.pptx"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "PPTXDATA");
        let seen = server.join().unwrap();
        assert_eq!(seen.method, "GET");
        assert_eq!(seen.url, "/downloads/deck.pptx");
    }
}
