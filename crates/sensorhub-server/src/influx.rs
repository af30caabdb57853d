//! InfluxDB v2 sink.
//!
//! Each record becomes one line-protocol point POSTed to `/api/v2/write`
//! with nanosecond precision. Writes are not batched or retried.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::trace;

use sensorhub_core::record::{SinkFields, SinkTags};
use sensorhub_core::InfluxSettings;
use sensorhub_protocol::LineProtocolWriter;

use crate::pipeline::{SinkError, TimeSeriesSink};

pub struct InfluxSink {
    client: reqwest::Client,
    endpoint: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxSink {
    pub fn new(settings: &InfluxSettings) -> Self {
        Self::with_client(settings, reqwest::Client::new())
    }

    pub fn with_client(settings: &InfluxSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/v2/write", settings.url.trim_end_matches('/')),
            org: settings.org.clone(),
            bucket: settings.bucket.clone(),
            token: settings.token.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TimeSeriesSink for InfluxSink {
    async fn write(
        &self,
        measurement: &str,
        tags: &SinkTags,
        fields: &SinkFields,
        timestamp: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        let mut writer = LineProtocolWriter::new();
        writer.write_point(measurement, tags, fields, timestamp)?;
        let body = writer.flush();
        trace!("Writing point: {}", body);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sensorhub_core::FieldValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn settings(url: String) -> InfluxSettings {
        InfluxSettings {
            url,
            org: "boat".to_string(),
            bucket: "sensors".to_string(),
            token: "tkn".to_string(),
        }
    }

    fn sink(url: String) -> InfluxSink {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        InfluxSink::with_client(&settings(url), client)
    }

    /// Accept one request, answer with `status_line`, return what was sent.
    async fn serve_once(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "{}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status_line
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    fn point() -> (SinkTags, SinkFields) {
        let mut tags = SinkTags::new();
        tags.insert("Source".to_string(), "Main GPS".to_string());
        let mut fields = SinkFields::new();
        fields.insert("HeadingTrue".to_string(), FieldValue::Float(180.0));
        (tags, fields)
    }

    #[test]
    fn test_endpoint() {
        let sink = InfluxSink::new(&settings("http://influx:8086/".to_string()));
        assert_eq!(sink.endpoint(), "http://influx:8086/api/v2/write");
    }

    #[tokio::test]
    async fn test_write_posts_line_protocol() {
        let (url, server) = serve_once("HTTP/1.1 204 No Content").await;
        let (tags, fields) = point();
        let ts = Utc.timestamp_opt(1, 0).unwrap();

        sink(url).write("navigation", &tags, &fields, ts).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/v2/write?org=boat&bucket=sensors&precision=ns "));
        assert!(request.to_lowercase().contains("authorization: token tkn"));
        assert!(request.ends_with("navigation,Source=Main\\ GPS HeadingTrue=180 1000000000"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (url, server) = serve_once("HTTP/1.1 401 Unauthorized").await;
        let (tags, fields) = point();

        let err = sink(url)
            .write("navigation", &tags, &fields, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Status { status: 401, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_fields_never_hits_the_network() {
        let sink = sink("http://127.0.0.1:9".to_string());
        let err = sink
            .write("wind", &SinkTags::new(), &SinkFields::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::NoFields));
    }
}
