//! Elasticsearch document sink
//!
//! Each message becomes one document in a single index:
//! `PUT {url}/{index}/_doc/{document_id}?refresh=true` with the message's
//! JSON form as the body. `connect` makes sure the index exists.
//!
//! Delivery is at-most-once: a rejected or timed-out request is reported to
//! the caller and never retried here.

use crate::{send_context, ConnectionState, MessageSink, SendCounters, SinkError, SinkMetadata};
use async_trait::async_trait;
use codec::GenericMessage;
use reqwest::{StatusCode, Url};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const INDEX_EXISTS: &str = "resource_already_exists_exception";

#[derive(Debug)]
pub struct ElasticsearchSink {
    client: reqwest::Client,
    base_url: Url,
    index: String,
    request_timeout: Duration,
    connected: AtomicBool,
    counters: SendCounters,
}

impl ElasticsearchSink {
    /// Create a sink for `index` on the cluster at `base_url`
    pub fn new(
        base_url: &str,
        index: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, SinkError> {
        let index = index.into();
        if index.is_empty() {
            return Err(SinkError::invalid_config("index name cannot be empty"));
        }

        let base_url = Url::parse(base_url)
            .map_err(|e| SinkError::invalid_config(format!("bad URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SinkError::invalid_config(format!(
                "'{}' cannot be used as a base URL",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SinkError::invalid_config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            index,
            request_timeout,
            connected: AtomicBool::new(false),
            counters: SendCounters::default(),
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, SinkError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SinkError::invalid_config("URL has no path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Target URL for a document, with the id escaped as one path segment
    pub fn document_url(&self, document_id: &str) -> Result<Url, SinkError> {
        let mut url = self.url_for(&[&self.index, "_doc", document_id])?;
        url.query_pairs_mut().append_pair("refresh", "true");
        Ok(url)
    }

    async fn ensure_index(&self) -> Result<(), SinkError> {
        let url = self.url_for(&[&self.index])?;
        let resp = self
            .client
            .put(url.clone())
            .send()
            .await
            .map_err(|e| SinkError::connection_failed(format!("PUT {}: {}", url, e)))?;

        let status = resp.status();
        if status.is_success() {
            info!(index = %self.index, "created index");
            return Ok(());
        }

        let message = resp.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && message.contains(INDEX_EXISTS) {
            debug!(index = %self.index, "index already exists");
            return Ok(());
        }

        Err(SinkError::connection_failed(format!(
            "index creation returned {}: {}",
            status, message
        )))
    }

    fn fail(&self, err: SinkError) -> Result<(), SinkError> {
        self.counters.record_failure(&err);
        Err(err)
    }
}

#[async_trait]
impl MessageSink for ElasticsearchSink {
    async fn send(&self, message: &GenericMessage) -> Result<(), SinkError> {
        if !self.is_connected() {
            return self.fail(SinkError::NotConnected);
        }

        let context = send_context(message);
        let url = match self.document_url(&context.document_id) {
            Ok(url) => url,
            Err(e) => return self.fail(e),
        };

        let resp = match self.client.put(url).json(message).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return self.fail(SinkError::Timeout(self.request_timeout.as_millis() as u64))
            }
            Err(e) => return self.fail(SinkError::send_failed(e.to_string(), context)),
        };

        let status = resp.status();
        if status.is_success() {
            debug!(id = %context.document_id, origin = %context.origin, %status, "document indexed");
            self.counters.record_success();
            return Ok(());
        }

        let message = resp.text().await.unwrap_or_default();
        self.fail(SinkError::Rejected {
            status: status.as_u16(),
            message,
            context,
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn connect(&self) -> Result<(), SinkError> {
        if self.is_connected() {
            return Ok(());
        }
        self.ensure_index().await?;
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SinkError> {
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn metadata(&self) -> SinkMetadata {
        let state = if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.counters.fill(
            SinkMetadata::new(format!("elasticsearch-{}", self.index), "elasticsearch")
                .with_endpoint(self.base_url.as_str())
                .with_state(state),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_message, sample_message_at};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn sink_for(server: &Server) -> ElasticsearchSink {
        ElasticsearchSink::new(&server.url(), "wok_messages", Duration::from_secs(5))
            .expect("create sink")
    }

    #[tokio::test]
    async fn connect_creates_index() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/wok_messages")
            .with_status(200)
            .with_body(r#"{"acknowledged":true}"#)
            .create_async()
            .await;

        let sink = sink_for(&server);
        sink.connect().await.expect("connect");
        assert!(sink.is_connected());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connect_tolerates_existing_index() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/wok_messages")
            .with_status(400)
            .with_body(r#"{"error":{"type":"resource_already_exists_exception"},"status":400}"#)
            .create_async()
            .await;

        let sink = sink_for(&server);
        sink.connect().await.expect("connect");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connect_fails_on_server_error() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/wok_messages")
            .with_status(503)
            .with_body("cluster unavailable")
            .create_async()
            .await;

        let sink = sink_for(&server);
        let err = sink.connect().await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(!sink.is_connected());
    }

    #[tokio::test]
    async fn send_indexes_document_by_id() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/wok_messages")
            .with_status(200)
            .create_async()
            .await;
        let doc = server
            .mock("PUT", "/wok_messages/_doc/abc-1")
            .match_query(Matcher::UrlEncoded("refresh".into(), "true".into()))
            .match_body(Matcher::PartialJson(json!({
                "id": "abc-1",
                "sender": "test",
                "body": "hello",
            })))
            .with_status(201)
            .create_async()
            .await;

        let sink = sink_for(&server);
        sink.connect().await.unwrap();
        sink.send(&sample_message("abc-1", "hello")).await.expect("send");

        doc.assert_async().await;
        assert_eq!(sink.metadata().messages_sent, 1);
    }

    #[tokio::test]
    async fn send_without_id_uses_stream_position() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/wok_messages")
            .with_status(200)
            .create_async()
            .await;
        let doc = server
            .mock("PUT", "/wok_messages/_doc/3-7")
            .with_status(201)
            .create_async()
            .await;

        let sink = sink_for(&server);
        sink.connect().await.unwrap();
        sink.send(&sample_message_at("", "x", 3, 7)).await.unwrap();
        doc.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_document_reports_status() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/wok_messages")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("PUT", "/wok_messages/_doc/bad")
            .with_status(400)
            .with_body("mapper_parsing_exception")
            .create_async()
            .await;

        let sink = sink_for(&server);
        sink.connect().await.unwrap();
        match sink.send(&sample_message("bad", "x")).await {
            Err(SinkError::Rejected {
                status, message, ..
            }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "mapper_parsing_exception");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(sink.metadata().messages_failed, 1);
    }

    #[tokio::test]
    async fn send_before_connect_fails() {
        let sink =
            ElasticsearchSink::new("http://localhost:9200", "idx", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            sink.send(&sample_message("a", "b")).await,
            Err(SinkError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn unusable_document_url_counts_as_failure() {
        let mut sink =
            ElasticsearchSink::new("http://localhost:9200", "idx", Duration::from_secs(1)).unwrap();
        sink.base_url = Url::parse("mailto:ops@example.com").unwrap();
        sink.connected.store(true, Ordering::Relaxed);

        let err = sink.send(&sample_message("a", "b")).await.unwrap_err();
        assert!(matches!(err, SinkError::InvalidConfig(_)));

        let metadata = sink.metadata();
        assert_eq!(metadata.messages_failed, 1);
        assert!(metadata.last_error.is_some());
    }

    #[test]
    fn document_url_escapes_id() {
        let sink =
            ElasticsearchSink::new("http://localhost:9200", "wok_messages", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            sink.document_url("a/b").unwrap().as_str(),
            "http://localhost:9200/wok_messages/_doc/a%2Fb?refresh=true"
        );
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(ElasticsearchSink::new("not a url", "idx", Duration::from_secs(1)).is_err());
        assert!(ElasticsearchSink::new("http://localhost:9200", "", Duration::from_secs(1)).is_err());
        assert!(ElasticsearchSink::new("mailto:ops@example.com", "idx", Duration::from_secs(1)).is_err());
    }
}
