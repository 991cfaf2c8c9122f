//! arXiv检索后端（Atom API）

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

use super::search::{PaperRecord, SearchBackend, SearchResponse};

pub const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";

#[derive(Clone)]
pub struct ArxivClient {
    http: Client,
    base: String,
    max_results: usize,
}

impl ArxivClient {
    pub fn new(max_results: usize, timeout: Duration) -> Result<Self> {
        Self::with_base(ARXIV_API_BASE, max_results, timeout)
    }

    pub fn with_base(base: &str, max_results: usize, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("deepresearch-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build arXiv HTTP client")?;
        Ok(Self {
            http,
            base: base.to_string(),
            max_results: max_results.max(1),
        })
    }

    /// 多个关键词用AND连接，对应arXiv的all:字段检索
    fn build_query(query: &str) -> String {
        let tokens: Vec<String> = query
            .split_whitespace()
            .map(|token| format!("all:{}", token))
            .collect();
        if tokens.is_empty() {
            "all:*".to_string()
        } else {
            tokens.join(" AND ")
        }
    }
}

#[async_trait]
impl SearchBackend for ArxivClient {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let search_query = Self::build_query(query);
        let resp = self
            .http
            .get(&self.base)
            .query(&[("search_query", search_query.as_str())])
            .query(&[("start", 0), ("max_results", self.max_results)])
            .query(&[("sortBy", "relevance")])
            .header(ACCEPT, "application/atom+xml, application/xml;q=0.9")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("arXiv API error: HTTP {}", status));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.text().await?;

        if !(content_type.contains("xml") || content_type.contains("atom")) {
            tracing::warn!("arXiv returned unexpected content-type `{}`", content_type);
            return Ok(SearchResponse::Opaque(body));
        }

        match parse_atom_feed(&body) {
            Ok(records) => Ok(SearchResponse::Structured(
                records
                    .into_iter()
                    .map(PaperRecord::into_document)
                    .collect(),
            )),
            Err(e) => {
                tracing::warn!("failed to parse arXiv feed: {e}");
                Ok(SearchResponse::Opaque(body))
            }
        }
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// 解析arXiv Atom feed中的entry
pub fn parse_atom_feed(xml: &str) -> Result<Vec<PaperRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<PaperRecord> = None;
    let mut path: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"entry" {
                    current = Some(PaperRecord::default());
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                if let Some(record) = current.as_mut()
                    && e.local_name().as_ref() == b"link"
                {
                    let is_pdf = attribute(&e, b"title").as_deref() == Some("pdf")
                        || attribute(&e, b"type")
                            .is_some_and(|t| t.contains("pdf"));
                    if is_pdf && record.pdf_url.is_none() {
                        record.pdf_url = attribute(&e, b"href");
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let Some(record) = current.as_mut() else {
                    continue;
                };
                let text = t.unescape()?.to_string();
                match path.last().map(|n| n.as_slice()) {
                    Some(b"id") => {
                        record.source_id = text.rsplit("/abs/").next().unwrap_or(&text).to_string()
                    }
                    Some(b"title") => record.title.push_str(&text),
                    Some(b"summary") => record.summary.push_str(&text),
                    Some(b"published") => {
                        record.published = Some(text.chars().take(10).collect())
                    }
                    Some(b"name") => record.authors.push(text),
                    Some(b"doi") => record.doi = Some(text),
                    Some(b"journal_ref") => record.journal = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"entry"
                    && let Some(record) = current.take()
                {
                    records.push(record);
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("XML parse error: {}", e)),
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(anyhow!("truncated Atom feed"));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2501.01234v1</id>
    <published>2025-01-15T12:00:00Z</published>
    <title>Mixture-of-Experts
      routing</title>
    <summary>We study expert routing &amp; load balancing.</summary>
    <author><name>Doe, J.</name></author>
    <author><name>Smith, A.</name></author>
    <arxiv:doi>10.48550/arXiv.2501.01234</arxiv:doi>
    <link rel="alternate" type="text/html" href="https://arxiv.org/abs/2501.01234v1"/>
    <link title="pdf" href="https://arxiv.org/pdf/2501.01234v1" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2502.00001v2</id>
    <title>Second paper</title>
    <summary>Short.</summary>
  </entry>
</feed>
"#;

    #[test]
    fn test_parse_atom_feed() {
        let records = parse_atom_feed(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.source_id, "2501.01234v1");
        assert_eq!(first.authors, vec!["Doe, J.", "Smith, A."]);
        assert_eq!(first.published.as_deref(), Some("2025-01-15"));
        assert_eq!(first.doi.as_deref(), Some("10.48550/arXiv.2501.01234"));
        assert_eq!(first.pdf_url.as_deref(), Some("https://arxiv.org/pdf/2501.01234v1"));
        assert!(first.summary.contains("routing & load"));
        assert!(first.render().starts_with("Mixture-of-Experts routing\n"));

        assert_eq!(records[1].title, "Second paper");
        assert!(records[1].doi.is_none());
    }

    #[test]
    fn test_parse_truncated_feed_fails() {
        assert!(parse_atom_feed("<feed><entry><title>half").is_err());
    }

    #[test]
    fn test_build_query() {
        assert_eq!(ArxivClient::build_query("graph neural"), "all:graph AND all:neural");
        assert_eq!(ArxivClient::build_query("   "), "all:*");
    }

    #[tokio::test]
    async fn test_search_returns_structured_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("max_results", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/atom+xml")
                    .set_body_raw(SAMPLE, "application/atom+xml"),
            )
            .mount(&server)
            .await;

        let client = ArxivClient::with_base(
            &format!("{}/api/query", server.uri()),
            2,
            Duration::from_secs(5),
        )
        .unwrap();
        let response = client.search("expert routing").await.unwrap();
        match response {
            SearchResponse::Structured(documents) => {
                assert_eq!(documents.len(), 2);
                assert_eq!(documents[0].metadata["doi"], "10.48550/arXiv.2501.01234");
            }
            other => panic!("expected structured response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_falls_back_to_opaque_on_unexpected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>rate limited</html>"),
            )
            .mount(&server)
            .await;

        let client =
            ArxivClient::with_base(&server.uri(), 3, Duration::from_secs(5)).unwrap();
        let response = client.search("anything").await.unwrap();
        assert_eq!(
            response,
            SearchResponse::Opaque("<html>rate limited</html>".to_string())
        );
    }

    #[tokio::test]
    async fn test_search_http_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client =
            ArxivClient::with_base(&server.uri(), 3, Duration::from_secs(5)).unwrap();
        assert!(client.search("anything").await.is_err());
    }
}
