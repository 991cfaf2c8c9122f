//! PubMed检索后端（NCBI E-utilities）

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::search::{PaperRecord, SearchBackend, SearchResponse, collapse_whitespace};

pub const PUBMED_API_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

#[derive(Clone)]
pub struct PubmedClient {
    http: Client,
    base: String,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    idlist: Vec<String>,
}

impl PubmedClient {
    pub fn new(max_results: usize, timeout: Duration) -> Result<Self> {
        Self::with_base(PUBMED_API_BASE, max_results, timeout)
    }

    pub fn with_base(base: &str, max_results: usize, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("deepresearch-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build PubMed HTTP client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            max_results: max_results.max(1),
        })
    }
}

#[async_trait]
impl SearchBackend for PubmedClient {
    fn name(&self) -> &'static str {
        "pubmed"
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let resp = self
            .http
            .get(format!("{}/esearch.fcgi", self.base))
            .query(&[("db", "pubmed"), ("term", query), ("retmode", "json")])
            .query(&[("retmax", self.max_results)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("PubMed esearch error: HTTP {}", resp.status()));
        }
        let body = resp.text().await?;
        let ids = match serde_json::from_str::<ESearchResponse>(&body) {
            Ok(parsed) => parsed.esearchresult.idlist,
            Err(e) => {
                tracing::warn!("unexpected PubMed esearch payload: {e}");
                return Ok(SearchResponse::Opaque(body));
            }
        };
        if ids.is_empty() {
            return Ok(SearchResponse::Structured(Vec::new()));
        }

        let resp = self
            .http
            .get(format!("{}/efetch.fcgi", self.base))
            .query(&[
                ("db", "pubmed"),
                ("id", ids.join(",").as_str()),
                ("retmode", "xml"),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("PubMed efetch error: HTTP {}", resp.status()));
        }
        let xml = resp.text().await?;
        match parse_pubmed_articles(&xml) {
            Ok(records) => Ok(SearchResponse::Structured(
                records
                    .into_iter()
                    .map(PaperRecord::into_document)
                    .collect(),
            )),
            Err(e) => {
                tracing::warn!("failed to parse PubMed efetch payload: {e}");
                Ok(SearchResponse::Opaque(xml))
            }
        }
    }
}

/// 解析efetch返回的PubmedArticleSet
///
/// DOI优先取`Article/ELocationID`，其次取`PubmedData/ArticleIdList`，
/// 参考文献列表中的DOI不属于本文。标题与摘要保留内联标记中的文本。
pub fn parse_pubmed_articles(xml: &str) -> Result<Vec<PaperRecord>> {
    let mut reader = Reader::from_str(xml);
    // 内联标记两侧的空白属于正文，不能裁剪
    reader.trim_text(false);

    let mut records = Vec::new();
    let mut current: Option<PaperRecord> = None;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut last_name = String::new();
    let mut id_is_doi = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"PubmedArticle" => current = Some(PaperRecord::default()),
                    b"ArticleId" | b"ELocationID" => {
                        id_is_doi = e.attributes().flatten().any(|a| {
                            matches!(a.key.as_ref(), b"IdType" | b"EIdType")
                                && a.value.as_ref() == b"doi"
                        });
                    }
                    b"AbstractText" => {
                        if let Some(record) = current.as_mut()
                            && !record.summary.is_empty()
                        {
                            record.summary.push(' ');
                        }
                    }
                    b"Author" => last_name.clear(),
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Text(t)) => {
                let Some(record) = current.as_mut() else {
                    continue;
                };
                let raw = t.unescape()?;
                if within(&path, b"ArticleTitle") {
                    record.title.push_str(&raw);
                    continue;
                }
                if within(&path, b"AbstractText") {
                    record.summary.push_str(&raw);
                    continue;
                }

                let text = raw.trim();
                if text.is_empty() {
                    continue;
                }
                let parent = ancestor(&path, 1);
                match path.last().map(|n| n.as_slice()) {
                    Some(b"PMID") if parent == b"MedlineCitation" => {
                        record.source_id = text.to_string()
                    }
                    Some(b"LastName") => last_name = text.to_string(),
                    Some(b"ForeName") => {
                        record.authors.push(format!("{}, {}", last_name, text));
                        last_name.clear();
                    }
                    Some(b"Title") if parent == b"Journal" => {
                        record.journal = Some(text.to_string())
                    }
                    Some(b"Year") if parent == b"PubDate" => {
                        record.published = Some(text.to_string())
                    }
                    Some(b"ELocationID") if id_is_doi && parent == b"Article" => {
                        record.doi = Some(text.to_string())
                    }
                    Some(b"ArticleId")
                        if id_is_doi
                            && record.doi.is_none()
                            && parent == b"ArticleIdList"
                            && ancestor(&path, 2) == b"PubmedData" =>
                    {
                        record.doi = Some(text.to_string())
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"Author" && !last_name.is_empty() {
                    if let Some(record) = current.as_mut() {
                        record.authors.push(last_name.clone());
                    }
                    last_name.clear();
                }
                if name.as_ref() == b"PubmedArticle"
                    && let Some(mut record) = current.take()
                {
                    record.title = collapse_whitespace(&record.title);
                    record.summary = collapse_whitespace(&record.summary);
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
        return Err(anyhow!("truncated PubMed payload"));
    }
    Ok(records)
}

fn within(path: &[Vec<u8>], element: &[u8]) -> bool {
    path.iter().any(|name| name.as_slice() == element)
}

/// 向上第`depth`层的元素名，0为当前元素
fn ancestor(path: &[Vec<u8>], depth: usize) -> &[u8] {
    path.len()
        .checked_sub(depth + 1)
        .map(|i| path[i].as_slice())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLES: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE">
      <PMID Version="1">38000001</PMID>
      <Article>
        <Journal>
          <JournalIssue><PubDate><Year>2024</Year></PubDate></JournalIssue>
          <Title>Nature Medicine</Title>
        </Journal>
        <ArticleTitle>Deep learning for sepsis prediction.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Sepsis is deadly.</AbstractText>
          <AbstractText Label="RESULTS">Models help.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author><LastName>Curie</LastName><ForeName>Marie</ForeName></Author>
          <Author><CollectiveName>Sepsis Group</CollectiveName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">38000001</ArticleId>
        <ArticleId IdType="doi">10.1038/s41591-024-00001-x</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>
"#;

    #[test]
    fn test_parse_pubmed_articles() {
        let records = parse_pubmed_articles(ARTICLES).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source_id, "38000001");
        assert_eq!(record.title, "Deep learning for sepsis prediction.");
        assert_eq!(record.summary, "Sepsis is deadly. Models help.");
        assert_eq!(record.authors, vec!["Curie, Marie"]);
        assert_eq!(record.journal.as_deref(), Some("Nature Medicine"));
        assert_eq!(record.published.as_deref(), Some("2024"));
        assert_eq!(record.doi.as_deref(), Some("10.1038/s41591-024-00001-x"));
    }

    const ARTICLE_WITH_REFERENCES: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE">
      <PMID Version="1">38000002</PMID>
      <Article>
        <ArticleTitle>Role of <i>TP53</i> in H<sub>2</sub>O<sub>2</sub> stress.</ArticleTitle>
        <Abstract>
          <AbstractText>Sepsis is <i>very</i> deadly.</AbstractText>
          <AbstractText Label="CONCLUSIONS">Act <b>early</b>.</AbstractText>
        </Abstract>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">38000002</ArticleId>
        <ArticleId IdType="doi">10.1038/s41591-024-00001-x</ArticleId>
      </ArticleIdList>
      <ReferenceList>
        <Reference>
          <Citation>Singer M, et al. JAMA. 2016.</Citation>
          <ArticleIdList>
            <ArticleId IdType="doi">10.1001/jama.2016.0287</ArticleId>
            <ArticleId IdType="pubmed">26903338</ArticleId>
          </ArticleIdList>
        </Reference>
      </ReferenceList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>
"#;

    #[test]
    fn test_reference_list_doi_is_ignored() {
        let records = parse_pubmed_articles(ARTICLE_WITH_REFERENCES).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].doi.as_deref(),
            Some("10.1038/s41591-024-00001-x")
        );
    }

    #[test]
    fn test_inline_markup_keeps_text() {
        let records = parse_pubmed_articles(ARTICLE_WITH_REFERENCES).unwrap();
        let record = &records[0];
        assert_eq!(record.title, "Role of TP53 in H2O2 stress.");
        assert_eq!(record.summary, "Sepsis is very deadly. Act early.");
    }

    #[test]
    fn test_elocation_doi_takes_precedence() {
        let xml = r#"<PubmedArticleSet><PubmedArticle>
  <MedlineCitation><PMID>1</PMID><Article>
    <ArticleTitle>T</ArticleTitle>
    <ELocationID EIdType="pii">S0000</ELocationID>
    <ELocationID EIdType="doi" ValidYN="Y">10.1000/eloc</ELocationID>
  </Article></MedlineCitation>
  <PubmedData><ArticleIdList>
    <ArticleId IdType="doi">10.1000/other</ArticleId>
  </ArticleIdList></PubmedData>
</PubmedArticle></PubmedArticleSet>"#;
        let records = parse_pubmed_articles(xml).unwrap();
        assert_eq!(records[0].doi.as_deref(), Some("10.1000/eloc"));
    }

    #[tokio::test]
    async fn test_search_runs_esearch_then_efetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .and(query_param("term", "sepsis prediction"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "header": {"type": "esearch"},
                "esearchresult": {"count": "1", "idlist": ["38000001"]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/efetch.fcgi"))
            .and(query_param("id", "38000001"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLES))
            .mount(&server)
            .await;

        let client = PubmedClient::with_base(&server.uri(), 5, Duration::from_secs(5)).unwrap();
        let texts = client.search("sepsis prediction").await.unwrap().into_texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("Deep learning for sepsis prediction."));
        assert!(texts[0].contains("DOI: 10.1038/s41591-024-00001-x"));
    }

    #[tokio::test]
    async fn test_search_without_hits_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "esearchresult": {"idlist": []}
            })))
            .mount(&server)
            .await;

        let client = PubmedClient::with_base(&server.uri(), 5, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.search("nothing").await.unwrap(),
            SearchResponse::Structured(vec![])
        );
    }

    #[tokio::test]
    async fn test_unexpected_esearch_payload_is_opaque() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"error\":\"API rate limit\"}"))
            .mount(&server)
            .await;

        let client = PubmedClient::with_base(&server.uri(), 5, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.search("x").await.unwrap(),
            SearchResponse::Opaque("{\"error\":\"API rate limit\"}".to_string())
        );
    }
}
