use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;
use crate::generator::context::ResearchContext;
use crate::generator::stages::ResearchStage;
use crate::generator::state::ResearchState;
use crate::tools::{Citation, OpenAccessStatus, RegistrationOutcome};

static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+").expect("DOI pattern is valid")
});

/// 提取文本中的第一个DOI，去掉句末标点
pub fn extract_doi(text: &str) -> Option<String> {
    let found = DOI_PATTERN.find(text)?;
    let doi = found
        .as_str()
        .trim_end_matches(['.', ',', ';', ')']);
    (!doi.is_empty()).then(|| doi.to_string())
}

/// 从渲染后的摘要中还原登记所需的文献信息
pub fn citation_from_abstract(text: &str, doi: &str) -> Citation {
    let (header, body) = text.split_once("\n\n").unwrap_or((text, ""));
    let mut lines = header.lines();
    let title = lines.next().map(str::trim).unwrap_or_default();
    let mut citation = Citation::new(title, doi);
    for line in lines {
        if let Some(date) = line.strip_prefix("Published: ") {
            citation.date = Some(date.trim().to_string());
        } else if let Some(journal) = line.strip_prefix("Journal: ") {
            citation.publication_title = Some(journal.trim().to_string());
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        citation.abstract_note = Some(body.to_string());
    }
    citation
}

/// 解析摘要中的DOI，查找开放获取全文并登记到文献管理器
#[derive(Default)]
pub struct ResourceResolver;

#[async_trait]
impl ResearchStage for ResourceResolver {
    fn name(&self) -> &'static str {
        "resource_resolver"
    }

    async fn execute(
        &self,
        context: &ResearchContext,
        mut state: ResearchState,
    ) -> Result<ResearchState> {
        let services = &context.services;
        let mut seen_dois = HashSet::new();
        for (index, text) in state.abstracts.iter().enumerate() {
            let Some(doi) = extract_doi(text) else {
                tracing::info!("abstract #{} carries no DOI, skipped", index + 1);
                continue;
            };
            // 多轮检索可能重复命中同一篇论文
            if !seen_dois.insert(doi.to_lowercase()) {
                continue;
            }

            let status = match services.resolver.resolve(&doi).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!("open access lookup failed for {}: {:#}", doi, e);
                    OpenAccessStatus::NotFound
                }
            };
            tracing::debug!("{}: {}", doi, status);

            let OpenAccessStatus::Found { url, .. } = status else {
                continue;
            };
            println!("   🔓 {} -> {}", doi, url);
            if !state.full_text_urls.contains(&url) {
                state.full_text_urls.push(url);
            }

            let citation = citation_from_abstract(text, &doi);
            match services.references.register(&citation).await {
                Ok(RegistrationOutcome::Registered { key }) => {
                    tracing::info!("registered {} as {}", doi, key);
                }
                Ok(RegistrationOutcome::Rejected { detail }) => {
                    tracing::warn!("reference manager rejected {}: {}", doi, detail);
                }
                Ok(RegistrationOutcome::Disabled) => {
                    tracing::debug!("reference manager disabled, skip {}", doi);
                }
                Err(e) => {
                    tracing::warn!("failed to register {}: {:#}", doi, e);
                }
            }
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_doi() {
        assert_eq!(
            extract_doi("See DOI: 10.1038/nature12373 for details"),
            Some("10.1038/nature12373".to_string())
        );
        assert_eq!(
            extract_doi("(doi 10.1016/J.CELL.2020.01.001)."),
            Some("10.1016/J.CELL.2020.01.001".to_string())
        );
        assert_eq!(extract_doi("no identifier here"), None);
    }

    #[test]
    fn test_extract_first_doi_only() {
        let text = "first 10.1000/abc123, second 10.1000/def456";
        assert_eq!(extract_doi(text), Some("10.1000/abc123".to_string()));
    }

    #[test]
    fn test_citation_from_rendered_abstract() {
        let text = "Attention Is All You Need\nAuthors: A. Vaswani\nPublished: 2017-06-12\nJournal: NeurIPS\nDOI: 10.48550/arXiv.1706.03762\n\nThe dominant sequence models...";
        let citation = citation_from_abstract(text, "10.48550/arXiv.1706.03762");
        assert_eq!(citation.title, "Attention Is All You Need");
        assert_eq!(citation.doi, "10.48550/arXiv.1706.03762");
        assert_eq!(citation.date.as_deref(), Some("2017-06-12"));
        assert_eq!(citation.publication_title.as_deref(), Some("NeurIPS"));
        assert_eq!(citation.abstract_note.as_deref(), Some("The dominant sequence models..."));
    }

    #[test]
    fn test_citation_from_plain_abstract() {
        let citation = citation_from_abstract("Plain title 10.1/xyz", "10.1/xyz");
        assert_eq!(citation.title, "Plain title 10.1/xyz");
        assert!(citation.abstract_note.is_none());
    }
}
