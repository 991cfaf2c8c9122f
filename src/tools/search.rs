//! 学术检索接口

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 检索返回的一条摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub text: String,
    pub metadata: Value,
}

/// 检索结果：结构化的摘要列表，或无法识别时的原始响应文本
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    Structured(Vec<SearchDocument>),
    Opaque(String),
}

impl SearchResponse {
    /// 展开为摘要文本，保持返回顺序
    pub fn into_texts(self) -> Vec<String> {
        match self {
            SearchResponse::Structured(documents) => {
                documents.into_iter().map(|doc| doc.text).collect()
            }
            SearchResponse::Opaque(raw) => vec![raw],
        }
    }
}

/// 学术检索后端
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<SearchResponse>;
}

/// 论文元信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub source_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published: Option<String>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub pdf_url: Option<String>,
    pub summary: String,
}

impl PaperRecord {
    /// 渲染为摘要文本，首行固定为标题
    pub fn render(&self) -> String {
        let mut text = collapse_whitespace(&self.title);
        if !self.authors.is_empty() {
            text.push_str(&format!("\nAuthors: {}", self.authors.join(", ")));
        }
        if let Some(published) = &self.published {
            text.push_str(&format!("\nPublished: {}", published));
        }
        if let Some(journal) = &self.journal {
            text.push_str(&format!("\nJournal: {}", journal));
        }
        if let Some(doi) = &self.doi {
            text.push_str(&format!("\nDOI: {}", doi));
        }
        text.push_str("\n\n");
        text.push_str(&collapse_whitespace(&self.summary));
        text
    }

    pub fn into_document(self) -> SearchDocument {
        let text = self.render();
        let metadata = serde_json::json!({
            "source_id": self.source_id,
            "title": collapse_whitespace(&self.title),
            "authors": self.authors,
            "published": self.published,
            "journal": self.journal,
            "doi": self.doi,
            "pdf_url": self.pdf_url,
        });
        SearchDocument { text, metadata }
    }
}

/// Atom/XML中的标题和摘要常带有换行缩进，统一压缩为单个空格
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_puts_title_first() {
        let record = PaperRecord {
            source_id: "2501.01234".to_string(),
            title: "Mixture-of-Experts\n   routing".to_string(),
            authors: vec!["Doe, J.".to_string(), "Smith, A.".to_string()],
            published: Some("2025-01-15".to_string()),
            doi: Some("10.1234/moe.2025".to_string()),
            summary: "We study\n routing.".to_string(),
            ..Default::default()
        };

        let text = record.render();
        assert_eq!(text.lines().next(), Some("Mixture-of-Experts routing"));
        assert!(text.contains("Authors: Doe, J., Smith, A."));
        assert!(text.contains("DOI: 10.1234/moe.2025"));
        assert!(text.ends_with("We study routing."));
    }

    #[test]
    fn test_into_texts_preserves_order() {
        let response = SearchResponse::Structured(vec![
            SearchDocument {
                text: "first".to_string(),
                metadata: Value::Null,
            },
            SearchDocument {
                text: "second".to_string(),
                metadata: Value::Null,
            },
        ]);
        assert_eq!(response.into_texts(), vec!["first", "second"]);
        assert_eq!(
            SearchResponse::Opaque("raw body".to_string()).into_texts(),
            vec!["raw body"]
        );
    }
}
