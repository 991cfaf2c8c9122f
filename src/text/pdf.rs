//! PDF文本提取

use anyhow::{Result, anyhow};
use async_trait::async_trait;

/// 从下载的全文字节中提取纯文本
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: Vec<u8>) -> Result<String>;
}

/// 基于pdf-extract的PDF解析
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: Vec<u8>) -> Result<String> {
        if !bytes.starts_with(b"%PDF") {
            return Err(anyhow!("downloaded content is not a PDF document"));
        }
        // pdf-extract在遇到损坏的文件时可能panic，放到阻塞线程中并捕获
        tokio::task::spawn_blocking(move || {
            std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
                .map_err(|_| anyhow!("PDF parser panicked on malformed input"))?
                .map_err(|e| anyhow!("failed to extract PDF text: {}", e))
        })
        .await?
    }
}

/// 纯文本内容直接按UTF-8解码
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: Vec<u8>) -> Result<String> {
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
