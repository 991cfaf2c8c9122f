//! 基于Postgres + pgvector的文档存储
//!
//! 每次操作单独建立连接并在结束时释放，不在整个调研流程中持有连接。

use anyhow::Context;
use async_trait::async_trait;
use pgvector::Vector;
use tokio_postgres::{Client, NoTls, Row};

use super::{Document, DocumentStore, ScoredDocument, ensure_dimensions};
use crate::error::{ResearchError, Result};

/// 带schema的完整表名
#[derive(Debug, Clone)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    pub fn new<S, T>(schema: S, table: T) -> Result<Self>
    where
        S: Into<String>,
        T: Into<String>,
    {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() || table.trim().is_empty() {
            return Err(ResearchError::config("schema and table names are required"));
        }
        Ok(Self { schema, table })
    }

    /// 带引号的完整表名
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// 转义Postgres标识符
pub fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

/// pgvector文档存储
pub struct PgVectorStore {
    database_url: String,
    table: TableName,
    dimensions: usize,
}

impl PgVectorStore {
    pub fn new(database_url: impl Into<String>, table: TableName, dimensions: usize) -> Self {
        Self {
            database_url: database_url.into(),
            table,
            dimensions,
        }
    }

    async fn connect(&self) -> anyhow::Result<Client> {
        let (client, connection) = tokio_postgres::connect(&self.database_url, NoTls)
            .await
            .context("failed to connect to Postgres")?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!("postgres connection error: {err}");
            }
        });
        Ok(client)
    }

    fn upsert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (id, content, embedding) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET \
                content = EXCLUDED.content, \
                embedding = EXCLUDED.embedding",
            self.table.qualified()
        )
    }

    async fn write_batch(&self, documents: &[Document]) -> anyhow::Result<()> {
        let mut client = self.connect().await?;
        let sql = self.upsert_sql();
        let transaction = client.transaction().await?;
        let statement = transaction.prepare(&sql).await?;
        for document in documents {
            let vector = Vector::from(document.embedding.clone());
            transaction
                .execute(&statement, &[&document.id, &document.content, &vector])
                .await
                .with_context(|| format!("failed to upsert document {}", document.id))?;
        }
        // 提交前出错时transaction被drop，整批回滚
        transaction.commit().await?;
        Ok(())
    }
}

fn row_to_document(row: &Row) -> Document {
    let embedding: Vector = row.get("embedding");
    Document {
        id: row.get("id"),
        content: row.get("content"),
        embedding: embedding.to_vec(),
    }
}

#[async_trait]
impl DocumentStore for PgVectorStore {
    async fn init(&self) -> Result<()> {
        let client = self.connect().await.map_err(ResearchError::storage)?;
        client
            .batch_execute("CREATE EXTENSION IF NOT EXISTS vector")
            .await
            .map_err(|e| ResearchError::storage(format!("failed to enable pgvector: {e}")))?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                embedding VECTOR({}) NOT NULL,
                seq BIGSERIAL
            )",
            self.table.qualified(),
            self.dimensions
        );
        client
            .batch_execute(&ddl)
            .await
            .map_err(|e| ResearchError::storage(format!("failed to create table: {e}")))?;
        tracing::debug!("document table {} is ready", self.table.qualified());
        Ok(())
    }

    async fn upsert(&self, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        for document in documents {
            ensure_dimensions(&document.embedding, self.dimensions)?;
        }
        self.write_batch(documents)
            .await
            .map_err(ResearchError::storage)?;
        Ok(documents.len())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        ensure_dimensions(embedding, self.dimensions)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let client = self.connect().await.map_err(ResearchError::storage)?;
        let sql = format!(
            "SELECT id, content, embedding, (embedding <=> $1)::float8 AS distance \
             FROM {} \
             ORDER BY embedding <=> $1 ASC, seq ASC \
             LIMIT $2",
            self.table.qualified()
        );
        let vector = Vector::from(embedding.to_vec());
        let limit = i64::try_from(k).unwrap_or(i64::MAX);
        let rows = client
            .query(&sql, &[&vector, &limit])
            .await
            .map_err(|e| ResearchError::storage(format!("similarity query failed: {e}")))?;

        Ok(rows
            .iter()
            .map(|row| ScoredDocument {
                document: row_to_document(row),
                distance: row.get::<_, Option<f64>>("distance").unwrap_or(1.0),
            })
            .collect())
    }

    async fn all(&self) -> Result<Vec<Document>> {
        let client = self.connect().await.map_err(ResearchError::storage)?;
        let sql = format!(
            "SELECT id, content, embedding FROM {} ORDER BY seq ASC",
            self.table.qualified()
        );
        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| ResearchError::storage(format!("failed to read documents: {e}")))?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn count(&self) -> Result<usize> {
        let client = self.connect().await.map_err(ResearchError::storage)?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.table.qualified());
        let row = client
            .query_one(&sql, &[])
            .await
            .map_err(|e| ResearchError::storage(format!("failed to count documents: {e}")))?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as usize)
    }

    async fn clear(&self) -> Result<()> {
        let client = self.connect().await.map_err(ResearchError::storage)?;
        let sql = format!("DELETE FROM {}", self.table.qualified());
        client
            .execute(&sql, &[])
            .await
            .map_err(|e| ResearchError::storage(format!("failed to clear documents: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_quoting() {
        let table = TableName::new("public", "documents").unwrap();
        assert_eq!(table.qualified(), "\"public\".\"documents\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_table_name_requires_values() {
        assert!(TableName::new("", "documents").is_err());
        assert!(TableName::new("public", "  ").is_err());
    }

    #[test]
    fn test_upsert_sql_updates_on_conflict() {
        let store = PgVectorStore::new(
            "postgres://localhost/test",
            TableName::new("public", "documents").unwrap(),
            1024,
        );
        let sql = store.upsert_sql();
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE"));
        assert!(sql.contains("\"public\".\"documents\""));
    }

    #[tokio::test]
    async fn test_upsert_empty_batch_does_not_connect() {
        let store = PgVectorStore::new(
            "postgres://invalid-host-for-tests/none",
            TableName::new("public", "documents").unwrap(),
            4,
        );
        assert_eq!(store.upsert(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wrong_dimensions_rejected_before_connecting() {
        let store = PgVectorStore::new(
            "postgres://invalid-host-for-tests/none",
            TableName::new("public", "documents").unwrap(),
            4,
        );
        let err = store
            .upsert(&[Document::new("x", vec![0.1; 3])])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("3 dimensions"));
    }
}
