use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use pw_core::{Article, DocumentStore, Error, Result};

use crate::registry::BatchRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    Single,
    Batch,
    List,
}

impl FromStr for ExportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(ExportMode::Single),
            "batch" => Ok(ExportMode::Batch),
            "list" => Ok(ExportMode::List),
            other => Err(Error::invalid_input(
                "mode",
                format!("unknown export mode: {}", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportPayload {
    pub articles: Vec<Article>,
    /// Requested identifiers that resolved to nothing; reported rather
    /// than failing the export.
    pub unresolved: Vec<String>,
}

/// Read-only consumer of the document store: paginated listing plus the
/// three export modes. May observe a batch mid-enrichment; that is the
/// documented consistency model.
pub struct QueryEngine {
    store: Arc<dyn DocumentStore>,
    registry: BatchRegistry,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let registry = BatchRegistry::new(store.clone());
        Self { store, registry }
    }

    /// Stable-order pagination: creation time descending, ties broken by
    /// id, so pages stay disjoint while enrichment mutates other fields.
    pub async fn list_articles(
        &self,
        user_id: &str,
        update_id: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<Article>, usize)> {
        if page < 1 {
            return Err(Error::invalid_input("page", "must be at least 1"));
        }
        if limit < 1 {
            return Err(Error::invalid_input("limit", "must be at least 1"));
        }
        self.store
            .list_articles(user_id, update_id, page, limit)
            .await
    }

    /// Export articles in one of three modes. When no mode is given but an
    /// `id` is present, batch mode is assumed.
    pub async fn export(
        &self,
        user_id: &str,
        mode: Option<ExportMode>,
        id: Option<&str>,
        ids: Option<&str>,
    ) -> Result<ExportPayload> {
        let mode = match mode {
            Some(mode) => mode,
            None if id.is_some() => ExportMode::Batch,
            None => {
                return Err(Error::invalid_input(
                    "mode",
                    "no usable selector for the export",
                ))
            }
        };

        match mode {
            ExportMode::Single => {
                let id =
                    id.ok_or_else(|| Error::invalid_input("id", "required for single export"))?;
                let article = self
                    .store
                    .get_article(user_id, id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;
                Ok(ExportPayload {
                    articles: vec![article],
                    unresolved: Vec::new(),
                })
            }
            ExportMode::Batch => {
                let update_id =
                    id.ok_or_else(|| Error::invalid_input("id", "required for batch export"))?;
                self.registry.get_batch(user_id, update_id).await?;
                let articles = self.store.batch_articles(user_id, update_id).await?;
                Ok(ExportPayload {
                    articles,
                    unresolved: Vec::new(),
                })
            }
            ExportMode::List => {
                let ids =
                    ids.ok_or_else(|| Error::invalid_input("ids", "required for list export"))?;
                let requested = dedupe_ids(ids);
                if requested.is_empty() {
                    return Err(Error::invalid_input("ids", "no identifiers given"));
                }
                let articles = self.store.get_articles_by_ids(user_id, &requested).await?;
                let found: HashSet<&str> =
                    articles.iter().map(|a| a.article_id.as_str()).collect();
                let unresolved = requested
                    .into_iter()
                    .filter(|id| !found.contains(id.as_str()))
                    .collect();
                Ok(ExportPayload {
                    articles,
                    unresolved,
                })
            }
        }
    }
}

/// Split a comma-delimited id list, dropping blanks and duplicates while
/// preserving first-seen order.
fn dedupe_ids(ids: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportCoordinator, NewArticle};
    use pw_storage::MemoryStore;

    async fn seed(contents: &[&str]) -> (Arc<MemoryStore>, QueryEngine, String, Vec<String>) {
        let store = Arc::new(MemoryStore::new());
        let importer = ImportCoordinator::new(store.clone() as Arc<dyn DocumentStore>);
        let items: Vec<NewArticle> = contents
            .iter()
            .map(|c| NewArticle::from_content(*c))
            .collect();
        let report = importer.import_batch("u1", items, None).await.unwrap();
        let article_ids = report
            .imported
            .iter()
            .map(|a| a.article_id.clone())
            .collect();
        let engine = QueryEngine::new(store.clone() as Arc<dyn DocumentStore>);
        (store, engine, report.batch.update_id, article_ids)
    }

    #[tokio::test]
    async fn test_list_articles_validates_pagination() {
        let (_, engine, _, _) = seed(&["one"]).await;
        assert!(matches!(
            engine.list_articles("u1", None, 0, 10).await,
            Err(Error::InvalidInput { field: "page", .. })
        ));
        assert!(matches!(
            engine.list_articles("u1", None, 1, 0).await,
            Err(Error::InvalidInput { field: "limit", .. })
        ));
    }

    #[tokio::test]
    async fn test_pages_are_disjoint_and_cover_the_listing() {
        let contents: Vec<String> = (0..20).map(|i| format!("article number {}", i)).collect();
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let (_, engine, _, _) = seed(&refs).await;

        let (page1, total) = engine.list_articles("u1", None, 1, 10).await.unwrap();
        let (page2, _) = engine.list_articles("u1", None, 2, 10).await.unwrap();
        assert_eq!(total, 20);
        assert_eq!(page1.len(), 10);
        assert_eq!(page2.len(), 10);

        let ids1: HashSet<_> = page1.iter().map(|a| a.article_id.clone()).collect();
        let ids2: HashSet<_> = page2.iter().map(|a| a.article_id.clone()).collect();
        assert!(ids1.is_disjoint(&ids2));

        let (all, _) = engine.list_articles("u1", None, 1, 20).await.unwrap();
        let combined: Vec<_> = page1.iter().chain(page2.iter()).map(|a| a.id).collect();
        let expected: Vec<_> = all.iter().map(|a| a.id).collect();
        assert_eq!(combined, expected);
    }

    #[tokio::test]
    async fn test_pagination_is_stable_across_enrichment_writes() {
        let contents: Vec<String> = (0..20).map(|i| format!("article number {}", i)).collect();
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let (store, engine, _, _) = seed(&refs).await;

        let (expected, _) = engine.list_articles("u1", None, 1, 20).await.unwrap();
        let (page1, _) = engine.list_articles("u1", None, 1, 10).await.unwrap();

        // Enrichment lands on articles from both pages between the fetches.
        let analysis = pw_core::Analysis {
            summary: vec!["point".to_string()],
            sentiment_label: "neutral".to_string(),
            sentiment_score: 0.5,
        };
        for article in expected.iter().step_by(3) {
            store
                .update_article_enrichment("u1", article.id, &analysis)
                .await
                .unwrap();
        }

        let (page2, _) = engine.list_articles("u1", None, 2, 10).await.unwrap();

        let ids1: HashSet<_> = page1.iter().map(|a| a.id).collect();
        let ids2: HashSet<_> = page2.iter().map(|a| a.id).collect();
        assert!(ids1.is_disjoint(&ids2));

        // The union, in order, is still the first 20 items by the
        // creation-time/id key.
        let combined: Vec<_> = page1.iter().chain(page2.iter()).map(|a| a.id).collect();
        let expected_ids: Vec<_> = expected.iter().map(|a| a.id).collect();
        assert_eq!(combined, expected_ids);
    }

    #[tokio::test]
    async fn test_list_articles_filters_by_batch() {
        let (store, engine, update_id, _) = seed(&["in batch"]).await;
        let importer = ImportCoordinator::new(store as Arc<dyn DocumentStore>);
        importer
            .import_single("u1", NewArticle::from_content("standalone"), None)
            .await
            .unwrap();

        let (all, total_all) = engine.list_articles("u1", None, 1, 10).await.unwrap();
        assert_eq!(total_all, 2);
        assert_eq!(all.len(), 2);

        let (filtered, total) = engine
            .list_articles("u1", Some(&update_id), 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(filtered[0].content, "in batch");
    }

    #[tokio::test]
    async fn test_export_single() {
        let (_, engine, _, ids) = seed(&["one", "two"]).await;

        let payload = engine
            .export("u1", Some(ExportMode::Single), Some(&ids[0]), None)
            .await
            .unwrap();
        assert_eq!(payload.articles.len(), 1);
        assert_eq!(payload.articles[0].article_id, ids[0]);

        assert!(matches!(
            engine
                .export("u1", Some(ExportMode::Single), Some("nope"), None)
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_export_batch_returns_every_member() {
        let (_, engine, update_id, ids) = seed(&["a", "b", "c"]).await;

        let payload = engine
            .export("u1", Some(ExportMode::Batch), Some(&update_id), None)
            .await
            .unwrap();
        let exported: HashSet<_> = payload
            .articles
            .iter()
            .map(|a| a.article_id.clone())
            .collect();
        assert_eq!(exported, ids.iter().cloned().collect());
        assert!(payload.unresolved.is_empty());
    }

    #[tokio::test]
    async fn test_export_list_reports_unresolved_ids() {
        let (_, engine, _, ids) = seed(&["a"]).await;

        let selector = format!("{},ghost-id,{}", ids[0], ids[0]);
        let payload = engine
            .export("u1", Some(ExportMode::List), None, Some(&selector))
            .await
            .unwrap();
        // Duplicates de-duplicated, unknown ids reported separately.
        assert_eq!(payload.articles.len(), 1);
        assert_eq!(payload.unresolved, vec!["ghost-id".to_string()]);
    }

    #[tokio::test]
    async fn test_export_mode_defaults_to_batch() {
        let (_, engine, update_id, _) = seed(&["a", "b"]).await;

        let payload = engine
            .export("u1", None, Some(&update_id), None)
            .await
            .unwrap();
        assert_eq!(payload.articles.len(), 2);

        assert!(matches!(
            engine.export("u1", None, None, None).await,
            Err(Error::InvalidInput { field: "mode", .. })
        ));
    }

    #[tokio::test]
    async fn test_export_is_owner_scoped() {
        let (_, engine, update_id, ids) = seed(&["a"]).await;

        assert!(matches!(
            engine
                .export("intruder", Some(ExportMode::Batch), Some(&update_id), None)
                .await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            engine
                .export("intruder", Some(ExportMode::Single), Some(&ids[0]), None)
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_export_mode_parsing() {
        assert_eq!("single".parse::<ExportMode>().unwrap(), ExportMode::Single);
        assert_eq!("batch".parse::<ExportMode>().unwrap(), ExportMode::Batch);
        assert_eq!("list".parse::<ExportMode>().unwrap(), ExportMode::List);
        assert!("csv".parse::<ExportMode>().is_err());
    }
}
