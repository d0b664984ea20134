//! Alternative ranking engine
//!
//! Picks up to three healthier products from the same catalog category,
//! honoring the user's dietary constraints. Never fails: any external error
//! or an empty ranking yields the curated list for the category.

pub mod constraints;
pub mod fallback;
pub mod scorer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::category::DEFAULT_CATEGORY;
use crate::config::Config;
use crate::errors::{AnalysisError, Result};
use crate::sources::{bounded, ProductCatalog};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

pub use constraints::{ConstraintStrategy, DietConstraints, SubstringConstraints};
pub use fallback::curated_alternatives;
pub use scorer::{rank, score, Rejection, ScoredAlternative};

/// Alternatives returned per run
pub const MAX_ALTERNATIVES: usize = 3;

/// Time and size limits for the ranking engine
#[derive(Debug, Clone, Copy)]
pub struct RankingLimits {
    pub category_timeout: Duration,
    pub candidate_timeout: Duration,
    pub page_size: usize,
}

impl RankingLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            category_timeout: config.sources.catalog_timeout(),
            candidate_timeout: config.sources.candidate_timeout(),
            page_size: config.sources.candidate_page_size,
        }
    }
}

impl Default for RankingLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct AlternativeRanker {
    catalog: Arc<dyn ProductCatalog>,
    constraints: Box<dyn ConstraintStrategy>,
    telemetry: TelemetryCollector,
    limits: RankingLimits,
}

impl AlternativeRanker {
    pub fn new(catalog: Arc<dyn ProductCatalog>, telemetry: TelemetryCollector, limits: RankingLimits) -> Self {
        Self::with_strategy(catalog, Box::new(SubstringConstraints), telemetry, limits)
    }

    pub fn with_strategy(
        catalog: Arc<dyn ProductCatalog>,
        constraints: Box<dyn ConstraintStrategy>,
        telemetry: TelemetryCollector,
        limits: RankingLimits,
    ) -> Self {
        Self {
            catalog,
            constraints,
            telemetry,
            limits,
        }
    }

    /// Recommend alternatives for `brand`.
    ///
    /// `category` skips the engine's own category lookup when given.
    pub async fn recommend(
        &self,
        brand: &str,
        ingredients: &[String],
        health_text: &str,
        category: Option<&str>,
    ) -> Vec<String> {
        let category = match category {
            Some(category) => category.to_string(),
            None => match self.lookup_category(brand).await {
                Ok(category) => category,
                Err(e) => return self.fallback(DEFAULT_CATEGORY, &e.to_string()),
            },
        };

        tracing::debug!(brand, %category, ingredients = ingredients.len(), "ranking alternatives");
        let constraints = self.constraints.detect(health_text);

        let candidates = match bounded(
            self.limits.candidate_timeout,
            self.catalog.category_products(&category, self.limits.page_size),
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(e) => return self.fallback(&category, &e.to_string()),
        };

        let ranked = rank(&candidates, brand, &constraints);
        tracing::info!(
            category = %category,
            candidates = candidates.len(),
            eligible = ranked.len(),
            "alternatives ranked"
        );

        if ranked.is_empty() {
            return self.fallback(&category, "no eligible candidates");
        }

        ranked
            .iter()
            .take(MAX_ALTERNATIVES)
            .map(ScoredAlternative::justification)
            .collect()
    }

    /// First category tag of the top search hit, or the default category.
    ///
    /// A search answered with an error status still yields the default
    /// category; only transport failures and timeouts are errors.
    async fn lookup_category(&self, brand: &str) -> Result<String> {
        let products = match bounded(self.limits.category_timeout, self.catalog.search(brand, 1)).await {
            Ok(products) => products,
            Err(AnalysisError::SourceStatus { status, .. }) => {
                tracing::debug!(brand, status, "category search refused, using default");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let category = products
            .first()
            .and_then(|product| product.categories_tags.first())
            .map(|tag| tag.trim_start_matches("en:").to_string())
            .filter(|tag| !tag.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        Ok(category)
    }

    fn fallback(&self, category: &str, reason: &str) -> Vec<String> {
        tracing::warn!(category, reason, "using curated alternatives");
        self.telemetry.record(TelemetryEvent::AlternativesFallback {
            category: category.to_string(),
            reason: reason.to_string(),
            timestamp: Instant::now(),
        });
        curated_alternatives(category)
    }
}

impl std::fmt::Debug for AlternativeRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlternativeRanker")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::CatalogProduct;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCatalog {
        search_status: Option<u16>,
        search_tags: Option<Vec<String>>,
        listing: Option<Vec<CatalogProduct>>,
        listed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn search(&self, _terms: &str, _page_size: usize) -> Result<Vec<CatalogProduct>> {
            if let Some(status) = self.search_status {
                return Err(AnalysisError::SourceStatus {
                    source_name: "fake".into(),
                    status,
                });
            }
            match &self.search_tags {
                Some(tags) => Ok(vec![CatalogProduct {
                    categories_tags: tags.clone(),
                    ..Default::default()
                }]),
                None => Err(AnalysisError::degraded("fake", "search down")),
            }
        }

        async fn category_products(&self, category: &str, _: usize) -> Result<Vec<CatalogProduct>> {
            self.listed.lock().unwrap().push(category.to_string());
            self.listing
                .clone()
                .ok_or_else(|| AnalysisError::degraded("fake", "listing down"))
        }
    }

    fn candidate(name: &str, brand: &str, grade: &str, nova: i64, labels: &[&str]) -> CatalogProduct {
        CatalogProduct {
            product_name: Some(name.into()),
            brands: Some(brand.into()),
            nutriscore_grade: Some(grade.into()),
            nova_group: Some(nova.into()),
            labels_tags: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    fn ranker(catalog: Arc<FakeCatalog>, telemetry: TelemetryCollector) -> AlternativeRanker {
        AlternativeRanker::new(catalog, telemetry, RankingLimits::default())
    }

    #[tokio::test]
    async fn test_own_lookup_uses_first_tag() {
        let catalog = Arc::new(FakeCatalog {
            search_tags: Some(vec!["en:snacks".into(), "en:salty-snacks".into()]),
            listing: Some(vec![candidate("Puffs", "Acme", "a", 1, &[])]),
            ..Default::default()
        });
        let picks = ranker(catalog.clone(), TelemetryCollector::new())
            .recommend("Lays", &[], "", None)
            .await;

        assert_eq!(catalog.listed.lock().unwrap().as_slice(), ["snacks"]);
        assert_eq!(
            picks,
            vec!["Acme Puffs (Why it's better: Nutriscore A rating, minimally processed, available at major grocery stores)"]
        );
    }

    #[tokio::test]
    async fn test_given_category_skips_lookup() {
        let catalog = Arc::new(FakeCatalog {
            listing: Some(vec![candidate("Puffs", "Acme", "b", 3, &[])]),
            ..Default::default()
        });
        let picks = ranker(catalog.clone(), TelemetryCollector::new())
            .recommend("Lays", &[], "", Some("chips"))
            .await;

        assert_eq!(catalog.listed.lock().unwrap().as_slice(), ["chips"]);
        assert_eq!(picks.len(), 1);
    }

    #[tokio::test]
    async fn test_top_three_in_score_order() {
        let catalog = Arc::new(FakeCatalog {
            listing: Some(vec![
                candidate("E", "Brand1", "e", 4, &[]),
                candidate("A", "Brand2", "a", 1, &["en:organic"]),
                candidate("C", "Brand3", "c", 3, &[]),
                candidate("B", "Brand4", "b", 2, &[]),
            ]),
            ..Default::default()
        });
        let picks = ranker(catalog, TelemetryCollector::new())
            .recommend("Lays", &[], "", Some("chips"))
            .await;

        assert_eq!(picks.len(), 3);
        assert!(picks[0].starts_with("Brand2 A"));
        assert!(picks[1].starts_with("Brand4 B"));
        assert!(picks[2].starts_with("Brand3 C"));
    }

    #[tokio::test]
    async fn test_vegan_user_excludes_unlabelled_products() {
        let catalog = Arc::new(FakeCatalog {
            listing: Some(vec![
                candidate("Cheese Puffs", "Acme", "a", 1, &[]),
                candidate("Veggie Stix", "Too Yumm", "c", 3, &["en:vegan"]),
            ]),
            ..Default::default()
        });
        let picks = ranker(catalog, TelemetryCollector::new())
            .recommend("Lays", &[], "diabetic and trying to stay vegan", Some("chips"))
            .await;

        assert_eq!(picks.len(), 1);
        assert!(picks[0].starts_with("Too Yumm Veggie Stix"));
    }

    #[tokio::test]
    async fn test_catalog_failure_yields_curated_list() {
        let catalog = Arc::new(FakeCatalog::default());
        let telemetry = TelemetryCollector::new();
        let picks = ranker(catalog, telemetry.clone())
            .recommend("Oreo", &[], "", Some("cookies"))
            .await;

        assert_eq!(picks, curated_alternatives("cookies"));
        assert_eq!(telemetry.get_stats().alternatives_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_falls_back_to_generic() {
        let catalog = Arc::new(FakeCatalog::default());
        let picks = ranker(catalog.clone(), TelemetryCollector::new())
            .recommend("Oreo", &[], "", None)
            .await;

        assert_eq!(picks, curated_alternatives(DEFAULT_CATEGORY));
        assert!(catalog.listed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refused_lookup_still_lists_default_category() {
        let catalog = Arc::new(FakeCatalog {
            search_status: Some(503),
            listing: Some(vec![candidate("Puffs", "Acme", "a", 1, &[])]),
            ..Default::default()
        });
        let telemetry = TelemetryCollector::new();
        let picks = ranker(catalog.clone(), telemetry.clone())
            .recommend("Oreo", &[], "", None)
            .await;

        assert_eq!(catalog.listed.lock().unwrap().as_slice(), [DEFAULT_CATEGORY]);
        assert_eq!(picks.len(), 1);
        assert!(picks[0].starts_with("Acme Puffs"));
        assert_eq!(telemetry.get_stats().alternatives_fallbacks, 0);
    }

    #[tokio::test]
    async fn test_empty_ranking_yields_curated_list() {
        let catalog = Arc::new(FakeCatalog {
            listing: Some(vec![candidate("Classic", "Lays", "a", 1, &[])]),
            ..Default::default()
        });
        let picks = ranker(catalog, TelemetryCollector::new())
            .recommend("Lays", &[], "", Some("noodles"))
            .await;
        assert_eq!(picks, curated_alternatives("noodles"));
    }
}
