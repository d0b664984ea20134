//! Category classifier
//!
//! Resolves a brand string to a catalog category in three tiers:
//! 1. fixed keyword table (no network)
//! 2. catalog probe, bounded by a short timeout
//! 3. the default category

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::sources::{bounded, ProductCatalog};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Category used when nothing else resolves
pub const DEFAULT_CATEGORY: &str = "snacks";

/// Ordered keyword table: the first category with a matching keyword wins
pub type KeywordTable = &'static [(&'static str, &'static [&'static str])];

pub const DEFAULT_KEYWORDS: KeywordTable = &[
    ("chips", &["chips", "crisps", "nachos", "tortilla"]),
    ("crackers", &["crackers", "biscuits", "wafer"]),
    ("popcorn", &["popcorn", "corn puffs"]),
    ("pretzels", &["pretzels", "twist"]),
    ("cookies", &["cookies", "cookie", "oreo", "bourbon"]),
    ("chocolate", &["chocolate", "cocoa", "dark chocolate", "milk chocolate"]),
    ("candy", &["candy", "gummies", "lollipop", "toffee"]),
    ("noodles", &["noodles", "ramen", "instant noodles", "maggi", "pasta"]),
    ("ready meals", &["ready to eat", "instant meal", "meal kit"]),
    ("juice", &["juice", "nectar", "fruit drink"]),
    ("soda", &["cola", "soda", "fizzy", "soft drink", "pepsi", "coke"]),
    ("energy drinks", &["energy drink", "red bull", "monster"]),
    ("yogurt", &["yogurt", "yoghurt", "curd", "dahi"]),
    ("milk", &["milk", "dairy milk"]),
    ("cheese", &["cheese", "cheddar", "mozzarella"]),
    ("bread", &["bread", "loaf", "bun", "roll"]),
    ("cakes", &["cake", "muffin", "pastry", "cupcake"]),
    ("cereal", &["cereal", "cornflakes", "oats", "granola"]),
    ("ice cream", &["ice cream", "gelato", "frozen dessert"]),
    ("sauce", &["sauce", "ketchup", "mayo", "dressing"]),
];

/// Which tier produced a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Keyword,
    Api,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Keyword => "keyword",
            Provenance::Api => "api",
            Provenance::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved category tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub tag: String,
    pub provenance: Provenance,
}

/// Keyword tier on its own: first table entry with a keyword contained in
/// the lowercased brand.
pub fn keyword_category(table: KeywordTable, brand: &str) -> Option<&'static str> {
    let brand = brand.to_lowercase();
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| brand.contains(keyword)))
        .map(|(category, _)| *category)
}

/// Readable form of a catalog tag: `en:breakfast-cereals` -> `breakfast cereals`
pub fn humanize_tag(tag: &str) -> String {
    tag.trim_start_matches("en:").replace('-', " ")
}

/// Three-tier brand classifier
pub struct CategoryClassifier {
    catalog: Arc<dyn ProductCatalog>,
    probe_timeout: Duration,
    table: KeywordTable,
    telemetry: TelemetryCollector,
}

impl CategoryClassifier {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        probe_timeout: Duration,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self::with_table(catalog, probe_timeout, DEFAULT_KEYWORDS, telemetry)
    }

    pub fn with_table(
        catalog: Arc<dyn ProductCatalog>,
        probe_timeout: Duration,
        table: KeywordTable,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            catalog,
            probe_timeout,
            table,
            telemetry,
        }
    }

    /// Classify a brand. Never fails.
    pub async fn classify(&self, brand: &str) -> Category {
        let category = match keyword_category(self.table, brand) {
            Some(tag) => Category {
                tag: tag.to_string(),
                provenance: Provenance::Keyword,
            },
            None => self.probe(brand).await.unwrap_or_else(|| Category {
                tag: DEFAULT_CATEGORY.to_string(),
                provenance: Provenance::Fallback,
            }),
        };

        tracing::info!(
            brand,
            category = %category.tag,
            provenance = %category.provenance,
            "category resolved"
        );
        self.telemetry.record(TelemetryEvent::CategoryResolved {
            category: category.tag.clone(),
            provenance: category.provenance,
            timestamp: Instant::now(),
        });
        category
    }

    /// Catalog tier: last category tag of the top search hit
    async fn probe(&self, brand: &str) -> Option<Category> {
        let products = match bounded(self.probe_timeout, self.catalog.search(brand, 1)).await {
            Ok(products) => products,
            Err(e) => {
                tracing::debug!(brand, error = %e, "category probe failed");
                self.telemetry.source_degraded("catalog", brand, e.to_string());
                return None;
            }
        };

        let tag = products.first()?.categories_tags.last()?;
        let tag = humanize_tag(tag);
        if tag.trim().is_empty() {
            return None;
        }

        Some(Category {
            tag,
            provenance: Provenance::Api,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AnalysisError, Result};
    use crate::sources::CatalogProduct;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCatalog {
        calls: AtomicUsize,
        response: Option<Vec<CatalogProduct>>,
        delay: Duration,
    }

    impl CountingCatalog {
        fn new(response: Option<Vec<CatalogProduct>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl ProductCatalog for CountingCatalog {
        async fn search(&self, _terms: &str, _page_size: usize) -> Result<Vec<CatalogProduct>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.response
                .clone()
                .ok_or_else(|| AnalysisError::degraded("fake", "down"))
        }

        async fn category_products(&self, _: &str, _: usize) -> Result<Vec<CatalogProduct>> {
            unreachable!("classifier never lists categories")
        }
    }

    fn classifier(catalog: Arc<CountingCatalog>) -> CategoryClassifier {
        CategoryClassifier::new(catalog, Duration::from_millis(100), TelemetryCollector::new())
    }

    #[tokio::test]
    async fn test_keyword_hit_makes_no_network_call() {
        let catalog = Arc::new(CountingCatalog::new(None));
        let category = classifier(catalog.clone()).classify("XYZ Chips").await;

        assert_eq!(category.tag, "chips");
        assert_eq!(category.provenance, Provenance::Keyword);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_api_tier_uses_last_tag() {
        let product = CatalogProduct {
            categories_tags: vec!["en:foods".into(), "en:breakfast-spreads".into()],
            ..Default::default()
        };
        let catalog = Arc::new(CountingCatalog::new(Some(vec![product])));
        let category = classifier(catalog.clone()).classify("Nutella").await;

        assert_eq!(category.tag, "breakfast spreads");
        assert_eq!(category.provenance, Provenance::Api);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_when_catalog_fails() {
        let catalog = Arc::new(CountingCatalog::new(None));
        let category = classifier(catalog).classify("Zzyzx").await;
        assert_eq!(category.tag, DEFAULT_CATEGORY);
        assert_eq!(category.provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_when_probe_is_slow() {
        let catalog = Arc::new(CountingCatalog {
            delay: Duration::from_secs(5),
            ..CountingCatalog::new(Some(vec![]))
        });
        let telemetry = TelemetryCollector::new();
        let classifier =
            CategoryClassifier::new(catalog, Duration::from_millis(20), telemetry.clone());

        let category = classifier.classify("Zzyzx").await;
        assert_eq!(category.provenance, Provenance::Fallback);
        assert!(telemetry.was_degraded());
    }

    #[tokio::test]
    async fn test_keyword_classification_is_idempotent() {
        let catalog = Arc::new(CountingCatalog::new(None));
        let classifier = classifier(catalog);
        let first = classifier.classify("Maggi Masala").await;
        let second = classifier.classify("Maggi Masala").await;
        assert_eq!(first, second);
        assert_eq!(first.tag, "noodles");
    }

    #[test]
    fn test_table_order_decides_overlaps() {
        // "milk chocolate" hits chocolate before milk
        assert_eq!(keyword_category(DEFAULT_KEYWORDS, "Dairy Milk Chocolate"), Some("chocolate"));
        assert_eq!(keyword_category(DEFAULT_KEYWORDS, "Amul Milk"), Some("milk"));
        assert_eq!(keyword_category(DEFAULT_KEYWORDS, "Plain"), None);
    }

    #[test]
    fn test_custom_table() {
        const TABLE: KeywordTable = &[("tea", &["chai", "tea"])];
        assert_eq!(keyword_category(TABLE, "Masala Chai"), Some("tea"));
        assert_eq!(keyword_category(TABLE, "XYZ Chips"), None);
    }

    #[test]
    fn test_humanize_tag() {
        assert_eq!(humanize_tag("en:breakfast-cereals"), "breakfast cereals");
        assert_eq!(humanize_tag("snacks"), "snacks");
    }
}
