//! External knowledge sources
//!
//! Two unauthenticated HTTP sources feed the research stage: an
//! encyclopedia (free text per ingredient) and a product catalog (structured
//! product records). Neither is retried. Time limits are applied by the
//! caller with [`bounded`], one limit per call site.

pub mod openfoodfacts;
pub mod wikipedia;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{AnalysisError, Result};

pub use openfoodfacts::OpenFoodFacts;
pub use wikipedia::Wikipedia;

/// Encyclopedia lookups by article slug
#[async_trait]
pub trait EncyclopediaSource: Send + Sync {
    /// Lead text of the article at `slug`
    async fn article_intro(&self, slug: &str) -> Result<String>;
}

/// Product catalog lookups
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Full-text product search
    async fn search(&self, terms: &str, page_size: usize) -> Result<Vec<CatalogProduct>>;

    /// Products listed under a catalog category
    async fn category_products(&self, category: &str, page_size: usize)
        -> Result<Vec<CatalogProduct>>;
}

/// A product record as returned by the catalog.
///
/// Fields the ranking engine reads are typed; everything else is kept in
/// `extra` so the record can be echoed back as context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brands: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutriscore_grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nova_group: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergens_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels_tags: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CatalogProduct {
    /// Product name, treating blank as missing
    pub fn name(&self) -> Option<&str> {
        non_blank(self.product_name.as_deref())
    }

    /// Brand string, treating blank as missing
    pub fn brand(&self) -> Option<&str> {
        non_blank(self.brands.as_deref())
    }

    /// NOVA group, accepting numbers and numeric strings
    pub fn nova(&self) -> Option<i64> {
        match self.nova_group.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn has_label(&self, tag: &str) -> bool {
        self.labels_tags.iter().any(|label| label == tag)
    }

    /// Whether the record carries any data at all
    pub fn is_empty(&self) -> bool {
        *self == CatalogProduct::default()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Catalog search envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ProductPage {
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
}

/// Run `fut`, giving up after `limit`
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::Timeout {
            duration_ms: limit.as_millis() as u64,
        }),
    }
}
