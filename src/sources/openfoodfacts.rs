//! OpenFoodFacts product catalog

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{CatalogProduct, ProductCatalog, ProductPage};
use crate::config::SourcesConfig;
use crate::errors::{AnalysisError, Result};

const SOURCE_NAME: &str = "openfoodfacts";

/// Fields requested when listing a category
const CATEGORY_FIELDS: &str =
    "product_name,brands,nutriscore_grade,nova_group,ingredients_text,allergens_tags,labels_tags";

/// Catalog client for the OpenFoodFacts search and category endpoints
#[derive(Debug, Clone)]
pub struct OpenFoodFacts {
    client: Client,
    search_url: String,
    category_url: String,
}

impl OpenFoodFacts {
    pub fn new(client: Client, search_url: impl Into<String>, category_url: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            category_url: category_url.into(),
        }
    }

    pub fn from_config(client: Client, config: &SourcesConfig) -> Self {
        Self::new(
            client,
            config.catalog_search_url.clone(),
            config.catalog_category_url.clone(),
        )
    }

    fn category_page_url(&self, category: &str) -> Result<Url> {
        let mut url = Url::parse(&self.category_url)
            .map_err(|e| AnalysisError::ConfigError(format!("bad catalog url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AnalysisError::ConfigError("catalog url cannot hold a path".into()))?
            .pop_if_empty()
            .push(&format!("{}.json", category));
        Ok(url)
    }

    async fn fetch_page(&self, request: reqwest::RequestBuilder) -> Result<Vec<CatalogProduct>> {
        let response = request
            .send()
            .await
            .map_err(|e| AnalysisError::degraded(SOURCE_NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::SourceStatus {
                source_name: SOURCE_NAME.to_string(),
                status: response.status().as_u16(),
            });
        }

        let page: ProductPage = response
            .json()
            .await
            .map_err(|e| AnalysisError::degraded(SOURCE_NAME, format!("bad payload: {}", e)))?;

        Ok(page.products)
    }
}

#[async_trait]
impl ProductCatalog for OpenFoodFacts {
    async fn search(&self, terms: &str, page_size: usize) -> Result<Vec<CatalogProduct>> {
        let page_size = page_size.to_string();
        let request = self.client.get(&self.search_url).query(&[
            ("search_terms", terms),
            ("json", "1"),
            ("page_size", page_size.as_str()),
        ]);

        self.fetch_page(request).await
    }

    async fn category_products(
        &self,
        category: &str,
        page_size: usize,
    ) -> Result<Vec<CatalogProduct>> {
        let url = self.category_page_url(category)?;
        let page_size = page_size.to_string();
        let request = self.client.get(url).query(&[
            ("page_size", page_size.as_str()),
            ("json", "1"),
            ("fields", CATEGORY_FIELDS),
        ]);

        let products = self.fetch_page(request).await?;
        tracing::debug!(category, count = products.len(), "catalog category listed");
        Ok(products)
    }
}
