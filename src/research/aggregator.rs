//! Evidence aggregator
//!
//! Gathers encyclopedia text and a catalog record for every ingredient,
//! then asks the reasoning gateway for all profiles in one batched call.
//!
//! Concurrency model:
//! - one task per ingredient for the encyclopedia, at most
//!   `max_concurrent` in flight (semaphore-bounded)
//! - each task has its own timeout and writes only its own slot
//! - all tasks are joined before the catalog pass starts
//! - catalog lookups run one after another

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::errors::Result;
use crate::gateway::{decode_json, ReasoningGateway};
use crate::prompts;
use crate::sources::{bounded, wikipedia, CatalogProduct, EncyclopediaSource, ProductCatalog};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::types::profile::{clamp_nova, DEFAULT_NOVA};
use crate::types::IngredientProfile;

/// Characters of encyclopedia text kept per ingredient
const ENCYCLOPEDIA_EXCERPT: usize = 200;

/// Characters of catalog JSON kept per ingredient
const CATALOG_EXCERPT: usize = 100;

/// Time and concurrency limits for the aggregator
#[derive(Debug, Clone, Copy)]
pub struct AggregatorLimits {
    pub encyclopedia_timeout: Duration,
    pub catalog_timeout: Duration,
    pub max_concurrent: usize,
}

impl AggregatorLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            encyclopedia_timeout: config.sources.encyclopedia_timeout(),
            catalog_timeout: config.sources.catalog_timeout(),
            max_concurrent: config.research.max_concurrent_fetches.max(1),
        }
    }
}

impl Default for AggregatorLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Evidence gathered for one ingredient before enrichment
#[derive(Debug, Clone, Default)]
pub struct IngredientEvidence {
    pub name: String,
    pub encyclopedia: String,
    pub catalog: Option<CatalogProduct>,
}

impl IngredientEvidence {
    /// Context line handed to the batched enrichment prompt
    pub fn context_line(&self) -> String {
        let mut context = format!("- {}", self.name);

        if !self.encyclopedia.is_empty() {
            let excerpt: String = self.encyclopedia.chars().take(ENCYCLOPEDIA_EXCERPT).collect();
            context.push_str(&format!("\n  Wikipedia: {}...", excerpt));
        }

        if let Some(product) = self.catalog.as_ref().filter(|p| !p.is_empty()) {
            let json = serde_json::to_string(product).unwrap_or_default();
            let excerpt: String = json.chars().take(CATALOG_EXCERPT).collect();
            context.push_str(&format!("\n  OpenFoodFacts: {}...", excerpt));
        }

        context
    }
}

/// Parallel multi-source evidence aggregator
pub struct EvidenceAggregator {
    encyclopedia: Arc<dyn EncyclopediaSource>,
    catalog: Arc<dyn ProductCatalog>,
    gateway: Arc<dyn ReasoningGateway>,
    telemetry: TelemetryCollector,
    limits: AggregatorLimits,
}

impl EvidenceAggregator {
    pub fn new(
        encyclopedia: Arc<dyn EncyclopediaSource>,
        catalog: Arc<dyn ProductCatalog>,
        gateway: Arc<dyn ReasoningGateway>,
        telemetry: TelemetryCollector,
        limits: AggregatorLimits,
    ) -> Self {
        Self {
            encyclopedia,
            catalog,
            gateway,
            telemetry,
            limits,
        }
    }

    /// Profile every ingredient.
    ///
    /// Never fails: the result always has one profile per ingredient, in
    /// input order.
    pub async fn research(&self, ingredients: &[String]) -> Vec<IngredientProfile> {
        if ingredients.is_empty() {
            return Vec::new();
        }

        tracing::info!(count = ingredients.len(), "researching ingredients");
        let evidence = self.gather(ingredients).await;

        let prompt = prompts::enrichment(&evidence);
        let decoded = match self.gateway.freeform(&prompt).await {
            Ok(text) => decode_json::<Vec<Value>>(&text),
            Err(e) => Err(e),
        };

        let profiles = self.assemble(ingredients, decoded);
        tracing::info!(count = profiles.len(), "ingredient profiles ready");
        profiles
    }

    /// Collect evidence from both sources
    pub async fn gather(&self, ingredients: &[String]) -> Vec<IngredientEvidence> {
        let started = Instant::now();
        let encyclopedia = self.fetch_encyclopedia(ingredients).await;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "encyclopedia fan-out joined"
        );

        let mut evidence = Vec::with_capacity(ingredients.len());
        for (name, text) in ingredients.iter().zip(encyclopedia) {
            let catalog = self.fetch_catalog(name).await;
            evidence.push(IngredientEvidence {
                name: name.clone(),
                encyclopedia: text,
                catalog,
            });
        }
        evidence
    }

    /// One bounded task per ingredient, joined before returning
    async fn fetch_encyclopedia(&self, ingredients: &[String]) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(self.limits.max_concurrent));
        self.telemetry.record(TelemetryEvent::ParallelDispatch {
            task_count: ingredients.len(),
            timestamp: Instant::now(),
        });

        let handles: Vec<_> = ingredients
            .iter()
            .cloned()
            .map(|ingredient| {
                let semaphore = semaphore.clone();
                let source = self.encyclopedia.clone();
                let telemetry = self.telemetry.clone();
                let limit = self.limits.encyclopedia_timeout;

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return String::new(),
                    };

                    let slug = wikipedia::slug(&ingredient);
                    match bounded(limit, source.article_intro(&slug)).await {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::debug!(ingredient = %ingredient, error = %e, "encyclopedia unavailable");
                            telemetry.source_degraded("encyclopedia", &ingredient, e.to_string());
                            String::new()
                        }
                    }
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(ingredients)
            .map(|(joined, ingredient)| match joined {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(ingredient = %ingredient, error = %e, "encyclopedia task aborted");
                    self.telemetry
                        .source_degraded("encyclopedia", ingredient, e.to_string());
                    String::new()
                }
            })
            .collect()
    }

    async fn fetch_catalog(&self, ingredient: &str) -> Option<CatalogProduct> {
        match bounded(self.limits.catalog_timeout, self.catalog.search(ingredient, 1)).await {
            Ok(products) => products.into_iter().next(),
            Err(e) => {
                tracing::debug!(ingredient, error = %e, "catalog unavailable");
                self.telemetry.source_degraded("catalog", ingredient, e.to_string());
                None
            }
        }
    }

    /// Map the decoded response onto the ingredient list by position
    fn assemble(
        &self,
        ingredients: &[String],
        decoded: Result<Vec<Value>>,
    ) -> Vec<IngredientProfile> {
        let (profiles, fallbacks) = assemble_profiles(ingredients, decoded);
        for (index, reason) in fallbacks {
            self.telemetry.record(TelemetryEvent::ProfileFallback {
                index,
                reason,
                timestamp: Instant::now(),
            });
        }
        profiles
    }
}

/// Build exactly one profile per ingredient from a decoded enrichment
/// response.
///
/// A failed decode yields the unavailable profile everywhere. Otherwise
/// element `i` describes ingredient `i`; missing elements fall back
/// individually and surplus elements are ignored. Returns the profiles plus
/// the `(index, reason)` of every fallback taken.
pub fn assemble_profiles(
    ingredients: &[String],
    decoded: Result<Vec<Value>>,
) -> (Vec<IngredientProfile>, Vec<(usize, String)>) {
    let elements = match decoded {
        Ok(elements) => elements,
        Err(e) => {
            tracing::error!(error = %e, "batched ingredient analysis failed");
            let reason = e.to_string();
            return (
                ingredients
                    .iter()
                    .map(|name| IngredientProfile::unavailable(name))
                    .collect(),
                (0..ingredients.len()).map(|i| (i, reason.clone())).collect(),
            );
        }
    };

    if elements.len() != ingredients.len() {
        tracing::warn!(
            expected = ingredients.len(),
            received = elements.len(),
            "profile count mismatch"
        );
    }

    let mut fallbacks = Vec::new();
    let profiles = ingredients
        .iter()
        .enumerate()
        .map(|(i, name)| match elements.get(i) {
            Some(Value::Object(fields)) => profile_from_fields(name, fields),
            Some(_) => {
                tracing::warn!(index = i, "profile element is not an object");
                fallbacks.push((i, "element is not an object".to_string()));
                IngredientProfile::malformed(name)
            }
            None => {
                fallbacks.push((i, "missing from response".to_string()));
                IngredientProfile::unavailable(name)
            }
        })
        .collect();

    (profiles, fallbacks)
}

fn profile_from_fields(ingredient: &str, fields: &serde_json::Map<String, Value>) -> IngredientProfile {
    let text = |key: &str, default: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };

    let nova_score = match fields.get("nova_score") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(clamp_nova)
            .unwrap_or(DEFAULT_NOVA),
        Some(Value::String(s)) => s.trim().parse().map(clamp_nova).unwrap_or(DEFAULT_NOVA),
        _ => DEFAULT_NOVA,
    };

    IngredientProfile {
        name: text("name", ingredient),
        manufacturing: text("manufacturing", "Unknown"),
        regulatory_gap: text("regulatory_gap", "No data"),
        health_risks: text("health_risks", "No data"),
        nova_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AnalysisError;
    use async_trait::async_trait;
    use quickcheck_macros::quickcheck;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Fails, stalls or panics depending on the slug's first word
    #[derive(Default)]
    struct ScriptedEncyclopedia {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EncyclopediaSource for ScriptedEncyclopedia {
        async fn article_intro(&self, slug: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if slug.starts_with("Fail_") {
                return Err(AnalysisError::degraded("wikipedia", "404"));
            }
            if slug.starts_with("Slow_") {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            if slug.starts_with("Panic_") {
                panic!("encyclopedia blew up on {}", slug);
            }
            Ok(format!("{} intro", slug))
        }
    }

    #[derive(Default)]
    struct EmptyCatalog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProductCatalog for EmptyCatalog {
        async fn search(&self, _terms: &str, _page_size: usize) -> Result<Vec<CatalogProduct>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn category_products(&self, _: &str, _: usize) -> Result<Vec<CatalogProduct>> {
            Ok(Vec::new())
        }
    }

    struct CountingGateway {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl CountingGateway {
        fn replying(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(String::from),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReasoningGateway for CountingGateway {
        async fn freeform(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| AnalysisError::Gateway("offline".into()))
        }

        async fn structured(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
            Err(AnalysisError::Gateway("offline".into()))
        }
    }

    struct Fixture {
        aggregator: EvidenceAggregator,
        encyclopedia: Arc<ScriptedEncyclopedia>,
        catalog: Arc<EmptyCatalog>,
        gateway: Arc<CountingGateway>,
        telemetry: TelemetryCollector,
    }

    fn fixture(reply: Option<&str>) -> Fixture {
        let encyclopedia = Arc::new(ScriptedEncyclopedia::default());
        let catalog = Arc::new(EmptyCatalog::default());
        let gateway = Arc::new(CountingGateway::replying(reply));
        let telemetry = TelemetryCollector::new();
        let aggregator = EvidenceAggregator::new(
            encyclopedia.clone(),
            catalog.clone(),
            gateway.clone(),
            telemetry.clone(),
            AggregatorLimits {
                encyclopedia_timeout: Duration::from_millis(100),
                catalog_timeout: Duration::from_millis(100),
                max_concurrent: 2,
            },
        );

        Fixture {
            aggregator,
            encyclopedia,
            catalog,
            gateway,
            telemetry,
        }
    }

    #[tokio::test]
    async fn test_empty_list_makes_no_calls() {
        let f = fixture(Some("[]"));
        let profiles = f.aggregator.research(&[]).await;

        assert!(profiles.is_empty());
        assert_eq!(f.gateway.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.encyclopedia.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.catalog.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.telemetry.event_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_slow_and_panicking_tasks_only_blank_their_slot() {
        let f = fixture(None);
        let ingredients = names(&["Salt", "Fail Dye", "Slow Gum", "Panic Powder", "Sugar"]);

        let evidence = f.aggregator.gather(&ingredients).await;
        let texts: Vec<&str> = evidence.iter().map(|e| e.encyclopedia.as_str()).collect();
        assert_eq!(texts, vec!["Salt intro", "", "", "", "Sugar intro"]);

        let aligned: Vec<&str> = evidence.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(aligned, ingredients.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(f.telemetry.get_stats().degraded_sources, 3);
        assert_eq!(f.catalog.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_gateway_failure_still_profiles_every_ingredient() {
        let f = fixture(None);
        let ingredients = names(&["Salt", "Fail Dye", "Panic Powder"]);

        let profiles = f.aggregator.research(&ingredients).await;
        assert_eq!(
            profiles,
            vec![
                IngredientProfile::unavailable("Salt"),
                IngredientProfile::unavailable("Fail Dye"),
                IngredientProfile::unavailable("Panic Powder"),
            ]
        );
        assert_eq!(f.gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.telemetry.get_stats().profile_fallbacks, 3);
    }

    #[quickcheck]
    fn prop_research_aligns_with_any_ingredient_list(ingredients: Vec<String>) -> bool {
        // Keep the scripted failure modes out of the generated names
        let ingredients: Vec<String> = ingredients
            .into_iter()
            .map(|name| format!("Item {}", name))
            .collect();

        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(_) => return false,
        };
        let profiles = runtime.block_on(async {
            fixture(Some("not json at all")).aggregator.research(&ingredients).await
        });

        profiles.len() == ingredients.len()
            && profiles
                .iter()
                .zip(&ingredients)
                .all(|(profile, name)| *profile == IngredientProfile::unavailable(name))
    }

    #[test]
    fn test_decode_failure_defaults_everywhere() {
        let ingredients = names(&["Titanium Dioxide"]);
        let (profiles, fallbacks) =
            assemble_profiles(&ingredients, Err(AnalysisError::Decode("bad".into())));

        assert_eq!(profiles, vec![IngredientProfile::unavailable("Titanium Dioxide")]);
        assert_eq!(fallbacks.len(), 1);
    }

    #[test]
    fn test_fields_default_individually() {
        let ingredients = names(&["Sugar"]);
        let (profiles, fallbacks) =
            assemble_profiles(&ingredients, Ok(vec![json!({"manufacturing": "Refined"})]));

        let p = &profiles[0];
        assert_eq!(p.name, "Sugar");
        assert_eq!(p.manufacturing, "Refined");
        assert_eq!(p.regulatory_gap, "No data");
        assert_eq!(p.health_risks, "No data");
        assert_eq!(p.nova_score, 3);
        assert!(fallbacks.is_empty());
    }

    #[test]
    fn test_short_response_pads_by_position() {
        let ingredients = names(&["Oats", "Sugar", "Salt"]);
        let (profiles, fallbacks) = assemble_profiles(
            &ingredients,
            Ok(vec![json!({"name": "Oats", "nova_score": 1})]),
        );

        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].nova_score, 1);
        assert_eq!(profiles[1], IngredientProfile::unavailable("Sugar"));
        assert_eq!(profiles[2], IngredientProfile::unavailable("Salt"));
        assert_eq!(fallbacks.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_long_response_is_truncated() {
        let ingredients = names(&["Oats"]);
        let (profiles, _) = assemble_profiles(
            &ingredients,
            Ok(vec![json!({"name": "Oats"}), json!({"name": "Extra"})]),
        );
        assert_eq!(profiles.len(), 1);
    }

    #[test]
    fn test_non_object_element() {
        let ingredients = names(&["Oats"]);
        let (profiles, fallbacks) = assemble_profiles(&ingredients, Ok(vec![json!("Oats")]));
        assert_eq!(profiles[0], IngredientProfile::malformed("Oats"));
        assert_eq!(fallbacks.len(), 1);
    }

    #[test]
    fn test_nova_is_clamped_and_parsed() {
        let ingredients = names(&["A", "B", "C"]);
        let (profiles, _) = assemble_profiles(
            &ingredients,
            Ok(vec![
                json!({"nova_score": 7}),
                json!({"nova_score": "2"}),
                json!({"nova_score": 3.6}),
            ]),
        );
        assert_eq!(profiles[0].nova_score, 4);
        assert_eq!(profiles[1].nova_score, 2);
        assert_eq!(profiles[2].nova_score, 4);
    }

    #[test]
    fn test_context_line_with_both_sources() {
        let evidence = IngredientEvidence {
            name: "Salt".into(),
            encyclopedia: "x".repeat(500),
            catalog: Some(CatalogProduct {
                product_name: Some("Table Salt".into()),
                ..Default::default()
            }),
        };
        let line = evidence.context_line();
        assert!(line.starts_with("- Salt\n  Wikipedia: "));
        assert!(line.contains(&format!("{}...", "x".repeat(200))));
        assert!(!line.contains(&"x".repeat(201)));
        assert!(line.contains("\n  OpenFoodFacts: {\"product_name\":\"Table Salt\"}..."));
    }

    #[test]
    fn test_context_line_without_sources() {
        let evidence = IngredientEvidence {
            name: "Salt".into(),
            ..Default::default()
        };
        assert_eq!(evidence.context_line(), "- Salt");
    }
}
