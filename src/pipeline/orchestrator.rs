//! Pipeline orchestrator
//!
//! Runs the five stages strictly in order against a single `AnalysisState`.
//! Extraction errors abort the run; every later stage recovers locally with
//! a fixed default so the run always reaches synthesis.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;

use super::stage::Stage;
use crate::alternatives::{curated_alternatives, AlternativeRanker, RankingLimits};
use crate::category::{CategoryClassifier, DEFAULT_CATEGORY};
use crate::config::Config;
use crate::decision::extract_color;
use crate::errors::{AnalysisError, Result};
use crate::gateway::{OllamaGateway, ReasoningGateway};
use crate::ollama::OllamaClient;
use crate::prompts::{self, SynthesisInput};
use crate::research::{AggregatorLimits, EvidenceAggregator};
use crate::sources::{EncyclopediaSource, OpenFoodFacts, ProductCatalog, Wikipedia};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::types::{AnalysisResult, AnalysisState, IngredientProfile, StatePatch};
use crate::vision::{extract_label, OllamaVision, VisionService};

/// Risk analysis used when the gateway cannot produce one
pub const RISK_UNAVAILABLE: &str = "Risk analysis unavailable.";

/// Everything a pipeline talks to
pub struct Collaborators {
    pub vision: Arc<dyn VisionService>,
    pub gateway: Arc<dyn ReasoningGateway>,
    pub encyclopedia: Arc<dyn EncyclopediaSource>,
    pub catalog: Arc<dyn ProductCatalog>,
}

/// Label-to-advice analysis pipeline
pub struct Pipeline {
    vision: Arc<dyn VisionService>,
    gateway: Arc<dyn ReasoningGateway>,
    aggregator: EvidenceAggregator,
    classifier: CategoryClassifier,
    ranker: AlternativeRanker,
    classify_category: bool,
    telemetry: TelemetryCollector,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, config: &Config, telemetry: TelemetryCollector) -> Self {
        let aggregator = EvidenceAggregator::new(
            collaborators.encyclopedia,
            collaborators.catalog.clone(),
            collaborators.gateway.clone(),
            telemetry.clone(),
            AggregatorLimits::from_config(config),
        );
        let classifier = CategoryClassifier::new(
            collaborators.catalog.clone(),
            config.sources.category_probe_timeout(),
            telemetry.clone(),
        );
        let ranker = AlternativeRanker::new(
            collaborators.catalog,
            telemetry.clone(),
            RankingLimits::from_config(config),
        );

        Self {
            vision: collaborators.vision,
            gateway: collaborators.gateway,
            aggregator,
            classifier,
            ranker,
            classify_category: config.research.classify_category,
            telemetry,
        }
    }

    /// Wire the pipeline to Ollama and the public HTTP sources
    pub fn from_config(config: &Config) -> Result<Self> {
        let ollama = OllamaClient::new(
            &config.ollama_url(),
            Duration::from_secs(config.ollama.request_timeout_sec),
        )?;
        // Label reading waits as long as the vision model needs
        let vision = OllamaClient::without_timeout(&config.ollama_url())?;
        let http = Client::builder()
            .user_agent(config.sources.user_agent.as_str())
            .build()?;

        let collaborators = Collaborators {
            vision: Arc::new(OllamaVision::from_config(vision, config)),
            gateway: Arc::new(OllamaGateway::from_config(ollama, config)),
            encyclopedia: Arc::new(Wikipedia::from_config(http.clone(), &config.sources)),
            catalog: Arc::new(OpenFoodFacts::from_config(http, &config.sources)),
        };

        Ok(Self::new(collaborators, config, TelemetryCollector::new()))
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    /// Analyze the label at `image_path` for a user described by `health`.
    ///
    /// Fails only when the label cannot be read. Telemetry is reset at the
    /// start of every call, so it describes the latest run only.
    pub async fn analyze(&self, image_path: &Path, health: &str) -> Result<AnalysisResult> {
        self.telemetry.reset();
        let mut state = AnalysisState::new(image_path, health);
        tracing::info!(run_id = %state.run_id, image = %image_path.display(), "analysis started");

        let mut stage = Stage::Extract;
        while !stage.is_terminal() {
            self.telemetry.record(TelemetryEvent::StageStarted {
                stage,
                timestamp: Instant::now(),
            });
            let started = Instant::now();
            let outcome = self.execute(stage, &state).await;

            self.telemetry.record(TelemetryEvent::StageCompleted {
                stage,
                duration_ms: started.elapsed().as_millis() as u64,
                success: outcome.is_ok(),
                timestamp: Instant::now(),
            });

            let patch = match outcome {
                Ok(patch) => patch,
                Err(e) if stage.is_fatal_on_error() => {
                    stage.transition(Stage::Failed)?;
                    tracing::error!(run_id = %state.run_id, stage = ?stage, error = %e, "analysis aborted");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(stage = ?stage, error = %e, "stage degraded, using defaults");
                    self.recover(stage, &state)
                }
            };
            state.apply(patch);

            let next = stage.next().unwrap_or(Stage::Complete);
            stage = stage.transition(next)?;
        }

        tracing::info!(
            run_id = %state.run_id,
            elapsed_ms = self.telemetry.elapsed().as_millis() as u64,
            degraded = self.telemetry.was_degraded(),
            "analysis complete"
        );
        Ok(state.into_result())
    }

    async fn execute(&self, stage: Stage, state: &AnalysisState) -> Result<StatePatch> {
        match stage {
            Stage::Extract => self.extract(state).await,
            Stage::Profile => self.profile(state).await,
            Stage::Research => Ok(self.research(state).await),
            Stage::Analyze => self.analyze_risk(state).await,
            Stage::Synthesize => self.synthesize(state).await,
            Stage::Complete | Stage::Failed => Err(AnalysisError::InvalidTransition {
                from: format!("{:?}", stage),
                to: "execution".to_string(),
            }),
        }
    }

    async fn extract(&self, state: &AnalysisState) -> Result<StatePatch> {
        let label = extract_label(self.vision.as_ref(), self.gateway.as_ref(), &state.image_path).await?;

        Ok(StatePatch {
            brand_name: Some(label.brand),
            ingredients: Some(label.ingredients),
            nutrition: label.nutrition,
            ..Default::default()
        })
    }

    async fn profile(&self, state: &AnalysisState) -> Result<StatePatch> {
        let profile = self
            .gateway
            .freeform(&prompts::clinical_profile(&state.user_raw_health))
            .await?;

        Ok(StatePatch {
            clinical_profile: Some(profile),
            ..Default::default()
        })
    }

    /// Ingredient knowledge, then alternatives
    async fn research(&self, state: &AnalysisState) -> StatePatch {
        let brand = state.brand();
        let ingredients = state.ingredient_list();

        let knowledge = self.aggregator.research(ingredients).await;

        let category = if self.classify_category {
            Some(self.classifier.classify(brand).await.tag)
        } else {
            None
        };
        let alternatives = self
            .ranker
            .recommend(brand, ingredients, &state.user_raw_health, category.as_deref())
            .await;

        StatePatch {
            knowledge_base: Some(knowledge),
            alternatives: Some(alternatives),
            ..Default::default()
        }
    }

    async fn analyze_risk(&self, state: &AnalysisState) -> Result<StatePatch> {
        let prompt = prompts::risk_analysis(state.profile_text(), state.knowledge());
        let risk = self.gateway.freeform(&prompt).await?;

        Ok(StatePatch {
            risk_analysis: Some(risk),
            ..Default::default()
        })
    }

    async fn synthesize(&self, state: &AnalysisState) -> Result<StatePatch> {
        let prompt = prompts::synthesis(&SynthesisInput {
            brand: state.brand(),
            ingredients: state.ingredient_list(),
            nutrition: state.nutrition.as_ref(),
            clinical_profile: state.profile_text(),
            risk_analysis: state.risk_analysis.as_deref().unwrap_or(RISK_UNAVAILABLE),
            knowledge: state.knowledge(),
            alternatives: state.alternative_list(),
        });
        let insight = self.gateway.freeform(&prompt).await?;

        let missing = prompts::missing_sections(&insight);
        if missing.is_empty() {
            tracing::debug!("advisory has every expected section");
        } else {
            tracing::warn!(?missing, "advisory is missing sections");
        }

        Ok(StatePatch {
            decision_color: Some(extract_color(&insight)),
            final_insight: Some(insight),
            ..Default::default()
        })
    }

    /// Default patch for a soft-failing stage
    fn recover(&self, stage: Stage, state: &AnalysisState) -> StatePatch {
        match stage {
            Stage::Profile => StatePatch {
                clinical_profile: Some(state.user_raw_health.clone()),
                ..Default::default()
            },
            Stage::Research => StatePatch {
                knowledge_base: Some(
                    state
                        .ingredient_list()
                        .iter()
                        .map(|name| IngredientProfile::unavailable(name))
                        .collect(),
                ),
                alternatives: Some(curated_alternatives(DEFAULT_CATEGORY)),
                ..Default::default()
            },
            Stage::Analyze => StatePatch {
                risk_analysis: Some(RISK_UNAVAILABLE.to_string()),
                ..Default::default()
            },
            Stage::Synthesize => {
                let insight = fallback_advisory(state.brand());
                StatePatch {
                    decision_color: Some(extract_color(&insight)),
                    final_insight: Some(insight),
                    ..Default::default()
                }
            }
            Stage::Extract | Stage::Complete | Stage::Failed => StatePatch::default(),
        }
    }
}

/// Advisory shown when synthesis fails
pub fn fallback_advisory(brand: &str) -> String {
    format!(
        "I couldn't finish a full analysis of {} right now. Compare the ingredient list \
         with your health needs yourself, and try again in a moment.",
        brand
    )
}
