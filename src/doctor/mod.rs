//! Doctor command for environment diagnostics
//!
//! Checks that Ollama is reachable and that both configured models are
//! installed.

use colored::Colorize;
use std::time::Duration;

use crate::config::Config;
use crate::ollama::OllamaClient;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics
pub struct Doctor {
    ollama_url: String,
    reasoning_model: String,
    vision_model: String,
}

impl Doctor {
    pub fn new(config: &Config) -> Self {
        Self {
            ollama_url: config.ollama_url(),
            reasoning_model: config.ollama.reasoning_model.clone(),
            vision_model: config.ollama.vision_model.clone(),
        }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let client = match OllamaClient::new(&self.ollama_url, Duration::from_secs(5)) {
            Ok(client) => client,
            Err(e) => {
                return vec![HealthCheck::new(
                    "Ollama API",
                    HealthStatus::Fail(format!("Cannot build client: {}", e)),
                )]
            }
        };

        if !client.health_check().await {
            return vec![HealthCheck::new(
                "Ollama API",
                HealthStatus::Fail(format!("Not reachable at {}", self.ollama_url)),
            )];
        }

        let mut checks = vec![HealthCheck::new("Ollama API", HealthStatus::Pass)];
        match client.list_models().await {
            Ok(installed) => {
                checks.push(model_check("Reasoning Model", &self.reasoning_model, &installed));
                checks.push(model_check("Vision Model", &self.vision_model, &installed));
            }
            Err(e) => checks.push(HealthCheck::new(
                "Models",
                HealthStatus::Fail(format!("Cannot list models: {}", e)),
            )),
        }

        checks
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n🔍 Ingredisense Diagnostics\n");
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let message = match &check.status {
                HealthStatus::Pass => "✅ PASS".green(),
                HealthStatus::Warn(msg) => format!("⚠️  WARN: {}", msg).as_str().yellow(),
                HealthStatus::Fail(msg) => format!("❌ FAIL: {}", msg).as_str().red(),
            };
            println!("{:<20} {}", check.name, message);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

/// Installed names may carry a `:latest` tag the config omits
fn model_check(name: &str, wanted: &str, installed: &[String]) -> HealthCheck {
    let found = installed
        .iter()
        .any(|model| model == wanted || model.strip_suffix(":latest") == Some(wanted));

    if found {
        HealthCheck::new(name, HealthStatus::Pass)
    } else {
        HealthCheck::new(
            name,
            HealthStatus::Fail(format!("{} not installed (ollama pull {})", wanted, wanted)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_check() {
        let installed = vec!["qwen2.5:7b-instruct".to_string(), "llava:latest".to_string()];
        assert_eq!(
            model_check("Reasoning", "qwen2.5:7b-instruct", &installed).status,
            HealthStatus::Pass
        );
        assert_eq!(model_check("Vision", "llava", &installed).status, HealthStatus::Pass);
        assert!(matches!(
            model_check("Vision", "llama3.2-vision:11b", &installed).status,
            HealthStatus::Fail(_)
        ));
    }

    #[test]
    fn test_overall_status() {
        let checks = vec![
            HealthCheck::new("A", HealthStatus::Pass),
            HealthCheck::new("B", HealthStatus::Warn("slow".into())),
        ];
        assert!(Doctor::overall_status(&checks));

        let checks = vec![HealthCheck::new("A", HealthStatus::Fail("down".into()))];
        assert!(!Doctor::overall_status(&checks));
    }

    #[tokio::test]
    async fn test_unreachable_ollama_fails_first_check() {
        let mut config = Config::default();
        config.ollama.port = 9;
        let checks = Doctor::new(&config).run_diagnostics().await;
        assert_eq!(checks.len(), 1);
        assert!(!Doctor::overall_status(&checks));
    }
}
