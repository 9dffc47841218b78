use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::event_bus::{Event, EventBus};

/// Trait representing a text-generation provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Send a prompt to the provider and return the reply text.
    async fn send_prompt(&self, prompt: &str) -> Result<String>;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }
}

/// Offline provider that answers every request with the same plan.
pub struct LocalProvider;

impl LocalProvider {
    const SAMPLE_PLAN: &'static str = "Here is a balanced day of meals:\n\n\
        **Breakfast:** rolled oats, banana, walnuts, honey. Simmer oats in milk and top with sliced banana.\n\
        **Lunch:** quinoa, chickpeas, cucumber, feta. Toss everything with lemon and olive oil.\n\
        **Dinner:** salmon, broccoli, brown rice. Bake salmon at 200C for 15 min, steam broccoli.\n\
        **Snack:** greek yogurt, berries. Layer yogurt and berries in a glass.";
}

#[async_trait]
impl LLMProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        if let Some((_, request)) = prompt.rsplit_once("User request:") {
            info!("Answering '{}' with the offline sample plan", request.trim());
        }
        Ok(Self::SAMPLE_PLAN.to_string())
    }

    fn model_name(&self) -> &str {
        "sample-plan"
    }
}

/// Owns the active provider and reports calls on the event bus.
pub struct LLMManager {
    providers: Vec<Box<dyn LLMProvider>>,
    event_bus: Arc<EventBus>,
}

impl LLMManager {
    /// Create a new manager with the given providers.
    pub fn new(providers: Vec<Box<dyn LLMProvider>>, event_bus: Arc<EventBus>) -> Self {
        Self {
            providers,
            event_bus,
        }
    }

    /// Name of the active provider.
    pub fn provider_name(&self) -> &str {
        self.providers.first().map(|p| p.name()).unwrap_or("none")
    }

    /// Send a prompt to the first available provider.
    pub async fn send_prompt(&self, prompt: &str) -> anyhow::Result<String> {
        let Some(provider) = self.providers.first() else {
            return Err(anyhow::anyhow!("No providers available"));
        };

        let _ = self
            .event_bus
            .emit(Event::APICallStarted {
                provider: provider.name().to_string(),
                model: provider.model_name().to_string(),
            })
            .await;

        let result = provider.send_prompt(prompt).await;

        let event = match &result {
            // Rough estimate: 1 token ≈ 4 characters
            Ok(response) => Event::APICallCompleted {
                provider: provider.name().to_string(),
                tokens: (prompt.len() + response.len()) / 4,
            },
            Err(e) => Event::APIError {
                provider: provider.name().to_string(),
                error: format!("{:#}", e),
            },
        };
        let _ = self.event_bus.emit(event).await;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{format_response, MealCategory};

    #[tokio::test]
    async fn test_local_provider_plan_parses_into_all_categories() {
        let reply = LocalProvider
            .send_prompt("User request: anything")
            .await
            .unwrap();
        let formatted = format_response(&reply);
        let categories: Vec<_> = formatted.meals().iter().map(|m| m.category).collect();
        assert_eq!(categories, MealCategory::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_manager_without_providers_fails() {
        let manager = LLMManager::new(Vec::new(), Arc::new(EventBus::new(8)));
        assert!(manager.send_prompt("hi").await.is_err());
        assert_eq!(manager.provider_name(), "none");
    }

    #[tokio::test]
    async fn test_manager_counts_calls() {
        let bus = Arc::new(EventBus::new(8));
        let manager = LLMManager::new(vec![Box::new(LocalProvider)], bus.clone());
        manager.send_prompt("User request: lunch").await.unwrap();
        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.total_api_calls, 1);
        assert!(metrics.total_tokens > 0);
    }
}
