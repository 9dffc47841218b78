use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// Events that can be emitted by components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Meal planning events
    MealRequested {
        request: String,
    },
    MealPlanned {
        request: String,
        sections: usize,
        fallback: bool,
    },
    MealFailed {
        request: String,
        error: String,
    },

    // API events
    APICallStarted {
        provider: String,
        model: String,
    },
    APICallCompleted {
        provider: String,
        tokens: usize,
    },
    APIError {
        provider: String,
        error: String,
    },

    // Session events
    SessionChanged {
        user: Option<String>,
    },
}

/// Event bus for component communication
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    metrics: Arc<RwLock<Metrics>>,
}

/// Accumulated metrics from events
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metrics {
    pub total_api_calls: usize,
    pub total_tokens: usize,
    pub requests: usize,
    pub plans_completed: usize,
    pub plans_failed: usize,
    pub sections_rendered: usize,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    /// Subscribe to events
    #[allow(dead_code)]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    pub async fn emit(&self, event: Event) -> Result<()> {
        self.update_metrics(&event).await;

        // No receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Get current metrics
    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.read().await.clone()
    }

    async fn update_metrics(&self, event: &Event) {
        let mut metrics = self.metrics.write().await;

        match event {
            Event::APICallCompleted { tokens, .. } => {
                metrics.total_api_calls += 1;
                metrics.total_tokens += tokens;
            }
            Event::APIError { .. } => {
                metrics.total_api_calls += 1;
            }
            Event::MealRequested { .. } => {
                metrics.requests += 1;
            }
            Event::MealPlanned { sections, .. } => {
                metrics.plans_completed += 1;
                metrics.sections_rendered += sections;
            }
            Event::MealFailed { .. } => {
                metrics.plans_failed += 1;
            }
            _ => {}
        }
    }
}

/// Trait for components that can emit events
#[async_trait::async_trait]
pub trait EventEmitter {
    fn set_event_bus(&mut self, bus: Arc<EventBus>);

    async fn emit_event(&self, event: Event) -> Result<()>;
}

/// Helper macro to implement EventEmitter trait
#[macro_export]
macro_rules! impl_event_emitter {
    ($type:ty) => {
        #[async_trait::async_trait]
        impl $crate::event_bus::EventEmitter for $type {
            fn set_event_bus(&mut self, bus: std::sync::Arc<$crate::event_bus::EventBus>) {
                self.event_bus = Some(bus);
            }

            async fn emit_event(&self, event: $crate::event_bus::Event) -> anyhow::Result<()> {
                if let Some(bus) = &self.event_bus {
                    bus.emit(event).await
                } else {
                    Ok(())
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_emission() {
        let bus = EventBus::new(100);
        let mut receiver = bus.subscribe();

        bus.emit(Event::MealRequested {
            request: "vegetarian dinner".to_string(),
        })
        .await
        .unwrap();

        let received = receiver.recv().await.unwrap();
        match received {
            Event::MealRequested { request } => {
                assert_eq!(request, "vegetarian dinner");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[tokio::test]
    async fn test_metrics_update() {
        let bus = EventBus::new(100);

        bus.emit(Event::APICallCompleted {
            provider: "gemini".to_string(),
            tokens: 100,
        })
        .await
        .unwrap();
        bus.emit(Event::MealPlanned {
            request: "lunch".to_string(),
            sections: 3,
            fallback: false,
        })
        .await
        .unwrap();
        bus.emit(Event::MealFailed {
            request: "dinner".to_string(),
            error: "timeout".to_string(),
        })
        .await
        .unwrap();

        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.total_api_calls, 1);
        assert_eq!(metrics.total_tokens, 100);
        assert_eq!(metrics.plans_completed, 1);
        assert_eq!(metrics.sections_rendered, 3);
        assert_eq!(metrics.plans_failed, 1);
    }
}
