//! Post-commit side effects
//!
//! Effects run after the primary mutation has been committed. A failing
//! effect is logged and reported as an [`EffectWarning`]; the mutation stays
//! successful.

use async_trait::async_trait;
use serde::Serialize;
use shared::models::EntityId;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait SideEffect: Send + Sync {
    /// Short label reported in warnings (`audit`, `notification`)
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<(), BoxError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectWarning {
    pub entity_id: EntityId,
    pub effect: String,
    pub message: String,
}

/// Ordered list of effects attached to one successful mutation
#[derive(Default)]
pub struct PostCommit {
    effects: Vec<Box<dyn SideEffect>>,
}

impl PostCommit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, effect: impl SideEffect + 'static) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Run every effect in order; each failure becomes a warning
    pub async fn run(self, entity_id: EntityId) -> Vec<EffectWarning> {
        let mut warnings = Vec::new();
        for effect in self.effects {
            if let Err(e) = effect.run().await {
                tracing::warn!(
                    entity_id,
                    effect = effect.name(),
                    error = %e,
                    "Post-commit effect failed"
                );
                warnings.push(EffectWarning {
                    entity_id,
                    effect: effect.name().to_string(),
                    message: e.to_string(),
                });
            }
        }
        warnings
    }
}
