//! Condition evaluators
//!
//! Each [`ConditionTag`] maps to one evaluator. The scope builder asks it for
//! the admitted ids of a root resource; the access guard asks it whether a
//! single loaded entity is admitted.

use async_trait::async_trait;
use shared::models::{ConditionTag, Entity, EntityId, Field, Principal, ResourceType};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::{RepoResult, Repository};
use crate::filter::Predicate;

#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    fn tag(&self) -> ConditionTag;

    /// Ids of `resource` admitted for `principal`; `None` when the condition
    /// cannot be applied to that resource
    async fn admitted_ids(
        &self,
        principal: &Principal,
        resource: ResourceType,
        repo: &dyn Repository,
    ) -> RepoResult<Option<Vec<EntityId>>>;

    /// Whether one loaded entity is admitted; `None` when the entity carries
    /// nothing the condition can check
    fn admits(&self, principal: &Principal, entity: &Entity) -> Option<bool>;
}

/// `is-creator`: the record's `created_by` is the caller
pub struct CreatorCondition;

#[async_trait]
impl ConditionEvaluator for CreatorCondition {
    fn tag(&self) -> ConditionTag {
        ConditionTag::IsCreator
    }

    async fn admitted_ids(
        &self,
        principal: &Principal,
        resource: ResourceType,
        repo: &dyn Repository,
    ) -> RepoResult<Option<Vec<EntityId>>> {
        if !resource.is_creator_owned() {
            return Ok(None);
        }
        let filter = Predicate::eq(Field::CreatedBy, principal.id);
        repo.find_ids(resource, &filter).await.map(Some)
    }

    fn admits(&self, principal: &Principal, entity: &Entity) -> Option<bool> {
        entity.created_by().map(|owner| owner == principal.id)
    }
}

/// Tag → evaluator lookup
#[derive(Clone)]
pub struct ConditionRegistry {
    evaluators: BTreeMap<ConditionTag, Arc<dyn ConditionEvaluator>>,
}

impl ConditionRegistry {
    pub fn empty() -> Self {
        Self {
            evaluators: BTreeMap::new(),
        }
    }

    pub fn register(mut self, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        self.evaluators.insert(evaluator.tag(), evaluator);
        self
    }

    pub fn get(&self, tag: ConditionTag) -> Option<&Arc<dyn ConditionEvaluator>> {
        self.evaluators.get(&tag)
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::empty().register(Arc::new(CreatorCondition))
    }
}
