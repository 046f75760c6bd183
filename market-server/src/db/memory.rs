//! In-memory store
//!
//! Implements [`Repository`], [`PermissionStore`] and [`AuditSink`] over
//! `parking_lot` locks. Every call is appended to a query log so callers can
//! assert which storage round-trips a request caused. Failure switches
//! simulate backend outages per concern.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared::models::{
    Entity, EntityId, Operation, Patch, PermissionGrant, ResourceType, RoleId,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use super::{
    FindOptions, PermissionStore, RepoError, RepoResult, Repository, SortOrder, check_fields,
};
use crate::audit::{AuditRecord, AuditSink};
use crate::filter::Predicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    FindMany,
    FindOne,
    Count,
    Update,
    Delete,
    Grants,
    Audit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLog {
    pub kind: QueryKind,
    pub resource: Option<ResourceType>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<ResourceType, BTreeMap<EntityId, Entity>>>,
    grants: RwLock<Vec<PermissionGrant>>,
    audit: RwLock<Vec<AuditRecord>>,
    log: Mutex<Vec<QueryLog>>,
    fail_grants: AtomicBool,
    fail_audit: AtomicBool,
    fail_writes: Mutex<BTreeSet<EntityId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Seeding ==========

    pub fn insert(&self, entity: Entity) {
        self.tables
            .write()
            .entry(entity.resource_type())
            .or_default()
            .insert(entity.id(), entity);
    }

    pub fn insert_all(&self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.insert(entity);
        }
    }

    pub fn add_grant(&self, grant: PermissionGrant) {
        self.grants.write().push(grant);
    }

    /// Direct read that bypasses the query log
    pub fn get(&self, resource: ResourceType, id: EntityId) -> Option<Entity> {
        self.tables
            .read()
            .get(&resource)
            .and_then(|table| table.get(&id))
            .cloned()
    }

    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.read().clone()
    }

    // ========== Query log ==========

    pub fn query_log(&self) -> Vec<QueryLog> {
        self.log.lock().clone()
    }

    /// Number of repository calls touching `resource`
    pub fn queries_for(&self, resource: ResourceType) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|q| q.resource == Some(resource) && q.kind != QueryKind::Grants)
            .count()
    }

    pub fn clear_query_log(&self) {
        self.log.lock().clear();
    }

    fn log_query(&self, kind: QueryKind, resource: Option<ResourceType>) {
        self.log.lock().push(QueryLog { kind, resource });
    }

    // ========== Failure switches ==========

    pub fn fail_grant_lookups(&self, fail: bool) {
        self.fail_grants.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_audit_writes(&self, fail: bool) {
        self.fail_audit.store(fail, AtomicOrdering::SeqCst);
    }

    /// Make update/delete of `id` fail with a database error
    pub fn fail_writes_on(&self, id: EntityId) {
        self.fail_writes.lock().insert(id);
    }

    fn check_write(&self, id: EntityId) -> RepoResult<()> {
        if self.fail_writes.lock().contains(&id) {
            return Err(RepoError::Database(format!("write rejected for record {id}")));
        }
        Ok(())
    }
}

fn compare_entities(a: &Entity, b: &Entity, sort: &SortOrder) -> Ordering {
    let left = a.field(sort.field);
    let right = b.field(sort.field);
    // Nulls sort last in either direction
    let primary = match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {
            let ord = left.compare(&right).unwrap_or(Ordering::Equal);
            if sort.descending { ord.reverse() } else { ord }
        }
    };
    primary.then_with(|| a.id().cmp(&b.id()))
}

#[async_trait]
impl Repository for MemoryStore {
    async fn find_many(
        &self,
        resource: ResourceType,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RepoResult<Vec<Entity>> {
        self.log_query(QueryKind::FindMany, Some(resource));
        check_fields(resource, filter, options.sort.as_ref())?;

        let sort = options
            .sort
            .unwrap_or_else(|| SortOrder::default_for(resource));
        let mut rows: Vec<Entity> = self
            .tables
            .read()
            .get(&resource)
            .map(|table| table.values().filter(|e| filter.matches(e)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| compare_entities(a, b, &sort));

        let offset = options.offset.unwrap_or(0) as usize;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn find_one(&self, resource: ResourceType, id: EntityId) -> RepoResult<Option<Entity>> {
        self.log_query(QueryKind::FindOne, Some(resource));
        Ok(self.get(resource, id))
    }

    async fn count(&self, resource: ResourceType, filter: &Predicate) -> RepoResult<u64> {
        self.log_query(QueryKind::Count, Some(resource));
        check_fields(resource, filter, None)?;
        let count = self
            .tables
            .read()
            .get(&resource)
            .map(|table| table.values().filter(|e| filter.matches(e)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn update(&self, resource: ResourceType, id: EntityId, patch: &Patch) -> RepoResult<Entity> {
        self.log_query(QueryKind::Update, Some(resource));
        self.check_write(id)?;
        let mut tables = self.tables.write();
        let entity = tables
            .get_mut(&resource)
            .and_then(|table| table.get_mut(&id))
            .ok_or_else(|| RepoError::NotFound(format!("{} {id}", resource.label())))?;
        entity
            .apply(patch)
            .map_err(|e| RepoError::Validation(e.to_string()))?;
        Ok(entity.clone())
    }

    async fn delete(&self, resource: ResourceType, id: EntityId) -> RepoResult<bool> {
        self.log_query(QueryKind::Delete, Some(resource));
        self.check_write(id)?;
        let mut tables = self.tables.write();
        let removed = tables
            .get_mut(&resource)
            .and_then(|table| table.remove(&id));
        if removed.is_some() {
            cascade_delete(&mut tables, resource, id);
        }
        Ok(removed.is_some())
    }
}

/// Same foreign key actions as the SQLite schema: order items go with their
/// order, products lose a deleted category.
fn cascade_delete(
    tables: &mut BTreeMap<ResourceType, BTreeMap<EntityId, Entity>>,
    resource: ResourceType,
    id: EntityId,
) {
    match resource {
        ResourceType::Order => {
            if let Some(items) = tables.get_mut(&ResourceType::OrderItem) {
                items.retain(|_, item| !matches!(item, Entity::OrderItem(i) if i.order_id == id));
            }
        }
        ResourceType::Category => {
            if let Some(products) = tables.get_mut(&ResourceType::Product) {
                for product in products.values_mut() {
                    if let Entity::Product(p) = product {
                        if p.category_id == Some(id) {
                            p.category_id = None;
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn find_grants(
        &self,
        role_ids: &[RoleId],
        resource: ResourceType,
        operation: Operation,
    ) -> RepoResult<Vec<PermissionGrant>> {
        self.log_query(QueryKind::Grants, Some(resource));
        if self.fail_grants.load(AtomicOrdering::SeqCst) {
            return Err(RepoError::Database("permission store unavailable".to_string()));
        }
        Ok(self
            .grants
            .read()
            .iter()
            .filter(|g| {
                g.resource == resource && g.operation == operation && role_ids.contains(&g.role_id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, record: &AuditRecord) -> RepoResult<()> {
        self.log_query(QueryKind::Audit, Some(record.resource));
        if self.fail_audit.load(AtomicOrdering::SeqCst) {
            return Err(RepoError::Database("audit log unavailable".to_string()));
        }
        self.audit.write().push(record.clone());
        Ok(())
    }
}
