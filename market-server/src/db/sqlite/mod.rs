//! SQLite store
//!
//! sqlx connection pool with embedded migrations. Queries are assembled with
//! [`QueryBuilder`](sqlx::QueryBuilder) from a [`Predicate`]; values are
//! always bound.

mod query;

use async_trait::async_trait;
use shared::models::{
    Banner, Category, ConditionTag, Customer, Entity, EntityId, Field, Operation, Order, OrderItem,
    Patch, PermissionGrant, Product, ResourceType, RoleId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use std::str::FromStr;

use super::{FindOptions, PermissionStore, RepoError, RepoResult, Repository, check_fields};
use crate::audit::{AuditRecord, AuditSink};
use crate::filter::Predicate;

#[derive(Clone)]
pub struct SqliteStore {
    pub pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and apply migrations
    pub async fn connect(url: &str) -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON")
            .with_regexp();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        // busy_timeout: 写冲突时等待 5s 而非立即失败
        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await?;
        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        Self::migrate(pool).await
    }

    /// Private in-memory database; one connection so every query sees the same data
    pub async fn memory() -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .pragma("foreign_keys", "ON")
            .with_regexp();
        // 连接被回收时内存库随之消失，所以禁止空闲回收和寿命回收
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> RepoResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(Self { pool })
    }

    /// Insert a full record, id included
    pub async fn insert(&self, entity: &Entity) -> RepoResult<()> {
        let resource = entity.resource_type();
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            resource.table(),
            query::column_list(resource)
        ));
        for (i, field) in resource.fields().iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            query::push_value(&mut qb, &entity.field(*field));
        }
        qb.push(")");
        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn insert_grant(&self, grant: &PermissionGrant) -> RepoResult<()> {
        let conditions: Vec<&str> = grant.conditions.iter().map(ConditionTag::as_str).collect();
        let conditions = serde_json::to_string(&conditions)
            .map_err(|e| RepoError::Validation(e.to_string()))?;
        sqlx::query(
            "INSERT INTO permission_grants (role_id, resource, operation, conditions) VALUES (?, ?, ?, ?)",
        )
        .bind(grant.role_id)
        .bind(grant.resource.as_str())
        .bind(grant.operation.as_str())
        .bind(conditions)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch(&self, mut qb: QueryBuilder<'_, Sqlite>, resource: ResourceType) -> RepoResult<Vec<Entity>> {
        let rows: Vec<Entity> = match resource {
            ResourceType::Product => qb
                .build_query_as::<Product>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Entity::Product)
                .collect(),
            ResourceType::Order => qb
                .build_query_as::<Order>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Entity::Order)
                .collect(),
            ResourceType::OrderItem => qb
                .build_query_as::<OrderItem>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Entity::OrderItem)
                .collect(),
            ResourceType::Customer => qb
                .build_query_as::<Customer>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Entity::Customer)
                .collect(),
            ResourceType::Category => qb
                .build_query_as::<Category>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Entity::Category)
                .collect(),
            ResourceType::Banner => qb
                .build_query_as::<Banner>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Entity::Banner)
                .collect(),
        };
        Ok(rows)
    }
}

#[async_trait]
impl Repository for SqliteStore {
    async fn find_many(
        &self,
        resource: ResourceType,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RepoResult<Vec<Entity>> {
        check_fields(resource, filter, options.sort.as_ref())?;
        let mut qb = query::select(resource, filter);
        query::push_options(&mut qb, resource, options);
        self.fetch(qb, resource).await
    }

    async fn find_ids(&self, resource: ResourceType, filter: &Predicate) -> RepoResult<Vec<EntityId>> {
        check_fields(resource, filter, None)?;
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT id FROM {} WHERE ", resource.table()));
        query::push_predicate(&mut qb, filter);
        qb.push(" ORDER BY id");
        let ids: Vec<(i64,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn find_one(&self, resource: ResourceType, id: EntityId) -> RepoResult<Option<Entity>> {
        let filter = Predicate::eq(Field::Id, id);
        let qb = query::select(resource, &filter);
        Ok(self.fetch(qb, resource).await?.into_iter().next())
    }

    async fn count(&self, resource: ResourceType, filter: &Predicate) -> RepoResult<u64> {
        check_fields(resource, filter, None)?;
        let mut qb = query::count(resource, filter);
        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn update(&self, resource: ResourceType, id: EntityId, patch: &Patch) -> RepoResult<Entity> {
        let mut entity = self
            .find_one(resource, id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("{} {id}", resource.label())))?;
        // 先在内存中校验整个 patch，失败则不写库
        entity
            .apply(patch)
            .map_err(|e| RepoError::Validation(e.to_string()))?;
        if patch.is_empty() {
            return Ok(entity);
        }

        let changes: Vec<_> = patch.iter().cloned().collect();
        let mut qb = query::update(resource, id, &changes);
        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("{} {id}", resource.label())));
        }
        Ok(entity)
    }

    async fn delete(&self, resource: ResourceType, id: EntityId) -> RepoResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", resource.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PermissionStore for SqliteStore {
    async fn find_grants(
        &self,
        role_ids: &[RoleId],
        resource: ResourceType,
        operation: Operation,
    ) -> RepoResult<Vec<PermissionGrant>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT role_id, conditions FROM permission_grants WHERE resource = ",
        );
        qb.push_bind(resource.as_str());
        qb.push(" AND operation = ");
        qb.push_bind(operation.as_str());
        qb.push(" AND role_id IN (");
        let mut separated = qb.separated(", ");
        for role_id in role_ids {
            separated.push_bind(*role_id);
        }
        qb.push(")");

        let rows: Vec<(i64, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
        let mut grants = Vec::with_capacity(rows.len());
        for (role_id, raw) in rows {
            match parse_conditions(&raw) {
                Some(conditions) => grants.push(PermissionGrant {
                    role_id,
                    resource,
                    operation,
                    conditions,
                }),
                // 条件无法识别时整条授权作废，不能退化成无条件授权
                None => tracing::warn!(
                    role_id,
                    resource = %resource,
                    operation = %operation,
                    conditions = %raw,
                    "Ignoring grant with unrecognised conditions"
                ),
            }
        }
        Ok(grants)
    }
}

fn parse_conditions(raw: &str) -> Option<BTreeSet<ConditionTag>> {
    let tags: Vec<String> = serde_json::from_str(raw).ok()?;
    tags.iter()
        .map(|t| t.parse::<ConditionTag>().ok())
        .collect()
}

#[async_trait]
impl AuditSink for SqliteStore {
    async fn record(&self, record: &AuditRecord) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO audit_log (id, actor_id, resource, entity_id, action, details, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_str())
        .bind(record.actor_id)
        .bind(record.resource.as_str())
        .bind(record.entity_id)
        .bind(record.action.as_str())
        .bind(record.details.to_string())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
