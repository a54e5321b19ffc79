use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventQuery, EventStoreError, Position, Result, Version,
    store::{Commit, EventStore, EventStream},
};

const SELECT_EVENTS: &str = "SELECT position, id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata FROM events";

/// Advisory lock key serializing commits so positions become visible in order.
const COMMIT_LOCK_KEY: i64 = 0x6174_656c_6965_72;

/// PostgreSQL-backed event store.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            position: Position::new(row.try_get("position")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, commit), fields(streams = commit.appends().len()))]
    async fn commit(&self, commit: Commit) -> Result<()> {
        commit.validate()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(COMMIT_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        for append in commit.appends() {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                    .bind(append.aggregate_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;
            let actual = Version::new(current.unwrap_or(0));

            if actual != append.expected_version {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: append.aggregate_id,
                    expected: append.expected_version,
                    actual,
                });
            }
        }

        for append in commit.appends() {
            for event in &append.events {
                let metadata_json = serde_json::to_value(&event.metadata)?;

                sqlx::query(
                    r#"
                    INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(event.event_id.as_uuid())
                .bind(&event.event_type)
                .bind(event.aggregate_id.as_uuid())
                .bind(&event.aggregate_type)
                .bind(event.version.as_i64())
                .bind(event.timestamp)
                .bind(&event.payload)
                .bind(metadata_json)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.constraint() == Some("unique_aggregate_version")
                    {
                        return EventStoreError::ConcurrencyConflict {
                            aggregate_id: append.aggregate_id,
                            expected: append.expected_version,
                            actual: event.version,
                        };
                    }
                    EventStoreError::Database(e)
                })?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "{SELECT_EVENTS} WHERE aggregate_id = $1 ORDER BY version ASC"
        ))
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("{SELECT_EVENTS} WHERE 1=1"));

        if let Some(id) = query.aggregate_id {
            builder.push(" AND aggregate_id = ").push_bind(id.as_uuid());
        }
        if let Some(agg_type) = query.aggregate_type {
            builder.push(" AND aggregate_type = ").push_bind(agg_type);
        }
        if let Some(event_types) = query.event_types {
            builder.push(" AND event_type = ANY(").push_bind(event_types).push(")");
        }
        if let Some(after) = query.after_position {
            builder.push(" AND position > ").push_bind(after.as_i64());
        }
        if let Some(from) = query.from_timestamp {
            builder.push(" AND timestamp >= ").push_bind(from);
        }
        if let Some(to) = query.to_timestamp {
            builder.push(" AND timestamp <= ").push_bind(to);
        }

        builder.push(" ORDER BY position ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_from(&self, after: Position) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT position, id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
            FROM events
            WHERE position > $1
            ORDER BY position ASC
            "#,
        )
        .bind(after.as_i64())
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_event(row),
            Err(e) => Err(EventStoreError::Database(e)),
        });

        Ok(Box::pin(stream))
    }
}
