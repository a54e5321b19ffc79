//! Feeds committed events to projections in global position order.

use event_store::{EventStore, Position};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Delivers events from an event store to registered projections.
///
/// Catch-up reads from the lowest position any projection has reached and
/// hands each event only to the projections still behind it.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,

    /// Serializes catch-up runs.
    catch_up: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Brings every projection up to the end of the store.
    ///
    /// Returns the number of deliveries made.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let _guard = self.catch_up.lock().await;

        let mut from: Option<Position> = None;
        for projection in &self.projections {
            let last = projection.position().await.last;
            from = Some(from.map_or(last, |p| p.min(last)));
        }
        let Some(from) = from else {
            return Ok(0);
        };

        let mut stream = self.store.stream_from(from).await?;
        let mut delivered: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            for projection in &self.projections {
                if projection.position().await.is_behind(event.position) {
                    projection.handle(&event).await?;
                    delivered += 1;
                    metrics::counter!("projections_events_processed", "projection" => projection.name())
                        .increment(1);
                }
            }
        }

        if delivered > 0 {
            tracing::debug!(delivered, from = %from, "catch-up complete");
        }

        Ok(delivered)
    }

    /// Resets all projections and replays the store from the start.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        {
            let _guard = self.catch_up.lock().await;
            for projection in &self.projections {
                projection.reset().await?;
            }
        }
        let delivered = self.run_catch_up().await?;
        tracing::info!(delivered, projections = self.projections.len(), "projections rebuilt");
        Ok(delivered)
    }
}
