use crate::error::StoreError;
use crate::schemas::LedgerState;
use bson::doc;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::ReplaceOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Durable home of each trip's ledger, keyed by trip id.
#[allow(async_fn_in_trait)]
pub trait LedgerStore {
    async fn load_ledger_state(&self, trip_id: &str) -> Result<Option<LedgerState>, StoreError>;

    async fn save_ledger_state(&self, trip_id: &str, state: &LedgerState)
        -> Result<(), StoreError>;

    /// Returns whether a trip was actually removed.
    async fn delete_ledger_state(&self, trip_id: &str) -> Result<bool, StoreError>;

    async fn trip_ids(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct TripDocument {
    id: String,
    state: LedgerState,
    updated_at: bson::DateTime,
}

#[derive(Clone, Debug)]
pub struct MongoStore {
    trips: Collection<TripDocument>,
}

impl MongoStore {
    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            trips: client.database(database).collection("Trips"),
        }
    }
}

impl LedgerStore for MongoStore {
    async fn load_ledger_state(&self, trip_id: &str) -> Result<Option<LedgerState>, StoreError> {
        let trip = self.trips.find_one(doc! { "id": trip_id }, None).await?;
        Ok(trip.map(|trip| trip.state))
    }

    async fn save_ledger_state(
        &self,
        trip_id: &str,
        state: &LedgerState,
    ) -> Result<(), StoreError> {
        let trip = TripDocument {
            id: trip_id.to_owned(),
            state: state.clone(),
            updated_at: bson::DateTime::from_chrono(Utc::now()),
        };
        let options = ReplaceOptions::builder().upsert(true).build();
        self.trips
            .replace_one(doc! { "id": trip_id }, trip, options)
            .await?;
        Ok(())
    }

    async fn delete_ledger_state(&self, trip_id: &str) -> Result<bool, StoreError> {
        let result = self.trips.delete_one(doc! { "id": trip_id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn trip_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut cursor = self.trips.find(None, None).await?;
        let mut ids = Vec::new();
        while let Some(trip) = cursor.try_next().await? {
            ids.push(trip.id);
        }
        Ok(ids)
    }
}

/// Keeps trips in process memory; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    trips: RwLock<HashMap<String, LedgerState>>,
}

impl LedgerStore for MemoryStore {
    async fn load_ledger_state(&self, trip_id: &str) -> Result<Option<LedgerState>, StoreError> {
        Ok(self.trips.read().await.get(trip_id).cloned())
    }

    async fn save_ledger_state(
        &self,
        trip_id: &str,
        state: &LedgerState,
    ) -> Result<(), StoreError> {
        self.trips
            .write()
            .await
            .insert(trip_id.to_owned(), state.clone());
        Ok(())
    }

    async fn delete_ledger_state(&self, trip_id: &str) -> Result<bool, StoreError> {
        Ok(self.trips.write().await.remove(trip_id).is_some())
    }

    async fn trip_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.trips.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
