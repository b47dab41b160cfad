//! Per-resource clients.
//!
//! A [`ResourceClient`] exposes list/create/update/delete for one entity type.
//! Every call goes through the [`ResilientExecutor`]: remote first when the
//! backend is up, the shared [`LocalStore`] otherwise.

pub mod page_state;

pub use page_state::{PageState, PageStateClient};

use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::Result;
use crate::clock::Clock;
use crate::executor::ResilientExecutor;
use crate::models::{Entity, ListFilter, Patch};
use crate::remote::RemoteApi;
use crate::storage::LocalStore;

/// Everything a client needs, shared by all clients of one context.
#[derive(Clone)]
pub struct ClientParts {
    pub remote: RemoteApi,
    pub executor: ResilientExecutor,
    pub store: Arc<Mutex<LocalStore>>,
    pub clock: Arc<dyn Clock>,
}

/// CRUD access to one resource.
pub struct ResourceClient<T: Entity> {
    parts: ClientParts,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            parts: self.parts.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(parts: ClientParts) -> Self {
        Self {
            parts,
            _entity: PhantomData,
        }
    }

    /// All records visible to the current user.
    pub async fn get_all(&self, filter: ListFilter) -> Result<Vec<T>> {
        let user = self.parts.remote.current_user();
        let op = format!("list {}", T::KIND);
        self.parts
            .executor
            .execute(&op, self.parts.remote.list::<T>(&filter), async {
                let store = self.parts.store.lock().await;
                Ok(store.list_as::<T>(user.as_deref(), &filter))
            })
            .await
    }

    /// Create a record.
    ///
    /// The entity is validated and its derived fields filled in before either
    /// branch runs. The result carries the server's id, or a local one when
    /// the record only went to the local store.
    pub async fn create(&self, mut entity: T) -> Result<T> {
        entity.prepare(self.parts.clock.now().date_naive());
        entity.validate()?;

        let user = self.parts.remote.current_user();
        let op = format!("create {}", T::KIND);
        let created = self
            .parts
            .executor
            .execute(&op, self.parts.remote.create(&entity), async {
                let mut store = self.parts.store.lock().await;
                store.insert(entity.clone(), user.as_deref(), self.parts.clock.now())
            })
            .await?;
        debug!(resource = %T::KIND, id = created.id().unwrap_or_default(), "created");
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// Fails with `NotFound` when neither the backend nor the local store
    /// knows `id`.
    pub async fn update(&self, id: &str, patch: Patch) -> Result<T> {
        let user = self.parts.remote.current_user();
        let op = format!("update {}/{}", T::KIND, id);
        self.parts
            .executor
            .execute(&op, self.parts.remote.update::<T>(id, &patch), async {
                let mut store = self.parts.store.lock().await;
                store.update::<T>(id, &patch, user.as_deref())
            })
            .await
    }

    /// Delete a record.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let user = self.parts.remote.current_user();
        let op = format!("delete {}/{}", T::KIND, id);
        self.parts
            .executor
            .execute(&op, self.parts.remote.delete(T::KIND, id), async {
                let mut store = self.parts.store.lock().await;
                store.remove(T::KIND, id, user.as_deref())
            })
            .await
    }
}
