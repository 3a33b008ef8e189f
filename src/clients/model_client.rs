use crate::framework::{Collection, Instance, ResourceHandle};
use crate::model::{Entity, Params};
use serde_json::Value;

/// Trait for model-specific clients to inherit the standard CRUD calls.
///
/// This trait reduces boilerplate by forwarding common operations like `get`
/// and `query` to the wrapped [`ResourceHandle`].
pub trait ModelClient: Send + Sync {
    /// Access the inner generated handle.
    fn inner(&self) -> &ResourceHandle;

    /// Fetch all entities matching `params`.
    #[tracing::instrument(skip_all, fields(model = %self.inner().name()))]
    fn query(&self, params: Params) -> Collection {
        tracing::debug!("Sending request");
        self.inner().query(params)
    }

    /// Fetch an entity by ID.
    #[tracing::instrument(skip_all, fields(model = %self.inner().name()))]
    fn get(&self, id: Value) -> Instance {
        tracing::debug!(%id, "Sending request");
        self.inner().get(id)
    }

    #[tracing::instrument(skip_all, fields(model = %self.inner().name()))]
    fn create(&self, data: Entity) -> Instance {
        tracing::debug!("Sending request");
        self.inner().create(data)
    }
}
