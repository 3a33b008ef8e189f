//! # Resource Factory
//!
//! [`create_resource`] turns a [`ModelDefinition`] into a [`ResourceHandle`]:
//! the callable surface of one model. Every action call returns its result
//! container immediately and spawns one task that drives the request.
//!
//! ## Call flow
//!
//! 1. The action's path template is expanded from the call's [`Params`].
//! 2. The request goes through the transport handed to the factory (normally
//!    the [`AuthInterceptor`](crate::auth::AuthInterceptor)).
//! 3. The response is applied to the container:
//!    - single-entity actions replace the instance's fields with the returned
//!      object (a `null` body keeps them);
//!    - collection actions replace the sequence in one step.
//! 4. Callbacks run, then the container's promise settles.
//!
//! A failed call leaves the container untouched and `resolved()` false.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::container::{channel_promise, settled, Callbacks, Collection, Promise, ResultContainer};
use super::transport::{Request, Response, Transport};
use crate::auth::actions::{login_hook, logout_hook, take_remember_me};
use crate::auth::AuthSession;
use crate::error::{ClientError, DefinitionError, HttpFailure};
use crate::lifecycle::LogoutPolicy;
use crate::model::{entity_id, ActionDefinition, Entity, ModelDefinition, Params, Returns};

/// Post-processing applied to a raw response body before it reaches the
/// container. Used by the auth actions to update the session first.
pub(crate) type ResponseHook =
    Box<dyn FnOnce(Result<Value, ClientError>) -> Result<Value, ClientError> + Send>;

/// Validates `definition` and builds its handle.
pub fn create_resource(
    definition: ModelDefinition,
    transport: Arc<dyn Transport>,
    session: Arc<AuthSession>,
) -> Result<ResourceHandle, DefinitionError> {
    definition.validate()?;
    debug!(
        model = %definition.exposed_name(),
        actions = definition.actions().len(),
        "Resource created"
    );
    Ok(ResourceHandle {
        inner: Arc::new(ResourceInner {
            name: definition.exposed_name(),
            definition,
            transport,
            session,
            logout_policy: LogoutPolicy::default(),
        }),
    })
}

struct ResourceInner {
    name: String,
    definition: ModelDefinition,
    transport: Arc<dyn Transport>,
    session: Arc<AuthSession>,
    logout_policy: LogoutPolicy,
}

/// Generated client for one model. Cheap to clone.
#[derive(Clone)]
pub struct ResourceHandle {
    inner: Arc<ResourceInner>,
}

/// The container returned by [`ResourceHandle::invoke`].
#[derive(Clone)]
pub enum Invocation {
    One(Instance),
    Many(Collection),
}

impl Invocation {
    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Invocation::One(instance) => Some(instance),
            Invocation::Many(_) => None,
        }
    }

    pub fn into_collection(self) -> Option<Collection> {
        match self {
            Invocation::Many(collection) => Some(collection),
            Invocation::One(_) => None,
        }
    }
}

/// Everything a spawned request needs.
struct Call {
    action: String,
    definition: ActionDefinition,
    params: Params,
    body: Option<Value>,
    callbacks: Callbacks,
    hook: Option<ResponseHook>,
}

impl ResourceHandle {
    /// Registered (normalized) model name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.inner.definition
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.inner.session
    }

    /// What a failed `logout` call reports. Only meaningful on user models.
    pub fn with_logout_policy(self, logout_policy: LogoutPolicy) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(ResourceInner {
                name: inner.name.clone(),
                definition: inner.definition.clone(),
                transport: Arc::clone(&inner.transport),
                session: Arc::clone(&inner.session),
                logout_policy,
            }),
        }
    }

    pub fn logout_policy(&self) -> LogoutPolicy {
        self.inner.logout_policy
    }

    /// Calls any declared action by name.
    ///
    /// On a user model, `login` and `logout` update the session exactly as
    /// [`UserClient`](crate::clients::UserClient) does; `login` honours a
    /// boolean [`REMEMBER_ME_PARAM`](crate::auth::REMEMBER_ME_PARAM).
    #[instrument(skip(self, params, body, callbacks), fields(model = %self.name()))]
    pub fn invoke(
        &self,
        action: &str,
        mut params: Params,
        body: Option<Value>,
        callbacks: Callbacks,
    ) -> Result<Invocation, ClientError> {
        let definition = self.action(action)?.clone();
        let hook = self.auth_hook(action, &mut params);
        let call = Call {
            action: action.to_string(),
            definition,
            params,
            body,
            callbacks,
            hook,
        };
        Ok(match call.definition.returns {
            Returns::One => Invocation::One(self.start_one(call)),
            Returns::Many => Invocation::Many(self.start_many(call)),
        })
    }

    // --- Built-in actions ---

    pub fn query(&self, params: Params) -> Collection {
        self.query_with(params, Callbacks::none())
    }

    pub fn query_with(&self, params: Params, callbacks: Callbacks) -> Collection {
        self.call_many("query", params, None, callbacks)
    }

    /// `find` with a LoopBack filter, e.g. `{"where": {"name": "a"}}`.
    pub fn find(&self, filter: Value) -> Collection {
        self.find_with(filter, Callbacks::none())
    }

    pub fn find_with(&self, filter: Value, callbacks: Callbacks) -> Collection {
        self.call_many("find", Params::filter(filter), None, callbacks)
    }

    pub fn get(&self, id: impl Into<Value>) -> Instance {
        self.get_with(id, Callbacks::none())
    }

    pub fn get_with(&self, id: impl Into<Value>, callbacks: Callbacks) -> Instance {
        self.call_one_with("get", Params::id(id), None, callbacks)
    }

    pub fn find_by_id(&self, id: impl Into<Value>) -> Instance {
        self.call_one("findById", Params::id(id), None)
    }

    pub fn find_one(&self, filter: Value) -> Instance {
        self.call_one("findOne", Params::filter(filter), None)
    }

    /// Creates an entity; the instance starts out holding `data`.
    pub fn create(&self, data: Entity) -> Instance {
        self.create_with(data, Callbacks::none())
    }

    pub fn create_with(&self, data: Entity, callbacks: Callbacks) -> Instance {
        self.call_one_with("create", Params::new(), Some(Value::Object(data)), callbacks)
    }

    pub fn upsert(&self, data: Entity) -> Instance {
        self.call_one("upsert", Params::new(), Some(Value::Object(data)))
    }

    /// Resolves to `{"exists": bool}`.
    pub fn exists(&self, id: impl Into<Value>) -> Instance {
        self.call_one("exists", Params::id(id), None)
    }

    /// Resolves to `{"count": n}`.
    pub fn count(&self, filter_where: Option<Value>) -> Instance {
        let mut params = Params::new();
        if let Some(filter_where) = filter_where {
            params.insert("where", filter_where);
        }
        self.call_one("count", params, None)
    }

    /// Updates every match of `filter_where`; resolves to `{"count": n}`.
    pub fn update_all(&self, filter_where: Value, data: Entity) -> Instance {
        self.call_one(
            "updateAll",
            Params::new().with("where", filter_where),
            Some(Value::Object(data)),
        )
    }

    pub fn delete_by_id(&self, id: impl Into<Value>) -> Instance {
        self.call_one("deleteById", Params::id(id), None)
    }

    /// A local, unsaved instance. Persist it with [`Instance::save`].
    pub fn instance(&self, data: Entity) -> Instance {
        Instance {
            container: ResultContainer::ready(data),
            resource: self.clone(),
        }
    }

    // --- Plumbing ---

    fn action(&self, name: &str) -> Result<&ActionDefinition, ClientError> {
        self.inner
            .definition
            .get_action(name)
            .ok_or_else(|| ClientError::UnknownAction {
                model: self.inner.name.clone(),
                action: name.to_string(),
            })
    }

    /// Session side effect of `action`, if any. Consumes local-only params.
    fn auth_hook(&self, action: &str, params: &mut Params) -> Option<ResponseHook> {
        if !self.inner.definition.is_user_model() {
            return None;
        }
        let session = Arc::clone(&self.inner.session);
        match action {
            "login" => Some(login_hook(session, take_remember_me(params))),
            "logout" => Some(logout_hook(session, self.inner.logout_policy)),
            _ => None,
        }
    }

    fn call_one(&self, action: &str, params: Params, body: Option<Value>) -> Instance {
        self.call_one_with(action, params, body, Callbacks::none())
    }

    fn call_many(
        &self,
        action: &str,
        params: Params,
        body: Option<Value>,
        callbacks: Callbacks,
    ) -> Collection {
        match self.action(action) {
            Ok(definition) => {
                let definition = definition.clone();
                self.start_many(Call {
                    action: action.to_string(),
                    definition,
                    params,
                    body,
                    callbacks,
                    hook: None,
                })
            }
            Err(e) => {
                if let Some(on_error) = callbacks.on_error {
                    on_error(&e);
                }
                ResultContainer::pending(Vec::new(), settled(Err(e)))
            }
        }
    }

    /// Single-entity call, with the session hook of `login`/`logout` attached.
    pub(crate) fn call_one_with(
        &self,
        action: &str,
        mut params: Params,
        body: Option<Value>,
        callbacks: Callbacks,
    ) -> Instance {
        match self.action(action) {
            Ok(definition) => {
                let definition = definition.clone();
                let hook = self.auth_hook(action, &mut params);
                self.start_one(Call {
                    action: action.to_string(),
                    definition,
                    params,
                    body,
                    callbacks,
                    hook,
                })
            }
            Err(e) => {
                if let Some(on_error) = callbacks.on_error {
                    on_error(&e);
                }
                let initial = body.as_ref().and_then(Value::as_object).cloned();
                Instance {
                    container: ResultContainer::pending(initial.unwrap_or_default(), settled(Err(e))),
                    resource: self.clone(),
                }
            }
        }
    }

    fn start_one(&self, call: Call) -> Instance {
        let initial = call
            .body
            .as_ref()
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let (tx, promise) = channel_promise::<Entity>();
        let container = ResultContainer::pending(initial, promise);
        self.spawn_one(container.clone(), call, tx);
        Instance {
            container,
            resource: self.clone(),
        }
    }

    fn spawn_one(
        &self,
        container: ResultContainer<Entity>,
        mut call: Call,
        tx: tokio::sync::oneshot::Sender<Result<Entity, ClientError>>,
    ) {
        let resource = self.clone();
        tokio::spawn(async move {
            let callbacks = std::mem::take(&mut call.callbacks);
            let action = call.action.clone();
            let outcome = match resource.execute(call).await {
                Ok(body) => apply_entity(&container.value(), &body).map(|merged| (merged, body)),
                Err(e) => Err(e),
            };
            let result = match outcome {
                Ok((merged, body)) => {
                    container.resolve(merged.clone());
                    if let Some(on_success) = callbacks.on_success {
                        on_success(&body);
                    }
                    Ok(merged)
                }
                Err(e) => {
                    warn!(model = %resource.name(), %action, error = %e, "Action failed");
                    if let Some(on_error) = callbacks.on_error {
                        on_error(&e);
                    }
                    Err(e)
                }
            };
            let _ = tx.send(result);
        });
    }

    fn start_many(&self, mut call: Call) -> Collection {
        let (tx, promise) = channel_promise::<Vec<Entity>>();
        let container = ResultContainer::pending(Vec::new(), promise);
        let collection = container.clone();
        let resource = self.clone();
        tokio::spawn(async move {
            let callbacks = std::mem::take(&mut call.callbacks);
            let action = call.action.clone();
            let outcome = match resource.execute(call).await {
                Ok(body) => entity_list(&body).map(|items| (items, body)),
                Err(e) => Err(e),
            };
            let result = match outcome {
                Ok((items, body)) => {
                    collection.resolve(items.clone());
                    if let Some(on_success) = callbacks.on_success {
                        on_success(&body);
                    }
                    Ok(items)
                }
                Err(e) => {
                    warn!(model = %resource.name(), %action, error = %e, "Action failed");
                    if let Some(on_error) = callbacks.on_error {
                        on_error(&e);
                    }
                    Err(e)
                }
            };
            let _ = tx.send(result);
        });
        container
    }

    /// Sends the call and returns the raw response body.
    async fn execute(&self, call: Call) -> Result<Value, ClientError> {
        let result = match self.build_request(&call.definition, call.params, call.body) {
            Ok(request) => {
                debug!(
                    model = %self.name(),
                    action = %call.action,
                    method = %request.method,
                    uri = %request.uri(),
                    "Sending request"
                );
                self.inner
                    .transport
                    .send(request)
                    .await
                    .and_then(Response::into_result)
                    .map(|response| response.body)
            }
            Err(e) => Err(e),
        };
        match call.hook {
            Some(hook) => hook(result),
            None => result,
        }
    }

    fn build_request(
        &self,
        definition: &ActionDefinition,
        mut params: Params,
        body: Option<Value>,
    ) -> Result<Request, ClientError> {
        if definition.requires_session {
            let user_id = self
                .inner
                .session
                .current_user_id()
                .ok_or_else(|| ClientError::Http(HttpFailure::stub_unauthorized()))?;
            params.insert("id", user_id);
        }
        let (path, query) = params.expand(&definition.path);
        let request = Request::new(definition.method.clone(), path).with_query(query);
        Ok(match body {
            Some(body) => request.with_body(body),
            None => request,
        })
    }
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("name", &self.inner.name)
            .field("plural", &self.inner.definition.plural_name())
            .finish()
    }
}

/// New value of an instance after a single-entity response. `null` keeps
/// `current`.
fn apply_entity(current: &Entity, body: &Value) -> Result<Entity, ClientError> {
    match body {
        Value::Null => Ok(current.clone()),
        Value::Object(fields) => Ok(fields.clone()),
        other => Err(ClientError::Decode(format!(
            "expected an object, got {}",
            json_kind(other)
        ))),
    }
}

fn entity_list(body: &Value) -> Result<Vec<Entity>, ClientError> {
    let items = body
        .as_array()
        .ok_or_else(|| ClientError::Decode(format!("expected an array, got {}", json_kind(body))))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .cloned()
                .ok_or_else(|| ClientError::Decode("collection item is not an object".into()))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A single entity plus `$promise`, `$resolved` and `$save`.
#[derive(Clone)]
pub struct Instance {
    container: ResultContainer<Entity>,
    resource: ResourceHandle,
}

impl Instance {
    pub fn get(&self, field: &str) -> Option<Value> {
        self.container.with(|entity| entity.get(field).cloned())
    }

    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        let (field, value) = (field.into(), value.into());
        self.container.update(|entity| {
            entity.insert(field, value);
        });
    }

    pub fn id(&self) -> Option<String> {
        self.container.with(entity_id)
    }

    pub fn data(&self) -> Entity {
        self.container.value()
    }

    pub fn resolved(&self) -> bool {
        self.container.resolved()
    }

    pub fn promise(&self) -> Promise<Entity> {
        self.container.promise()
    }

    pub fn container(&self) -> &ResultContainer<Entity> {
        &self.container
    }

    /// `$save`: creates when there is no id, otherwise updates in place.
    pub fn save(&self) -> Promise<Entity> {
        self.save_with(Callbacks::none())
    }

    pub fn save_with(&self, callbacks: Callbacks) -> Promise<Entity> {
        let data = self.data();
        let (action, params) = match entity_id(&data) {
            Some(id) => ("updateAttributes", Params::id(id)),
            None => ("create", Params::new()),
        };
        let definition = match self.resource.action(action) {
            Ok(definition) => definition.clone(),
            Err(e) => return settled(Err(e)),
        };
        debug!(model = %self.resource.name(), action, "Saving instance");

        let (tx, promise) = channel_promise::<Entity>();
        self.container.rearm(promise.clone());
        let call = Call {
            action: action.to_string(),
            definition,
            params,
            body: Some(Value::Object(data)),
            callbacks,
            hook: None,
        };
        self.resource.spawn_one(self.container.clone(), call, tx);
        promise
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("model", &self.resource.name())
            .field("data", &self.data())
            .field("resolved", &self.resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SessionStores, DEFAULT_STORAGE_KEY};
    use crate::framework::mock::MockTransport;
    use http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn entity(value: Value) -> Entity {
        value.as_object().cloned().unwrap()
    }

    fn handle(mock: &MockTransport, definition: ModelDefinition) -> ResourceHandle {
        let session = Arc::new(AuthSession::restore(
            SessionStores::in_memory(),
            DEFAULT_STORAGE_KEY,
        ));
        create_resource(definition, Arc::new(mock.clone()), session).unwrap()
    }

    #[tokio::test]
    async fn query_resolves_collection() {
        let mock = MockTransport::new();
        mock.expect(Method::GET, "/MyModels")
            .respond(StatusCode::OK, json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]));
        let models = handle(&mock, ModelDefinition::new("MyModel"));

        let collection = models.query(Params::new());
        assert!(!collection.resolved());
        let items = collection.promise().await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(collection.resolved());
        assert_eq!(collection.item(1).unwrap()["name"], "b");
        mock.verify();
    }

    #[tokio::test]
    async fn failed_query_leaves_collection_empty_and_unresolved() {
        let mock = MockTransport::new();
        mock.expect(Method::GET, "/MyModels")
            .respond(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": {"message": "boom"}}));
        let models = handle(&mock, ModelDefinition::new("MyModel"));

        let collection = models.query(Params::new());
        let err = collection.promise().await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(collection.is_empty());
        assert!(!collection.resolved());
    }

    #[tokio::test]
    async fn create_takes_server_representation() {
        let mock = MockTransport::new();
        mock.expect(Method::POST, "/MyModels")
            .respond(StatusCode::OK, json!({"id": 7, "name": "new"}));
        let models = handle(&mock, ModelDefinition::new("MyModel"));

        let created = models.create(entity(json!({"name": "new", "draft": true})));
        assert_eq!(created.get("name"), Some(json!("new")));
        let value = created.promise().await.unwrap();
        assert_eq!(value["id"], 7);
        assert!(value.get("draft").is_none());
        assert_eq!(created.id().as_deref(), Some("7"));
        assert_eq!(mock.requests()[0].body, Some(json!({"name": "new", "draft": true})));
    }

    #[tokio::test]
    async fn null_body_keeps_instance_data() {
        let mock = MockTransport::new();
        mock.expect(Method::DELETE, "/MyModels/2")
            .respond(StatusCode::NO_CONTENT, Value::Null);
        let models = handle(&mock, ModelDefinition::new("MyModel"));
        let deleted = models.delete_by_id(2);
        assert!(deleted.promise().await.unwrap().is_empty());
        assert!(deleted.resolved());
    }

    #[tokio::test]
    async fn save_creates_then_updates_same_instance() {
        let mock = MockTransport::new();
        mock.expect(Method::POST, "/MyModels")
            .respond(StatusCode::OK, json!({"id": 3, "name": "draft"}));
        mock.expect(Method::PUT, "/MyModels/3")
            .respond(StatusCode::OK, json!({"id": 3, "name": "final"}));
        let models = handle(&mock, ModelDefinition::new("MyModel"));

        let instance = models.instance(entity(json!({"name": "draft"})));
        assert!(instance.resolved());
        instance.save().await.unwrap();
        assert_eq!(instance.id().as_deref(), Some("3"));

        instance.set("name", "final");
        let saved = instance.save().await.unwrap();
        assert_eq!(saved["name"], "final");
        assert_eq!(instance.id().as_deref(), Some("3"));
        assert!(instance.resolved());
        mock.verify();
    }

    #[tokio::test]
    async fn callbacks_run_before_promise_settles() {
        let mock = MockTransport::new();
        mock.expect(Method::GET, "/MyModels/1")
            .respond(StatusCode::NOT_FOUND, json!({"error": {"statusCode": 404}}));
        let models = handle(&mock, ModelDefinition::new("MyModel"));

        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let invocation = models
            .invoke(
                "get",
                Params::id(1),
                None,
                Callbacks::none().on_error(move |e| {
                    assert_eq!(e.status(), Some(StatusCode::NOT_FOUND));
                    flag.store(true, Ordering::SeqCst);
                }),
            )
            .unwrap();
        let instance = invocation.into_instance().unwrap();
        assert!(instance.promise().await.is_err());
        assert!(called.load(Ordering::SeqCst));
        assert!(!instance.resolved());
    }

    #[tokio::test]
    async fn builtin_with_variants_run_callbacks() {
        let mock = MockTransport::new();
        mock.expect(Method::GET, "/MyModels")
            .respond(StatusCode::OK, json!([{"id": 1}]));
        mock.expect(Method::POST, "/MyModels")
            .respond(StatusCode::UNPROCESSABLE_ENTITY, json!({"error": {"statusCode": 422}}));
        let models = handle(&mock, ModelDefinition::new("MyModel"));

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let on_list = Arc::clone(&seen);
        let list = models.query_with(
            Params::new(),
            Callbacks::none().on_success(move |body| {
                on_list.lock().push(format!("query:{}", body.as_array().map_or(0, Vec::len)));
            }),
        );
        list.promise().await.unwrap();

        let on_create = Arc::clone(&seen);
        let created = models.create_with(
            entity(json!({"name": "x"})),
            Callbacks::none().on_error(move |e| {
                on_create.lock().push(format!("create:{:?}", e.status().map(|s| s.as_u16())));
            }),
        );
        assert!(created.promise().await.is_err());
        assert_eq!(*seen.lock(), vec!["query:1".to_string(), "create:Some(422)".to_string()]);
        mock.verify();
    }

    #[tokio::test]
    async fn custom_action_expands_params() {
        let mock = MockTransport::new();
        mock.expect(Method::GET, "/MyModels/4/greet")
            .respond(StatusCode::OK, json!({"greeting": "hi"}));
        let definition = ModelDefinition::new("MyModel")
            .action("greet", ActionDefinition::one(Method::GET, "/MyModels/:id/greet"));
        let models = handle(&mock, definition);

        let instance = models
            .invoke("greet", Params::id(4).with("lang", "en"), None, Callbacks::none())
            .unwrap()
            .into_instance()
            .unwrap();
        assert_eq!(instance.promise().await.unwrap()["greeting"], "hi");
        assert_eq!(mock.requests()[0].query_param("lang"), Some("en"));
    }

    #[tokio::test]
    async fn unknown_action_is_rejected_synchronously() {
        let mock = MockTransport::new();
        let models = handle(&mock, ModelDefinition::new("MyModel"));
        assert!(matches!(
            models.invoke("nope", Params::new(), None, Callbacks::none()),
            Err(ClientError::UnknownAction { .. })
        ));
    }

    #[tokio::test]
    async fn session_action_without_session_fails_locally() {
        let mock = MockTransport::new();
        let users = handle(&mock, ModelDefinition::new("user").base("User"));
        let current = users
            .invoke("getCurrent", Params::new(), None, Callbacks::none())
            .unwrap()
            .into_instance()
            .unwrap();
        let err = current.promise().await.unwrap_err();
        assert!(err.as_http().unwrap().is_stub());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn invalid_definition_is_rejected() {
        let session = Arc::new(AuthSession::restore(
            SessionStores::in_memory(),
            DEFAULT_STORAGE_KEY,
        ));
        let broken = ModelDefinition::new("MyModel")
            .action("query", ActionDefinition::one(Method::GET, "/MyModels"));
        assert!(create_resource(broken, Arc::new(MockTransport::new()), session).is_err());
    }
}
