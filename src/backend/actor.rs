//! # In-process Backend
//!
//! A LoopBack-style REST server that runs as an actor. It owns every model
//! table, the user credentials and the issued access tokens; requests reach
//! it over a channel through [`BackendClient`], which implements
//! [`Transport`].
//!
//! **Concurrency Model**: the actor processes its messages *sequentially*, so
//! the tables need no locks. Clients are cheap to clone and may be used from
//! any task.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::framework::transport::{Request, Response, Transport};
use crate::model::{Entity, ModelDefinition};

/// Lifetime reported for issued tokens: two weeks, in seconds.
pub const TOKEN_TTL: u64 = 1_209_600;

/// Header the backend reads the access token from.
pub const TOKEN_HEADER: &str = "authorization";

/// One table exposed under `/{plural}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendModel {
    pub plural: String,
    /// Enables `login`/`logout` and credential checks on this table.
    pub is_user: bool,
}

impl From<&ModelDefinition> for BackendModel {
    fn from(definition: &ModelDefinition) -> Self {
        Self {
            plural: definition.plural_name().to_string(),
            is_user: definition.is_user_model(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub models: Vec<BackendModel>,
    /// When set, every request except user creation and login needs a valid
    /// access token.
    pub enable_auth: bool,
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, plural: impl Into<String>) -> Self {
        self.models.push(BackendModel {
            plural: plural.into(),
            is_user: false,
        });
        self
    }

    pub fn user_model(mut self, plural: impl Into<String>) -> Self {
        self.models.push(BackendModel {
            plural: plural.into(),
            is_user: true,
        });
        self
    }

    /// Serves every definition under its plural.
    pub fn from_definitions<'a>(definitions: impl IntoIterator<Item = &'a ModelDefinition>) -> Self {
        Self {
            models: definitions.into_iter().map(BackendModel::from).collect(),
            enable_auth: false,
        }
    }

    pub fn enable_auth(mut self, enable_auth: bool) -> Self {
        self.enable_auth = enable_auth;
        self
    }
}

/// Message sent to the backend actor.
#[derive(Debug)]
struct BackendRequest {
    request: Request,
    respond_to: oneshot::Sender<Response>,
}

#[derive(Debug, Default)]
struct Table {
    is_user: bool,
    next_id: u64,
    rows: BTreeMap<u64, Entity>,
}

impl Table {
    fn insert(&mut self, mut data: Entity) -> Entity {
        self.next_id += 1;
        let id = self.next_id;
        data.insert("id".into(), json!(id));
        self.rows.insert(id, data.clone());
        data
    }

    /// Public view of a row; user passwords never leave the table.
    fn view(&self, row: &Entity) -> Value {
        let mut row = row.clone();
        if self.is_user {
            row.remove("password");
        }
        Value::Object(row)
    }
}

/// Criteria parsed from a LoopBack `filter` query parameter.
#[derive(Debug, Default)]
struct Filter {
    conditions: Entity,
    limit: Option<usize>,
    skip: usize,
}

impl Filter {
    fn from_request(request: &Request) -> Result<Self, Response> {
        let mut filter = Filter::default();
        if let Some(raw) = request.query_param("filter") {
            let value: Value = serde_json::from_str(raw)
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, "Error", format!("Invalid filter: {e}")))?;
            if let Some(conditions) = value.get("where").and_then(Value::as_object) {
                filter.conditions = conditions.clone();
            }
            filter.limit = value.get("limit").and_then(Value::as_u64).map(|n| n as usize);
            filter.skip = value
                .get("skip")
                .or_else(|| value.get("offset"))
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize;
        }
        if let Some(raw) = request.query_param("where") {
            let value: Value = serde_json::from_str(raw)
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, "Error", format!("Invalid where: {e}")))?;
            if let Some(conditions) = value.as_object() {
                filter.conditions = conditions.clone();
            }
        }
        Ok(filter)
    }

    fn matches(&self, row: &Entity) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| row.get(field) == Some(expected))
    }

    fn apply<'a>(&self, table: &'a Table) -> Vec<&'a Entity> {
        let matches = table.rows.values().filter(|row| self.matches(row)).skip(self.skip);
        match self.limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        }
    }
}

/// The backend actor: tables, credentials and tokens.
pub struct BackendActor {
    receiver: mpsc::Receiver<BackendRequest>,
    tables: HashMap<String, Table>,
    tokens: HashMap<String, u64>,
    enable_auth: bool,
}

impl BackendActor {
    pub fn new(buffer_size: usize, config: BackendConfig) -> (Self, BackendClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let tables = config
            .models
            .into_iter()
            .map(|model| {
                let table = Table {
                    is_user: model.is_user,
                    ..Table::default()
                };
                (model.plural, table)
            })
            .collect();
        let actor = Self {
            receiver,
            tables,
            tokens: HashMap::new(),
            enable_auth: config.enable_auth,
        };
        (actor, BackendClient { sender })
    }

    /// Runs the actor's event loop, processing requests until every client is dropped.
    pub async fn run(mut self) {
        info!(tables = self.tables.len(), auth = self.enable_auth, "Backend started");
        while let Some(BackendRequest { request, respond_to }) = self.receiver.recv().await {
            let response = self.handle(&request);
            debug!(
                method = %request.method,
                uri = %request.uri(),
                status = response.status.as_u16(),
                "Handled"
            );
            let _ = respond_to.send(response);
        }
        info!(tokens = self.tokens.len(), "Backend shutdown");
    }

    fn handle(&mut self, request: &Request) -> Response {
        let segments: Vec<&str> = request.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((plural, rest)) = segments.split_first() else {
            return not_found(&request.path);
        };
        let Some(is_user) = self.tables.get(*plural).map(|t| t.is_user) else {
            return not_found(&request.path);
        };

        let public = is_user
            && request.method == Method::POST
            && (rest.is_empty() || rest == ["login"]);
        if self.enable_auth && !public && self.authenticated_user(request).is_none() {
            warn!(method = %request.method, path = %request.path, "Rejected unauthenticated request");
            return error_response(StatusCode::UNAUTHORIZED, "Error", "Authorization Required");
        }

        let response = match (&request.method, rest) {
            (&Method::POST, ["login"]) if is_user => self.login(plural, request),
            (&Method::POST, ["logout"]) if is_user => self.logout(request),
            (&Method::GET, []) => self.list(plural, request),
            (&Method::POST, []) => self.create(plural, request),
            (&Method::PUT, []) => self.upsert(plural, request),
            (&Method::GET, ["count"]) => self.count(plural, request),
            (&Method::GET, ["findOne"]) => self.find_one(plural, request),
            (&Method::POST, ["update"]) => self.update_all(plural, request),
            (&Method::GET, [id, "exists"]) => {
                let exists = parse_id(id).is_some_and(|id| self.table(plural).rows.contains_key(&id));
                Response::ok(json!({ "exists": exists }))
            }
            (&Method::GET, [id]) => self.find_by_id(plural, id),
            (&Method::PUT, [id]) => self.update_attributes(plural, id, request),
            (&Method::DELETE, [id]) => self.delete_by_id(plural, id),
            _ => not_found(&request.path),
        };
        response.with_header(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"))
    }

    fn table(&self, plural: &str) -> &Table {
        &self.tables[plural]
    }

    fn table_mut(&mut self, plural: &str) -> &mut Table {
        self.tables.entry(plural.to_string()).or_default()
    }

    fn authenticated_user(&self, request: &Request) -> Option<u64> {
        request
            .header(TOKEN_HEADER)
            .and_then(|token| self.tokens.get(token))
            .copied()
    }

    fn list(&self, plural: &str, request: &Request) -> Response {
        let filter = match Filter::from_request(request) {
            Ok(filter) => filter,
            Err(response) => return response,
        };
        let table = self.table(plural);
        let rows: Vec<Value> = filter.apply(table).into_iter().map(|row| table.view(row)).collect();
        Response::ok(Value::Array(rows))
    }

    fn count(&self, plural: &str, request: &Request) -> Response {
        match Filter::from_request(request) {
            Ok(filter) => Response::ok(json!({ "count": filter.apply(self.table(plural)).len() })),
            Err(response) => response,
        }
    }

    fn find_one(&self, plural: &str, request: &Request) -> Response {
        let filter = match Filter::from_request(request) {
            Ok(filter) => filter,
            Err(response) => return response,
        };
        let table = self.table(plural);
        match filter.apply(table).first() {
            Some(row) => Response::ok(table.view(row)),
            None => error_response(StatusCode::NOT_FOUND, "Error", "Unknown instance"),
        }
    }

    fn find_by_id(&self, plural: &str, id: &str) -> Response {
        let table = self.table(plural);
        match parse_id(id).and_then(|id| table.rows.get(&id)) {
            Some(row) => Response::ok(table.view(row)),
            None => unknown_id(plural, id),
        }
    }

    fn create(&mut self, plural: &str, request: &Request) -> Response {
        let data = match body_object(request) {
            Ok(data) => data,
            Err(response) => return response,
        };
        if let Err(response) = self.validate_user(plural, &data, None) {
            return response;
        }
        let table = self.table_mut(plural);
        let created = table.insert(without_id(data));
        info!(plural, id = %created["id"], size = table.rows.len(), "Created");
        Response::ok(table.view(&created))
    }

    fn upsert(&mut self, plural: &str, request: &Request) -> Response {
        let data = match body_object(request) {
            Ok(data) => data,
            Err(response) => return response,
        };
        let existing = data
            .get("id")
            .and_then(Value::as_u64)
            .filter(|id| self.table(plural).rows.contains_key(id));
        match existing {
            Some(id) => self.update_row(plural, id, data),
            None => {
                if let Err(response) = self.validate_user(plural, &data, None) {
                    return response;
                }
                let table = self.table_mut(plural);
                let created = table.insert(without_id(data));
                info!(plural, id = %created["id"], size = table.rows.len(), "Created");
                Response::ok(table.view(&created))
            }
        }
    }

    fn update_attributes(&mut self, plural: &str, id: &str, request: &Request) -> Response {
        let data = match body_object(request) {
            Ok(data) => data,
            Err(response) => return response,
        };
        match parse_id(id).filter(|id| self.table(plural).rows.contains_key(id)) {
            Some(id) => self.update_row(plural, id, data),
            None => unknown_id(plural, id),
        }
    }

    fn update_row(&mut self, plural: &str, id: u64, data: Entity) -> Response {
        if let Err(response) = self.validate_user(plural, &data, Some(id)) {
            return response;
        }
        let table = self.table_mut(plural);
        let Some(row) = table.rows.get_mut(&id) else {
            return unknown_id(plural, &id.to_string());
        };
        for (field, value) in without_id(data) {
            row.insert(field, value);
        }
        let updated = row.clone();
        info!(plural, id, "Updated");
        Response::ok(table.view(&updated))
    }

    fn update_all(&mut self, plural: &str, request: &Request) -> Response {
        let filter = match Filter::from_request(request) {
            Ok(filter) => filter,
            Err(response) => return response,
        };
        let data = match body_object(request) {
            Ok(data) => without_id(data),
            Err(response) => return response,
        };
        let table = self.table_mut(plural);
        let mut count = 0;
        for row in table.rows.values_mut().filter(|row| filter.matches(row)) {
            for (field, value) in &data {
                row.insert(field.clone(), value.clone());
            }
            count += 1;
        }
        info!(plural, count, "Updated all");
        Response::ok(json!({ "count": count }))
    }

    fn delete_by_id(&mut self, plural: &str, id: &str) -> Response {
        let table = self.table_mut(plural);
        let removed = parse_id(id).and_then(|id| table.rows.remove(&id)).is_some();
        if removed {
            info!(plural, id, size = table.rows.len(), "Deleted");
        }
        Response::ok(json!({ "count": usize::from(removed) }))
    }

    fn login(&mut self, plural: &str, request: &Request) -> Response {
        let credentials = match body_object(request) {
            Ok(credentials) => credentials,
            Err(response) => return response,
        };
        let email = credentials.get("email");
        let password = credentials.get("password");
        let table = self.table(plural);
        let user = table.rows.iter().find(|(_, row)| {
            email.is_some() && row.get("email") == email && row.get("password") == password
        });
        let Some((user_id, row)) = user else {
            warn!(plural, "Login failed");
            return error_response(StatusCode::UNAUTHORIZED, "Error", "login failed");
        };

        let token = uuid::Uuid::new_v4().to_string();
        let mut body = json!({ "id": token, "ttl": TOKEN_TTL, "userId": user_id });
        let include = request.query_param("include").unwrap_or_default();
        if !include.is_empty() {
            body["user"] = table.view(row);
        }
        let user_id = *user_id;
        self.tokens.insert(token, user_id);
        info!(plural, user_id, "Logged in");
        Response::ok(body)
    }

    fn logout(&mut self, request: &Request) -> Response {
        if let Some(token) = request.header(TOKEN_HEADER) {
            if let Some(user_id) = self.tokens.remove(token) {
                info!(user_id, "Logged out");
            }
        }
        Response::new(StatusCode::NO_CONTENT, Value::Null)
    }

    /// Users need an email and a password, and emails are unique.
    fn validate_user(&self, plural: &str, data: &Entity, id: Option<u64>) -> Result<(), Response> {
        let table = self.table(plural);
        if !table.is_user {
            return Ok(());
        }
        let creating = id.is_none();
        for field in ["email", "password"] {
            let present = data.get(field).and_then(Value::as_str).is_some_and(|v| !v.is_empty());
            if creating && !present {
                return Err(error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "ValidationError",
                    format!("`{field}` can't be blank"),
                ));
            }
        }
        if let Some(email) = data.get("email") {
            let taken = table
                .rows
                .iter()
                .any(|(row_id, row)| Some(*row_id) != id && row.get("email") == Some(email));
            if taken {
                return Err(error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "ValidationError",
                    "`email` Email already exists",
                ));
            }
        }
        Ok(())
    }
}

fn parse_id(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

fn without_id(mut data: Entity) -> Entity {
    data.remove("id");
    data
}

fn body_object(request: &Request) -> Result<Entity, Response> {
    match &request.body {
        Some(Value::Object(data)) => Ok(data.clone()),
        None | Some(Value::Null) => Ok(Entity::new()),
        Some(_) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "Error",
            "Request body must be an object",
        )),
    }
}

fn error_response(status: StatusCode, name: &str, message: impl Into<String>) -> Response {
    Response::new(
        status,
        json!({
            "error": {
                "statusCode": status.as_u16(),
                "name": name,
                "message": message.into(),
            }
        }),
    )
    .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"))
}

fn not_found(path: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "Error",
        format!("There is no method to handle {path}"),
    )
}

fn unknown_id(plural: &str, id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "Error",
        format!("Unknown \"{plural}\" id \"{id}\"."),
    )
}

/// A cheap, cloneable handle to a running [`BackendActor`].
#[derive(Clone, Debug)]
pub struct BackendClient {
    sender: mpsc::Sender<BackendRequest>,
}

#[async_trait]
impl Transport for BackendClient {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(BackendRequest { request, respond_to })
            .await
            .map_err(|_| ClientError::Closed)?;
        response.await.map_err(|_| ClientError::Closed)
    }
}

/// Spawns a backend with a 100-message buffer.
pub fn spawn(config: BackendConfig) -> (BackendClient, tokio::task::JoinHandle<()>) {
    let (actor, client) = BackendActor::new(100, config);
    let handle = tokio::spawn(actor.run());
    (client, handle)
}
