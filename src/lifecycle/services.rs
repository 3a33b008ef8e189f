use std::collections::BTreeMap;
use std::sync::Arc;

use http::HeaderName;
use tracing::{debug, info};

use super::config::ClientConfig;
use crate::auth::{AuthInterceptor, AuthSession, FileStorage, MemoryStorage, SessionStores};
use crate::clients::UserClient;
use crate::error::{ClientError, DefinitionError, SetupError};
use crate::framework::{create_resource, settled, Promise, ResourceHandle, Transport};
use crate::model::{Entity, ModelDefinition, USER_BASE};

/// The client registry of one application.
///
/// `Services` is responsible for:
/// - **Session ownership**: one [`AuthSession`], restored from storage on build
/// - **Dependency wiring**: every resource sends through the same
///   [`AuthInterceptor`], which decorates the caller's transport
/// - **Lookup**: one [`ResourceHandle`] per model under its normalized name
///
/// # Example
///
/// ```ignore
/// let services = Services::builder(transport)
///     .model(ModelDefinition::new("user").base(USER_BASE))
///     .model(ModelDefinition::new("MyModel"))
///     .build()?;
///
/// let users = services.user().unwrap();
/// users.login(credentials, LoginOptions::default()).promise().await?;
/// let mine = services.resource("MyModel")?.query(Params::new());
/// ```
pub struct Services {
    session: Arc<AuthSession>,
    resources: BTreeMap<String, ResourceHandle>,
    user: Option<UserClient>,
    config: ClientConfig,
}

impl Services {
    pub fn builder(transport: Arc<dyn Transport>) -> ServicesBuilder {
        ServicesBuilder::new(transport)
    }

    /// Looks a model up by its exact normalized name.
    pub fn get(&self, name: &str) -> Option<&ResourceHandle> {
        self.resources.get(name)
    }

    /// Like [`Services::get`] but fails with [`ClientError::UnknownModel`].
    pub fn resource(&self, name: &str) -> Result<&ResourceHandle, ClientError> {
        self.get(name)
            .ok_or_else(|| ClientError::UnknownModel(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Client of the model whose base is `User`, if one was registered.
    pub fn user(&self) -> Option<&UserClient> {
        self.user.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `$currentUser`.
    pub fn current_user(&self) -> Option<Entity> {
        self.session.current_user().current()
    }

    /// `$ensureCurrentUser()`.
    pub fn ensure_current_user(&self) -> Promise<Entity> {
        match &self.user {
            Some(user) => user.ensure_current_user(),
            None => settled(Err(ClientError::UnknownModel(USER_BASE.to_string()))),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("models", &self.model_names())
            .field("authenticated", &self.session.is_authenticated())
            .finish()
    }
}

/// Collects model definitions and storage before wiring a [`Services`].
pub struct ServicesBuilder {
    transport: Arc<dyn Transport>,
    stores: Option<SessionStores>,
    config: ClientConfig,
    models: Vec<ModelDefinition>,
}

impl ServicesBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            stores: None,
            config: ClientConfig::default(),
            models: Vec::new(),
        }
    }

    /// Session backends; defaults to [`ClientConfig::session_file`] (or memory)
    /// for the durable side and memory for the ephemeral side.
    pub fn storage(mut self, stores: SessionStores) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model(mut self, definition: ModelDefinition) -> Self {
        self.models.push(definition);
        self
    }

    /// Restores the session, then creates every resource.
    ///
    /// This method:
    /// 1. Restores the session from the durable, then the ephemeral backend
    /// 2. Wraps the transport in the [`AuthInterceptor`]
    /// 3. Validates and registers every model under its normalized name
    pub fn build(self) -> Result<Services, SetupError> {
        let header = HeaderName::from_bytes(self.config.auth_header.to_ascii_lowercase().as_bytes())
            .map_err(|_| SetupError::InvalidHeader(self.config.auth_header.clone()))?;

        let stores = match self.stores {
            Some(stores) => stores,
            None => default_stores(&self.config),
        };
        let session = Arc::new(AuthSession::restore(stores, self.config.storage_key.clone()));
        let transport: Arc<dyn Transport> = Arc::new(AuthInterceptor::new(
            self.transport,
            Arc::clone(&session),
            header,
        ));

        let mut resources = BTreeMap::new();
        let mut user: Option<(String, UserClient)> = None;
        for definition in self.models {
            let name = definition.exposed_name();
            if resources.contains_key(&name) {
                return Err(DefinitionError::DuplicateModel(name).into());
            }
            let is_user = definition.is_user_model();
            let handle = create_resource(definition, Arc::clone(&transport), Arc::clone(&session))?
                .with_logout_policy(self.config.logout_errors);
            if is_user {
                if let Some((existing, _)) = &user {
                    return Err(SetupError::MultipleUserModels(existing.clone(), name));
                }
                let client = UserClient::new(handle.clone());
                user = Some((name.clone(), client));
            }
            debug!(model = %name, user_model = is_user, "Registered model");
            resources.insert(name, handle);
        }

        info!(
            models = resources.len(),
            authenticated = session.is_authenticated(),
            "Client registry built"
        );
        Ok(Services {
            session,
            resources,
            user: user.map(|(_, client)| client),
            config: self.config,
        })
    }
}

fn default_stores(config: &ClientConfig) -> SessionStores {
    match &config.session_file {
        Some(path) => SessionStores::new(
            Arc::new(FileStorage::new(path.clone())),
            Arc::new(MemoryStorage::new()),
        ),
        None => SessionStores::in_memory(),
    }
}
