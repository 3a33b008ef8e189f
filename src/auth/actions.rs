//! Session side effects of the user model's `login` and `logout` actions.
//!
//! The hooks run inside the request task, after the response arrives and
//! before the container resolves, whichever entry point issued the call.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::session::{AccessToken, AuthSession};
use super::storage::StorageKind;
use crate::error::ClientError;
use crate::framework::core::ResponseHook;
use crate::lifecycle::LogoutPolicy;
use crate::model::Params;

/// Call parameter selecting the storage backend of a login. Consumed
/// locally and never sent to the server.
pub const REMEMBER_ME_PARAM: &str = "rememberMe";

/// Strips [`REMEMBER_ME_PARAM`] from `params`. Anything other than an
/// explicit `false` means "remember me".
pub(crate) fn take_remember_me(params: &mut Params) -> StorageKind {
    let remember_me = !matches!(params.remove(REMEMBER_ME_PARAM), Some(Value::Bool(false)));
    StorageKind::from_remember_me(remember_me)
}

pub(crate) fn login_hook(session: Arc<AuthSession>, kind: StorageKind) -> ResponseHook {
    Box::new(move |result: Result<Value, ClientError>| {
        let body = result?;
        let token = AccessToken::from_response(&body)?;
        let user_id = token.user_id.clone();
        session.establish(token, kind)?;
        info!(%user_id, remember_me = kind.remember_me(), "Logged in");
        Ok(body)
    })
}

/// Local state is cleared whatever the server answers.
pub(crate) fn logout_hook(session: Arc<AuthSession>, policy: LogoutPolicy) -> ResponseHook {
    Box::new(move |result: Result<Value, ClientError>| {
        session.clear();
        match result {
            Ok(body) => {
                info!("Logged out");
                Ok(body)
            }
            Err(e) => match policy {
                LogoutPolicy::Swallow => {
                    warn!(error = %e, "Logout request failed, local session cleared");
                    Ok(Value::Null)
                }
                LogoutPolicy::Propagate => Err(e),
            },
        }
    })
}
