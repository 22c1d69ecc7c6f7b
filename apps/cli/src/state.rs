use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::SessionStore;
use crate::config::Config;

/// Shared application context handed to every page.
pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionStore>,
    /// Authenticated backend client; tokens come from the session store on
    /// every call.
    pub api: ApiClient,
}
