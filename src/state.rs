use std::sync::Arc;

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::rate_limit::LoginRateLimiter;
use crate::registry::TestRegistry;
use crate::reports::ReportStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub users: CredentialStore,
    pub registry: TestRegistry,
    pub reports: ReportStore,
    pub login_limiter: LoginRateLimiter,
}
