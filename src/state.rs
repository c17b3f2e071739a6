use std::sync::Arc;

use axum::extract::FromRef;

use crate::{admin::auth::AuthKeys, config::Config, db_client::DbClient};

#[derive(Clone)]
pub struct AppState {
	pub db: DbClient,
	pub config: Arc<Config>,
	pub auth: Arc<AuthKeys>,
}

impl AppState {
	pub fn new(db: DbClient, config: Config) -> Self {
		let auth = Arc::new(AuthKeys::new(&config));
		Self {
			db,
			config: Arc::new(config),
			auth,
		}
	}
}

impl FromRef<AppState> for DbClient {
	fn from_ref(state: &AppState) -> Self {
		state.db.clone()
	}
}

impl FromRef<AppState> for Arc<Config> {
	fn from_ref(state: &AppState) -> Self {
		state.config.clone()
	}
}

impl FromRef<AppState> for Arc<AuthKeys> {
	fn from_ref(state: &AppState) -> Self {
		state.auth.clone()
	}
}
