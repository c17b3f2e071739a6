use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};
use rand::{distributions::Alphanumeric, Rng};

const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct Config {
	pub port: u16,
	pub db_host: String,
	pub db_user: String,
	pub db_password: String,
	pub db_name: String,
	pub jwt_secret: String,
	pub admin_username: String,
	pub admin_password: Option<String>,
	pub upload_dir: String,
	pub image_max_dimension: u32,
	pub image_jpeg_quality: u8,
	pub max_upload_bytes: usize,
	pub token_ttl_hours: i64,
}

impl Config {
	pub fn load() -> Self {
		Self::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty()).unwrap_or_else(|| {
			warn!("JWT_SECRET not set, admin tokens will not survive a restart");
			rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
		});
		let admin_password = lookup("ADMIN_PASSWORD").filter(|s| !s.is_empty());
		if admin_password.is_none() {
			warn!("ADMIN_PASSWORD not set, admin login is disabled");
		}

		Self {
			port: try_load(&lookup, "PORT", 4000),
			db_host: try_load(&lookup, "DATABASE_HOST", "localhost".to_string()),
			db_user: try_load(&lookup, "DATABASE_USER", "postgres".to_string()),
			db_password: lookup("DATABASE_PASSWORD").unwrap_or_else(|| "postgres".to_string()),
			db_name: try_load(&lookup, "DATABASE_NAME", "marketplace".to_string()),
			jwt_secret,
			admin_username: try_load(&lookup, "ADMIN_USERNAME", "admin".to_string()),
			admin_password,
			upload_dir: try_load(&lookup, "UPLOAD_DIR", "uploads".to_string()),
			image_max_dimension: try_load(&lookup, "IMAGE_MAX_DIMENSION", 1600),
			image_jpeg_quality: try_load::<u8, _>(&lookup, "IMAGE_JPEG_QUALITY", 80).clamp(1, 100),
			max_upload_bytes: try_load(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
			token_ttl_hours: try_load::<i64, _>(&lookup, "TOKEN_TTL_HOURS", 12).clamp(1, MAX_TOKEN_TTL_HOURS),
		}
	}

	pub fn database_url(&self) -> String {
		format!(
			"host={} user={} password={} dbname={}",
			self.db_host, self.db_user, self.db_password, self.db_name
		)
	}
}

fn try_load<T, F>(lookup: &F, key: &str, default: T) -> T
where
	T: FromStr + Display,
	T::Err: Display,
	F: Fn(&str) -> Option<String>,
{
	match lookup(key) {
		Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
			warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
			default
		}),
		None => {
			info!("{key} not set, using default: {default}");
			default
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn config_from(vars: &[(&str, &str)]) -> Config {
		let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		Config::from_lookup(|key| map.get(key).cloned())
	}

	#[test]
	fn defaults_apply_when_unset() {
		let config = config_from(&[]);
		assert_eq!(config.port, 4000);
		assert_eq!(config.upload_dir, "uploads");
		assert_eq!(config.image_max_dimension, 1600);
		assert_eq!(config.image_jpeg_quality, 80);
		assert!(config.admin_password.is_none());
		assert_eq!(config.jwt_secret.len(), 48);
	}

	#[test]
	fn invalid_values_fall_back_to_defaults() {
		let config = config_from(&[("PORT", "not-a-port"), ("IMAGE_JPEG_QUALITY", "250")]);
		assert_eq!(config.port, 4000);
		assert_eq!(config.image_jpeg_quality, 80);
	}

	#[test]
	fn token_lifetime_is_bounded() {
		assert_eq!(config_from(&[("TOKEN_TTL_HOURS", "9223372036854775807")]).token_ttl_hours, MAX_TOKEN_TTL_HOURS);
		assert_eq!(config_from(&[("TOKEN_TTL_HOURS", "-3")]).token_ttl_hours, 1);
		assert_eq!(config_from(&[("TOKEN_TTL_HOURS", "48")]).token_ttl_hours, 48);
	}

	#[test]
	fn reads_values_and_builds_database_url() {
		let config = config_from(&[
			("PORT", "8080"),
			("DATABASE_HOST", "db"),
			("DATABASE_USER", "shop"),
			("DATABASE_PASSWORD", "secret"),
			("DATABASE_NAME", "vehicles"),
			("ADMIN_PASSWORD", "hunter2"),
			("IMAGE_JPEG_QUALITY", "0"),
		]);
		assert_eq!(config.port, 8080);
		assert_eq!(config.admin_password.as_deref(), Some("hunter2"));
		assert_eq!(config.image_jpeg_quality, 1);
		assert_eq!(config.database_url(), "host=db user=shop password=secret dbname=vehicles");
	}
}
