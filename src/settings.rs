use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use log::info;
use postgres_from_row::FromRow;
use serde_json::{json, Value};

use crate::{
	common::check_required,
	db_client::DbClient,
	error::{success, AppError, AppResult},
	extract::AppJson,
	submissions::wizard::{check_email, check_phone},
};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, FromRow)]
pub struct Settings {
	pub business_name: String,
	pub phone: String,
	pub email: String,
	#[serde(default)]
	pub whatsapp: Option<String>,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub opening_hours: Option<String>,
	#[serde(default)]
	pub facebook: Option<String>,
	#[serde(default)]
	pub instagram: Option<String>,
	#[serde(default)]
	pub rental_terms: Option<String>,
	#[serde(default, skip_deserializing)]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
	fn default() -> Self {
		Settings {
			business_name: "Vehicle Marketplace".to_string(),
			phone: String::new(),
			email: String::new(),
			whatsapp: None,
			address: None,
			city: None,
			opening_hours: Some("Mon-Sat 9:00-19:00".to_string()),
			facebook: None,
			instagram: None,
			rental_terms: None,
			updated_at: None,
		}
	}
}

impl Settings {
	pub fn validate(&self) -> AppResult<()> {
		let mut errors = Vec::new();
		check_required(&self.business_name, "business_name", &mut errors);
		check_phone(&self.phone, "phone", &mut errors);
		check_email(&self.email, "email", &mut errors);
		if errors.is_empty() {
			Ok(())
		} else {
			Err(AppError::Validation(errors))
		}
	}
}

pub async fn get_settings(db: State<DbClient>) -> AppResult<Json<Value>> {
	let settings = match db.query_opt("SELECT * FROM settings WHERE id = 1", &[]).await? {
		Some(row) => Settings::try_from_row(&row)?,
		None => Settings::default(),
	};
	Ok(success(json!({ "settings": settings })))
}

pub async fn update_settings(db: State<DbClient>, settings: AppJson<Settings>) -> AppResult<Json<Value>> {
	let settings = settings.0;
	settings.validate()?;

	let row = db
		.query_one(
			"INSERT INTO settings (id, business_name, phone, email, whatsapp, address, city, opening_hours, facebook,
				instagram, rental_terms, updated_at)
			VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
			ON CONFLICT (id) DO UPDATE SET
				business_name = EXCLUDED.business_name,
				phone = EXCLUDED.phone,
				email = EXCLUDED.email,
				whatsapp = EXCLUDED.whatsapp,
				address = EXCLUDED.address,
				city = EXCLUDED.city,
				opening_hours = EXCLUDED.opening_hours,
				facebook = EXCLUDED.facebook,
				instagram = EXCLUDED.instagram,
				rental_terms = EXCLUDED.rental_terms,
				updated_at = now()
			RETURNING *",
			&[
				&settings.business_name.trim(),
				&settings.phone.trim(),
				&settings.email.trim(),
				&settings.whatsapp,
				&settings.address,
				&settings.city,
				&settings.opening_hours,
				&settings.facebook,
				&settings.instagram,
				&settings.rental_terms,
			],
		)
		.await?;
	let settings = Settings::try_from_row(&row)?;
	info!("Settings updated");
	Ok(success(json!({ "settings": settings })))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_body_fills_optional_fields() {
		let settings: Settings = serde_json::from_value(json!({
			"business_name": "Sai Motors",
			"phone": "9848022338",
			"email": "hello@saimotors.in",
			"updated_at": "2020-01-01T00:00:00Z"
		}))
		.unwrap();
		assert!(settings.validate().is_ok());
		assert_eq!(settings.whatsapp, None);
		assert_eq!(settings.updated_at, None);
	}

	#[test]
	fn contact_fields_are_required() {
		match Settings::default().validate() {
			Err(AppError::Validation(errors)) => {
				assert_eq!(errors, vec!["phone is required", "email is required"]);
			}
			other => panic!("expected validation error, got {other:?}"),
		}
	}
}
