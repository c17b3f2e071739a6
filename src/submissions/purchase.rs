use axum::{
	extract::State,
	Json,
};
use log::{info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use super::submissions::{find_submission, Submission, SubmissionStatus};
use crate::{
	cars::cars::{insert_vehicle, VehicleInput, VehicleStatus},
	common::round_money,
	db_client::DbClient,
	error::{success, AppError, AppResult},
	extract::{AppJson, AppPath},
};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PurchaseRequest {
	pub purchase_price: f64,
	pub selling_price: f64,
	#[serde(default)]
	pub featured: bool,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub features: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Margin {
	pub profit: f64,
	pub margin_percent: f64,
}

pub fn margin(purchase_price: f64, selling_price: f64) -> Margin {
	let profit = round_money(selling_price - purchase_price);
	let margin_percent = if selling_price > 0.0 { round_money(profit / selling_price * 100.0) } else { 0.0 };
	Margin { profit, margin_percent }
}

/// The inventory listing a bought submission turns into.
pub fn vehicle_from_submission(submission: &Submission, request: &PurchaseRequest) -> AppResult<VehicleInput> {
	match submission.status {
		SubmissionStatus::Purchased => return Err(AppError::Conflict("Submission was already purchased".to_string())),
		SubmissionStatus::Rejected => return Err(AppError::Conflict("A rejected submission cannot be purchased".to_string())),
		_ => {}
	}

	let mut errors = Vec::new();
	if !(request.purchase_price > 0.0) {
		errors.push("purchase_price must be greater than zero".to_string());
	}
	if !(request.selling_price > 0.0) {
		errors.push("selling_price must be greater than zero".to_string());
	}
	if !errors.is_empty() {
		return Err(AppError::Validation(errors));
	}

	VehicleInput {
		vehicle_type: submission.vehicle_type,
		brand: submission.brand.clone(),
		model: submission.model.clone(),
		variant: submission.variant.clone(),
		year: submission.year,
		km_driven: submission.km_driven,
		fuel_type: submission.fuel_type,
		transmission: submission.transmission,
		ownership: submission.ownership,
		color: None,
		registration_number: submission.registration_number.clone(),
		price: request.selling_price,
		purchase_price: Some(request.purchase_price),
		location: submission.location.clone(),
		images: submission.images.clone(),
		features: request.features.clone(),
		description: request.description.clone().or_else(|| submission.description.clone()),
		status: Some(VehicleStatus::Available),
		featured: request.featured,
		submission_id: Some(submission.id),
	}
	.prepare()
}

pub async fn purchase_submission(db: State<DbClient>, AppPath(id): AppPath<Uuid>, request: AppJson<PurchaseRequest>) -> AppResult<Json<Value>> {
	let request = request.0;
	let submission = find_submission(&db, id).await?;
	let input = vehicle_from_submission(&submission, &request)?;
	let margin = margin(request.purchase_price, request.selling_price);
	if margin.profit < 0.0 {
		warn!("Submission {} bought above its selling price", submission.reference_number);
	}

	let vehicle = insert_vehicle(&db, &input).await?;
	db.execute(
		"UPDATE submissions SET status = $2, vehicle_id = $3, offered_price = $4, updated_at = now() WHERE id = $1",
		&[&submission.id, &SubmissionStatus::Purchased, &vehicle.id, &request.purchase_price],
	)
	.await?;

	info!(
		"Submission {} purchased into inventory as vehicle {} (profit {})",
		submission.reference_number, vehicle.id, margin.profit
	);
	Ok(success(json!({
		"vehicle": vehicle,
		"profit": margin.profit,
		"margin_percent": margin.margin_percent,
	})))
}

#[cfg(test)]
mod tests {
	use chrono::Utc;

	use super::*;
	use crate::common::{FuelType, Location, Transmission, VehicleType};

	fn submission(status: SubmissionStatus) -> Submission {
		Submission {
			id: Uuid::new_v4(),
			reference_number: "SUB-20240101-ABCDEF".into(),
			seller_name: "Meera".into(),
			seller_email: "meera@example.com".into(),
			seller_phone: "9848022338".into(),
			vehicle_type: VehicleType::Car,
			brand: "Hyundai".into(),
			model: "Creta".into(),
			variant: Some("SX".into()),
			year: 2018,
			km_driven: 61000,
			fuel_type: FuelType::Diesel,
			transmission: Transmission::Manual,
			ownership: 2,
			registration_number: "TS09EK4321".into(),
			expected_price: 900000.0,
			location: Location { city: "Hyderabad".into(), state: "Telangana".into() },
			images: vec!["/uploads/front.jpg".into()],
			description: Some("Single careful owner".into()),
			status,
			offered_price: None,
			admin_notes: None,
			vehicle_id: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn request() -> PurchaseRequest {
		PurchaseRequest {
			purchase_price: 800000.0,
			selling_price: 950000.0,
			featured: true,
			description: None,
			features: vec!["Sunroof".into()],
		}
	}

	#[test]
	fn copies_submission_into_listing() {
		let submission = submission(SubmissionStatus::Approved);
		let input = vehicle_from_submission(&submission, &request()).unwrap();
		assert_eq!(input.brand, "Hyundai");
		assert_eq!(input.registration_number, "TS09EK4321");
		assert_eq!(input.price, 950000.0);
		assert_eq!(input.purchase_price, Some(800000.0));
		assert_eq!(input.submission_id, Some(submission.id));
		assert_eq!(input.status, Some(VehicleStatus::Available));
		assert_eq!(input.description.as_deref(), Some("Single careful owner"));
		assert!(input.featured);
	}

	#[test]
	fn profit_and_margin() {
		assert_eq!(margin(800000.0, 950000.0), Margin { profit: 150000.0, margin_percent: 15.79 });
		assert_eq!(margin(100.0, 80.0).profit, -20.0);
		assert_eq!(margin(10.0, 0.0).margin_percent, 0.0);
	}

	#[test]
	fn final_states_cannot_be_purchased() {
		for status in [SubmissionStatus::Purchased, SubmissionStatus::Rejected] {
			let result = vehicle_from_submission(&submission(status), &request());
			assert!(matches!(result, Err(AppError::Conflict(_))));
		}
	}

	#[test]
	fn prices_must_be_positive() {
		let mut bad = request();
		bad.purchase_price = 0.0;
		bad.selling_price = -1.0;
		match vehicle_from_submission(&submission(SubmissionStatus::Pending), &bad) {
			Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 2),
			other => panic!("expected validation error, got {other:?}"),
		}
	}
}
