//! The four steps of the "sell your vehicle" form and the checks each step
//! must pass before the customer can move on.

use std::str::FromStr;

use crate::{
	common::{check_required, check_year, normalize_registration, FuelType, Location, ParseEnumError, Transmission, VehicleType},
	error::{AppError, AppResult},
};

pub const MAX_IMAGES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
	Vehicle,
	Condition,
	Pricing,
	Contact,
}

impl WizardStep {
	pub const ALL: [WizardStep; 4] = [WizardStep::Vehicle, WizardStep::Condition, WizardStep::Pricing, WizardStep::Contact];

	pub fn from_index(index: u8) -> AppResult<Self> {
		Self::ALL
			.get((index as usize).wrapping_sub(1))
			.copied()
			.ok_or_else(|| AppError::BadRequest(format!("step must be between 1 and {}", Self::ALL.len())))
	}

	pub fn index(self) -> u8 {
		match self {
			WizardStep::Vehicle => 1,
			WizardStep::Condition => 2,
			WizardStep::Pricing => 3,
			WizardStep::Contact => 4,
		}
	}

	pub fn next(self) -> Option<Self> {
		Self::ALL.get(self.index() as usize).copied()
	}
}

/// A partially filled form. Every field may still be missing.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct SubmissionDraft {
	pub vehicle_type: String,
	pub brand: String,
	pub model: String,
	pub variant: Option<String>,
	pub year: Option<i32>,
	pub km_driven: Option<i32>,
	pub fuel_type: String,
	pub transmission: String,
	pub ownership: Option<i32>,
	pub registration_number: String,
	pub expected_price: Option<f64>,
	pub images: Vec<String>,
	pub description: Option<String>,
	pub seller_name: String,
	pub seller_email: String,
	pub seller_phone: String,
	pub location: Location,
}

/// A draft that passed every step.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
	pub vehicle_type: VehicleType,
	pub brand: String,
	pub model: String,
	pub variant: Option<String>,
	pub year: i32,
	pub km_driven: i32,
	pub fuel_type: FuelType,
	pub transmission: Transmission,
	pub ownership: i32,
	pub registration_number: String,
	pub expected_price: f64,
	pub images: Vec<String>,
	pub description: Option<String>,
	pub seller_name: String,
	pub seller_email: String,
	pub seller_phone: String,
	pub location: Location,
}

pub fn check_email(value: &str, field: &str, errors: &mut Vec<String>) {
	let value = value.trim();
	if value.is_empty() {
		errors.push(format!("{field} is required"));
		return;
	}
	let valid = match value.split_once('@') {
		Some((user, domain)) => {
			!user.is_empty() && !value.contains(char::is_whitespace) && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
		}
		None => false,
	};
	if !valid {
		errors.push(format!("{field} is not a valid email address"));
	}
}

pub fn check_phone(value: &str, field: &str, errors: &mut Vec<String>) {
	let value = value.trim();
	if value.is_empty() {
		errors.push(format!("{field} is required"));
		return;
	}
	let allowed = value.chars().all(|c| c.is_ascii_digit() || " +-()".contains(c));
	let digits = value.chars().filter(char::is_ascii_digit).count();
	if !allowed || !(10..=13).contains(&digits) {
		errors.push(format!("{field} must contain 10 to 13 digits"));
	}
}

fn check_choice<T>(value: &str, field: &str, errors: &mut Vec<String>)
where
	T: FromStr<Err = ParseEnumError>,
{
	if value.trim().is_empty() {
		errors.push(format!("{field} is required"));
	} else if let Err(e) = value.parse::<T>() {
		errors.push(e.to_string());
	}
}

fn check_number<T: PartialOrd + Copy>(value: Option<T>, field: &str, min: T, rule: &str, errors: &mut Vec<String>) {
	match value {
		None => errors.push(format!("{field} is required")),
		Some(v) if v < min => errors.push(format!("{field} {rule}")),
		Some(_) => {}
	}
}

pub fn validate_step(step: WizardStep, draft: &SubmissionDraft) -> Vec<String> {
	let mut errors = Vec::new();
	match step {
		WizardStep::Vehicle => {
			check_choice::<VehicleType>(&draft.vehicle_type, "vehicle_type", &mut errors);
			check_required(&draft.brand, "brand", &mut errors);
			check_required(&draft.model, "model", &mut errors);
			match draft.year {
				Some(year) => check_year(year, &mut errors),
				None => errors.push("year is required".to_string()),
			}
		}
		WizardStep::Condition => {
			check_number(draft.km_driven, "km_driven", 0, "cannot be negative", &mut errors);
			check_choice::<FuelType>(&draft.fuel_type, "fuel_type", &mut errors);
			check_choice::<Transmission>(&draft.transmission, "transmission", &mut errors);
			check_number(draft.ownership, "ownership", 1, "must be at least 1", &mut errors);
			let registration = normalize_registration(&draft.registration_number);
			if registration.is_empty() {
				errors.push("registration_number is required".to_string());
			} else if !(4..=12).contains(&registration.len()) || !registration.chars().all(|c| c.is_ascii_alphanumeric()) {
				errors.push("registration_number is not valid".to_string());
			}
		}
		WizardStep::Pricing => {
			match draft.expected_price {
				None => errors.push("expected_price is required".to_string()),
				Some(price) if !(price > 0.0) => errors.push("expected_price must be greater than zero".to_string()),
				Some(_) => {}
			}
			let images = draft.images.iter().filter(|i| !i.trim().is_empty()).count();
			if images == 0 {
				errors.push("at least one photo is required".to_string());
			} else if images > MAX_IMAGES {
				errors.push(format!("at most {MAX_IMAGES} photos are allowed"));
			}
		}
		WizardStep::Contact => {
			check_required(&draft.seller_name, "seller_name", &mut errors);
			check_email(&draft.seller_email, "seller_email", &mut errors);
			check_phone(&draft.seller_phone, "seller_phone", &mut errors);
			check_required(&draft.location.city, "location.city", &mut errors);
			check_required(&draft.location.state, "location.state", &mut errors);
		}
	}
	errors
}

pub fn validate_all(draft: &SubmissionDraft) -> Vec<String> {
	WizardStep::ALL.iter().flat_map(|step| validate_step(*step, draft)).collect()
}

fn parse_choice<T>(value: &str) -> AppResult<T>
where
	T: FromStr<Err = ParseEnumError>,
{
	value.parse().map_err(|e: ParseEnumError| AppError::Validation(vec![e.to_string()]))
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl SubmissionDraft {
	pub fn finish(self) -> AppResult<NewSubmission> {
		let errors = validate_all(&self);
		if !errors.is_empty() {
			return Err(AppError::Validation(errors));
		}

		Ok(NewSubmission {
			vehicle_type: parse_choice(&self.vehicle_type)?,
			brand: self.brand.trim().to_string(),
			model: self.model.trim().to_string(),
			variant: non_blank(self.variant),
			year: self.year.unwrap_or_default(),
			km_driven: self.km_driven.unwrap_or_default(),
			fuel_type: parse_choice(&self.fuel_type)?,
			transmission: parse_choice(&self.transmission)?,
			ownership: self.ownership.unwrap_or(1),
			registration_number: normalize_registration(&self.registration_number),
			expected_price: self.expected_price.unwrap_or_default(),
			images: self.images.into_iter().filter(|i| !i.trim().is_empty()).collect(),
			description: non_blank(self.description),
			seller_name: self.seller_name.trim().to_string(),
			seller_email: self.seller_email.trim().to_lowercase(),
			seller_phone: self.seller_phone.trim().to_string(),
			location: Location {
				city: self.location.city.trim().to_string(),
				state: self.location.state.trim().to_string(),
			},
		})
	}
}
