use chrono::NaiveDate;

use crate::{
	common::round_money,
	error::{AppError, AppResult},
};

pub const DAYS_PER_MONTH: i64 = 30;
pub const DAYS_PER_WEEK: i64 = 7;
pub const MAX_RENTAL_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Rates {
	pub daily: f64,
	pub weekly: Option<f64>,
	pub monthly: Option<f64>,
}

impl Rates {
	pub fn validate(&self, errors: &mut Vec<String>) {
		if !(self.daily > 0.0) {
			errors.push("daily_rate must be greater than zero".to_string());
		}
		if matches!(self.weekly, Some(rate) if !(rate > 0.0)) {
			errors.push("weekly_rate must be greater than zero".to_string());
		}
		if matches!(self.monthly, Some(rate) if !(rate > 0.0)) {
			errors.push("monthly_rate must be greater than zero".to_string());
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PriceBreakdown {
	pub days: i64,
	pub months: i64,
	pub weeks: i64,
	pub extra_days: i64,
	pub monthly_cost: f64,
	pub weekly_cost: f64,
	pub daily_cost: f64,
	pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Quote {
	pub start_date: NaiveDate,
	pub end_date: NaiveDate,
	#[serde(flatten)]
	pub breakdown: PriceBreakdown,
	pub security_deposit: f64,
	pub total_due: f64,
}

/// Billable days between two dates. A same-day rental is one day.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> AppResult<i64> {
	if end < start {
		return Err(AppError::BadRequest("end_date must not be before start_date".to_string()));
	}
	let days = (end - start).num_days().max(1);
	if days > MAX_RENTAL_DAYS {
		return Err(AppError::BadRequest(format!("rentals are limited to {MAX_RENTAL_DAYS} days")));
	}
	Ok(days)
}

/// Greedy split into months, then weeks, then days. A bucket without a rate
/// folds into the next smaller one.
pub fn calculate(rates: &Rates, days: i64) -> PriceBreakdown {
	let months = match rates.monthly {
		Some(_) => days / DAYS_PER_MONTH,
		None => 0,
	};
	let rest = days - months * DAYS_PER_MONTH;
	let weeks = match rates.weekly {
		Some(_) => rest / DAYS_PER_WEEK,
		None => 0,
	};
	let extra_days = rest - weeks * DAYS_PER_WEEK;

	let monthly_cost = round_money(months as f64 * rates.monthly.unwrap_or(0.0));
	let weekly_cost = round_money(weeks as f64 * rates.weekly.unwrap_or(0.0));
	let daily_cost = round_money(extra_days as f64 * rates.daily);

	PriceBreakdown {
		days,
		months,
		weeks,
		extra_days,
		monthly_cost,
		weekly_cost,
		daily_cost,
		subtotal: round_money(monthly_cost + weekly_cost + daily_cost),
	}
}

pub fn quote(rates: &Rates, security_deposit: f64, start_date: NaiveDate, end_date: NaiveDate) -> AppResult<Quote> {
	let breakdown = calculate(rates, rental_days(start_date, end_date)?);
	let total_due = round_money(breakdown.subtotal + security_deposit);
	Ok(Quote {
		start_date,
		end_date,
		breakdown,
		security_deposit,
		total_due,
	})
}
