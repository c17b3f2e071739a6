use super::cars::VehicleStatus;
use crate::{
	common::{FuelType, Transmission, VehicleType},
	db_client::{Page, SqlFilter},
	error::{AppError, AppResult},
};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 50;

/// Query string of the listing pages.
#[derive(Debug, Default, serde::Deserialize)]
pub struct VehicleQuery {
	#[serde(rename = "type")]
	pub vehicle_type: Option<String>,
	pub brand: Option<String>,
	pub fuel: Option<String>,
	pub transmission: Option<String>,
	pub city: Option<String>,
	pub min_price: Option<f64>,
	pub max_price: Option<f64>,
	pub min_year: Option<i32>,
	pub max_year: Option<i32>,
	pub max_km: Option<i32>,
	pub status: Option<String>,
	pub featured: Option<bool>,
	pub q: Option<String>,
	pub sort: Option<String>,
	pub page: Option<u32>,
	pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
	#[default]
	Newest,
	Oldest,
	PriceAsc,
	PriceDesc,
	KmAsc,
	YearDesc,
}

impl SortOrder {
	pub fn from_param(param: Option<&str>) -> AppResult<Self> {
		Ok(match param {
			None | Some("newest") => SortOrder::Newest,
			Some("oldest") => SortOrder::Oldest,
			Some("price_asc") => SortOrder::PriceAsc,
			Some("price_desc") => SortOrder::PriceDesc,
			Some("km_asc") => SortOrder::KmAsc,
			Some("year_desc") => SortOrder::YearDesc,
			Some(other) => return Err(AppError::BadRequest(format!("unknown sort '{other}'"))),
		})
	}

	pub fn sql(&self) -> &'static str {
		match self {
			SortOrder::Newest => "created_at DESC, id",
			SortOrder::Oldest => "created_at ASC, id",
			SortOrder::PriceAsc => "price ASC, id",
			SortOrder::PriceDesc => "price DESC, id",
			SortOrder::KmAsc => "km_driven ASC, id",
			SortOrder::YearDesc => "year DESC, created_at DESC, id",
		}
	}
}

pub struct VehicleListing {
	pub filter: SqlFilter,
	pub order: SortOrder,
	pub page: Page,
}

fn param(value: &Option<String>) -> Option<&str> {
	value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse<T>(value: &Option<String>) -> AppResult<Option<T>>
where
	T: std::str::FromStr<Err = crate::common::ParseEnumError>,
{
	param(value).map(|v| v.parse::<T>().map_err(|e| AppError::BadRequest(e.to_string()))).transpose()
}

impl VehicleQuery {
	/// `default_status` applies when the query names no status; `status=all`
	/// lifts the status filter entirely.
	pub fn build(&self, default_status: Option<VehicleStatus>) -> AppResult<VehicleListing> {
		if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
			if min > max {
				return Err(AppError::BadRequest("min_price is greater than max_price".to_string()));
			}
		}
		if let (Some(min), Some(max)) = (self.min_year, self.max_year) {
			if min > max {
				return Err(AppError::BadRequest("min_year is greater than max_year".to_string()));
			}
		}

		let mut filter = SqlFilter::new();

		let status = match param(&self.status) {
			Some("all") => None,
			Some(_) => parse::<VehicleStatus>(&self.status)?,
			None => default_status,
		};
		if let Some(status) = status {
			filter.push("status = {}", status);
		}
		if let Some(vehicle_type) = parse::<VehicleType>(&self.vehicle_type)? {
			filter.push("vehicle_type = {}", vehicle_type);
		}
		if let Some(fuel) = parse::<FuelType>(&self.fuel)? {
			filter.push("fuel_type = {}", fuel);
		}
		if let Some(transmission) = parse::<Transmission>(&self.transmission)? {
			filter.push("transmission = {}", transmission);
		}
		if let Some(brand) = param(&self.brand) {
			filter.push("lower(brand) = lower({})", brand.to_string());
		}
		if let Some(city) = param(&self.city) {
			filter.push("lower(city) = lower({})", city.to_string());
		}
		if let Some(min) = self.min_price {
			filter.push("price >= {}", min);
		}
		if let Some(max) = self.max_price {
			filter.push("price <= {}", max);
		}
		if let Some(min) = self.min_year {
			filter.push("year >= {}", min);
		}
		if let Some(max) = self.max_year {
			filter.push("year <= {}", max);
		}
		if let Some(max) = self.max_km {
			filter.push("km_driven <= {}", max);
		}
		if let Some(featured) = self.featured {
			filter.push("featured = {}", featured);
		}
		if let Some(q) = param(&self.q) {
			let pattern = format!("%{}%", q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
			filter.push("(brand ILIKE {} OR model ILIKE {} OR variant ILIKE {})", pattern);
		}

		Ok(VehicleListing {
			filter,
			order: SortOrder::from_param(param(&self.sort))?,
			page: Page::new(self.page, self.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE),
		})
	}
}
