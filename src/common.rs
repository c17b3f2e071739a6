use chrono::{Datelike, Utc};
use postgres_from_row::FromRow;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} '{value}', expected one of: {expected}")]
pub struct ParseEnumError {
	pub kind: &'static str,
	pub value: String,
	pub expected: String,
}

/// Declares an enum stored as lowercase text, both in JSON and in postgres.
macro_rules! text_enum {
	($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
		pub enum $name {
			$(#[serde(rename = $text)] $variant),+
		}

		impl $name {
			pub fn as_str(&self) -> &'static str {
				match self {
					$($name::$variant => $text),+
				}
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(self.as_str())
			}
		}

		impl std::str::FromStr for $name {
			type Err = $crate::common::ParseEnumError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				match s.trim().to_ascii_lowercase().as_str() {
					$($text => Ok($name::$variant),)+
					_ => Err($crate::common::ParseEnumError {
						kind: $kind,
						value: s.to_string(),
						expected: [$($text),+].join(", "),
					}),
				}
			}
		}

		impl<'a> tokio_postgres::types::FromSql<'a> for $name {
			fn from_sql(
				ty: &tokio_postgres::types::Type,
				raw: &'a [u8],
			) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
				let text = <&str as tokio_postgres::types::FromSql>::from_sql(ty, raw)?;
				Ok(text.parse()?)
			}

			fn accepts(ty: &tokio_postgres::types::Type) -> bool {
				<&str as tokio_postgres::types::FromSql>::accepts(ty)
			}
		}

		impl tokio_postgres::types::ToSql for $name {
			fn to_sql(
				&self,
				ty: &tokio_postgres::types::Type,
				out: &mut bytes::BytesMut,
			) -> Result<tokio_postgres::types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
				<&str as tokio_postgres::types::ToSql>::to_sql(&self.as_str(), ty, out)
			}

			fn accepts(ty: &tokio_postgres::types::Type) -> bool {
				<&str as tokio_postgres::types::ToSql>::accepts(ty)
			}

			tokio_postgres::types::to_sql_checked!();
		}
	};
}

pub(crate) use text_enum;

text_enum!(VehicleType, "vehicle type" {
	Bike => "bike",
	Car => "car",
});

text_enum!(FuelType, "fuel type" {
	Petrol => "petrol",
	Diesel => "diesel",
	Electric => "electric",
	Cng => "cng",
	Hybrid => "hybrid",
});

text_enum!(Transmission, "transmission" {
	Manual => "manual",
	Automatic => "automatic",
});

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize, FromRow)]
#[serde(default)]
pub struct Location {
	pub city: String,
	pub state: String,
}

/// Checks shared by every form that describes a vehicle.
pub fn check_year(year: i32, errors: &mut Vec<String>) {
	let latest = Utc::now().year() + 1;
	if !(1980..=latest).contains(&year) {
		errors.push(format!("year must be between 1980 and {latest}"));
	}
}

pub fn check_required(value: &str, field: &str, errors: &mut Vec<String>) {
	if value.trim().is_empty() {
		errors.push(format!("{field} is required"));
	}
}

pub fn normalize_registration(raw: &str) -> String {
	raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>().to_uppercase()
}

pub fn round_money(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}
