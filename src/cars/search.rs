use std::collections::BTreeSet;

use axum::{
	extract::State,
	Json,
};
use serde_json::{json, Value};

use crate::{
	db_client::DbClient,
	error::{success, AppResult},
	extract::AppQuery,
};

const MAX_SUGGESTIONS: usize = 10;
const MAX_DISTANCE: usize = 2;

#[derive(serde::Deserialize)]
pub struct SearchParams {
	#[serde(default)]
	q: String,
}

/// Candidates within edit distance 2 of the keyword, or containing it.
pub fn suggest<'a, I>(keyword: &str, candidates: I) -> Vec<String>
where
	I: IntoIterator<Item = &'a str>,
{
	let keyword = keyword.trim().to_lowercase();
	if keyword.is_empty() {
		return Vec::new();
	}

	let mut result = BTreeSet::new();
	for candidate in candidates {
		let lowered = candidate.to_lowercase();
		if lowered.contains(&keyword) || levenshtein::levenshtein(&lowered, &keyword) <= MAX_DISTANCE {
			result.insert(candidate.to_string());
		}
	}
	result.into_iter().take(MAX_SUGGESTIONS).collect()
}

pub async fn search(db: State<DbClient>, params: AppQuery<SearchParams>) -> AppResult<Json<Value>> {
	let rows = db.query("SELECT DISTINCT brand, model FROM vehicles WHERE status = 'available'", &[]).await?;

	let mut candidates = Vec::with_capacity(rows.len() * 3);
	for row in &rows {
		let brand: String = row.get("brand");
		let model: String = row.get("model");
		candidates.push(format!("{brand} {model}"));
		candidates.push(brand);
		candidates.push(model);
	}

	let result = suggest(&params.q, candidates.iter().map(String::as_str));
	Ok(success(json!({ "result": result })))
}

/// Values the storefront filter panel offers.
pub async fn filter_options(db: State<DbClient>) -> AppResult<Json<Value>> {
	let row = db
		.query_one(
			"SELECT
				COALESCE(array_agg(DISTINCT brand ORDER BY brand), '{}') AS brands,
				COALESCE(array_agg(DISTINCT city ORDER BY city), '{}') AS cities,
				MIN(price) AS min_price,
				MAX(price) AS max_price,
				MIN(year) AS min_year,
				MAX(year) AS max_year
			FROM vehicles WHERE status = 'available'",
			&[],
		)
		.await?;

	Ok(success(json!({
		"brands": row.get::<_, Vec<String>>("brands"),
		"cities": row.get::<_, Vec<String>>("cities"),
		"price": { "min": row.get::<_, Option<f64>>("min_price"), "max": row.get::<_, Option<f64>>("max_price") },
		"year": { "min": row.get::<_, Option<i32>>("min_year"), "max": row.get::<_, Option<i32>>("max_year") },
	})))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tolerates_typos() {
		let found = suggest("hondaa", ["Honda", "Hyundai", "Honda City"]);
		assert_eq!(found, vec!["Honda".to_string()]);
	}

	#[test]
	fn matches_substrings_case_insensitively() {
		let found = suggest("city", ["Honda City", "City", "Creta"]);
		assert_eq!(found, vec!["City".to_string(), "Honda City".to_string()]);
	}

	#[test]
	fn deduplicates_and_caps_results() {
		let names: Vec<String> = (0..30).map(|i| format!("Model {i}")).collect();
		let mut candidates: Vec<&str> = names.iter().map(String::as_str).collect();
		candidates.push("Model 1");
		let found = suggest("model", candidates);
		assert_eq!(found.len(), MAX_SUGGESTIONS);
		assert_eq!(found[0], "Model 0");
	}

	#[test]
	fn blank_keyword_finds_nothing() {
		assert!(suggest("  ", ["Pulsar"]).is_empty());
	}
}
