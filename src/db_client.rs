use std::{ops::Deref, sync::Arc};

use log::error;
use tokio_postgres::{types::ToSql, Client, NoTls};

use crate::config::Config;

#[derive(Clone)]
pub struct DbClient(pub Arc<Client>);

impl Deref for DbClient {
	type Target = Client;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

pub async fn db_client(config: &Config) -> Result<DbClient, tokio_postgres::Error> {
	let (client, monitor) = tokio_postgres::connect(&config.database_url(), NoTls).await?;

	tokio::spawn(async move {
		if let Err(e) = monitor.await {
			error!("Connection error: {}", e);
		}
	});

	Ok(DbClient(Arc::new(client)))
}

pub type Param = Box<dyn ToSql + Sync + Send>;

/// WHERE-clause builder. Each pushed clause uses `{}` where its single bound
/// value goes; the builder numbers the placeholders.
#[derive(Default)]
pub struct SqlFilter {
	clauses: Vec<String>,
	params: Vec<Param>,
}

impl SqlFilter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push<T>(&mut self, template: &str, value: T) -> &mut Self
	where
		T: ToSql + Sync + Send + 'static,
	{
		self.params.push(Box::new(value));
		let placeholder = format!("${}", self.params.len());
		self.clauses.push(template.replace("{}", &placeholder));
		self
	}

	pub fn push_raw(&mut self, clause: &str) -> &mut Self {
		self.clauses.push(clause.to_string());
		self
	}

	pub fn is_empty(&self) -> bool {
		self.clauses.is_empty()
	}

	pub fn where_clause(&self) -> String {
		if self.clauses.is_empty() {
			return String::new();
		}
		format!(" WHERE {}", self.clauses.join(" AND "))
	}

	pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
		self.params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect()
	}
}

/// LIMIT/OFFSET for a 1-based page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
	pub page: u32,
	pub limit: u32,
}

impl Page {
	pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
		Self {
			page: page.unwrap_or(1).max(1),
			limit: limit.unwrap_or(default_limit).clamp(1, max_limit),
		}
	}

	pub fn offset(&self) -> i64 {
		(self.page as i64 - 1) * self.limit as i64
	}

	pub fn sql(&self) -> String {
		format!(" LIMIT {} OFFSET {}", self.limit, self.offset())
	}

	pub fn pages(&self, total: i64) -> i64 {
		(total + self.limit as i64 - 1) / self.limit as i64
	}

	pub fn summary(&self, total: i64) -> serde_json::Value {
		serde_json::json!({
			"page": self.page,
			"limit": self.limit,
			"total": total,
			"pages": self.pages(total),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn placeholders_are_numbered_in_order() {
		let mut filter = SqlFilter::new();
		filter.push("vehicle_type = {}", "car".to_string()).push_raw("featured").push("price <= {}", 500000.0f64);
		assert_eq!(filter.where_clause(), " WHERE vehicle_type = $1 AND featured AND price <= $2");
		assert_eq!(filter.params().len(), 2);
	}

	#[test]
	fn repeated_placeholder_binds_one_value() {
		let mut filter = SqlFilter::new();
		filter.push("(brand ILIKE {} OR model ILIKE {})", "%swift%".to_string());
		assert_eq!(filter.where_clause(), " WHERE (brand ILIKE $1 OR model ILIKE $1)");
		assert_eq!(filter.params().len(), 1);
	}

	#[test]
	fn empty_filter_has_no_where() {
		assert!(SqlFilter::new().where_clause().is_empty());
	}

	#[test]
	fn page_clamps_and_counts() {
		let page = Page::new(Some(0), Some(500), 12, 50);
		assert_eq!(page, Page { page: 1, limit: 50 });

		let page = Page::new(Some(3), None, 12, 50);
		assert_eq!(page.offset(), 24);
		assert_eq!(page.sql(), " LIMIT 12 OFFSET 24");
		assert_eq!(page.pages(25), 3);
		assert_eq!(page.pages(24), 2);
		assert_eq!(page.pages(0), 0);
		assert_eq!(page.summary(25)["pages"], 3);
	}
}
