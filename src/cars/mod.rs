pub mod cars;
pub mod filters;
pub mod search;
pub mod sold;
