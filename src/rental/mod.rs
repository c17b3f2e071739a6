pub mod pricing;
pub mod rental;
