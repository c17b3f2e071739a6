pub mod purchase;
pub mod submissions;
pub mod wizard;
