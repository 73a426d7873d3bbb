pub mod data;
pub mod sales;
