pub mod config;
pub mod dataset;
pub mod fetch;
pub mod load;
pub mod normalize;
pub mod reports;
