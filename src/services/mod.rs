pub mod enrichment;
pub mod geo;
pub mod pricing;
pub mod providers;
pub mod ranking;
pub mod recommendations;
pub mod retry;

pub use recommendations::Recommender;
