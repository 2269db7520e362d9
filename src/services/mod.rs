pub mod accounts;
pub mod books;
pub mod preferences;
pub mod ratings;
pub mod recommendations;
pub mod similarity;

pub use recommendations::{RecommendationData, RecommendationSettings, SqliteRecommendationData};
