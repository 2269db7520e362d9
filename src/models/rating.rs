use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// A user's score for a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /ratings`
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub book_id: Option<i64>,
    pub score: Option<serde_json::Value>,
}

impl RatingRequest {
    /// Returns `(book_id, score)` once both are present and the score is an
    /// integer in range. Numeric strings are accepted as scores.
    pub fn validated(&self) -> AppResult<(i64, i64)> {
        let (Some(book_id), Some(raw_score)) = (self.book_id, self.score.as_ref()) else {
            return Err(AppError::InvalidInput(
                "Missing book_id or score".to_string(),
            ));
        };

        let score = match raw_score {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        match score {
            Some(score) if (MIN_SCORE..=MAX_SCORE).contains(&score) => Ok((book_id, score)),
            _ => Err(AppError::InvalidInput(
                "Score must be integer between 1-5".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> RatingRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_valid_scores() {
        assert_eq!(
            request(json!({"book_id": 3, "score": 5})).validated().unwrap(),
            (3, 5)
        );
        assert_eq!(
            request(json!({"book_id": 3, "score": "4"})).validated().unwrap(),
            (3, 4)
        );
    }

    #[test]
    fn test_missing_fields() {
        let err = request(json!({"score": 5})).validated().unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Missing book_id or score");
    }

    #[test]
    fn test_out_of_range_and_fractional_scores() {
        for score in [json!(0), json!(6), json!(2.5), json!("five"), json!(null)] {
            let result = request(json!({"book_id": 1, "score": score})).validated();
            assert!(result.is_err());
        }
    }
}
