pub mod book;
pub mod preference;
pub mod rating;
pub mod recommendation;
pub mod user;

pub use book::{Book, BookDetail, BookPage, BookSummary, BookUpdate, NewBook};
pub use preference::{Preference, PreferenceKind, UserPreferences};
pub use rating::{Rating, RatingRequest};
pub use recommendation::{Recommendation, RecommendationResponse, RecommendationSource};
pub use user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Session, User};

use serde::{Deserialize, Serialize};

// ============================================================================
// Shared response types
// ============================================================================

/// Plain acknowledgement body, e.g. `{"message": "Rating saved successfully"}`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
