// ⭐ Review Entity - customer ratings and free-text comments

use serde::{Deserialize, Serialize};

/// Row of order_reviews.csv
///
/// Score and comment are optional in the export: many reviews are a bare
/// rating, and some rows carry a comment with no usable score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub order_id: String,
    pub review_score: Option<f64>,
    pub review_comment_message: Option<String>,
}

impl Review {
    /// Comment text, if the cell was filled
    ///
    /// A whitespace-only comment still counts as a comment; it scores
    /// neutral.
    pub fn comment(&self) -> Option<&str> {
        self.review_comment_message
            .as_deref()
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(comment: Option<&str>) -> Review {
        Review {
            order_id: "o1".to_string(),
            review_score: Some(5.0),
            review_comment_message: comment.map(str::to_string),
        }
    }

    #[test]
    fn test_whitespace_comment_is_kept() {
        assert_eq!(review(Some("   ")).comment(), Some("   "));
    }

    #[test]
    fn test_empty_comment_is_none() {
        assert_eq!(review(Some("")).comment(), None);
        assert_eq!(review(None).comment(), None);
    }
}
