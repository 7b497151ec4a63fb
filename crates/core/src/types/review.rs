//! Product reviews.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ReviewId;

/// Errors that can occur when submitting a review.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// No star rating was selected.
    #[error("please select a rating")]
    MissingRating,
    /// Rating outside 1-5.
    #[error("rating must be between 1 and 5 (got {0})")]
    RatingOutOfRange(u8),
    /// Comment is blank.
    #[error("please write a review")]
    EmptyComment,
}

/// A published product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    /// Star rating, 1-5.
    pub rating: u8,
    pub comment: String,
    pub author: String,
    pub date: NaiveDate,
}

/// A review as typed by a shopper, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDraft {
    /// Selected star rating; 0 means nothing was selected.
    pub rating: u8,
    pub comment: String,
}

impl ReviewDraft {
    /// Author shown when the reviewer has no display name.
    pub const ANONYMOUS_AUTHOR: &'static str = "Anonymous";

    /// Validate the draft and turn it into a review.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] if no rating was selected, the rating is out
    /// of range, or the comment is blank.
    pub fn publish(
        self,
        id: ReviewId,
        author: Option<&str>,
        date: NaiveDate,
    ) -> Result<Review, ReviewError> {
        match self.rating {
            0 => return Err(ReviewError::MissingRating),
            1..=5 => {}
            other => return Err(ReviewError::RatingOutOfRange(other)),
        }

        let comment = self.comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::EmptyComment);
        }

        let author = author
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(Self::ANONYMOUS_AUTHOR);

        Ok(Review {
            id,
            rating: self.rating,
            comment: comment.to_owned(),
            author: author.to_owned(),
            date,
        })
    }
}

/// Mean star rating, or `None` when there are no reviews.
#[must_use]
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    #[allow(clippy::cast_precision_loss)] // Review counts never approach f64 precision limits
    let count = reviews.len() as f64;
    Some(f64::from(total) / count)
}
