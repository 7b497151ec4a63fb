//! Catalog products and categories.
//!
//! Field names and shapes follow the storefront's product API, which reports
//! prices as JSON numbers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CategoryId, Price, ProductId, Review, ReviewDraft, ReviewError, ReviewId};

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    /// Category slug, e.g. `sofas`.
    #[serde(default)]
    pub category: String,
    /// Free-form specification table (material, dimensions, ...).
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Product {
    /// The image used for cart lines and wishlist entries (the first image).
    #[must_use]
    pub fn image_ref(&self) -> &str {
        self.images.first().map_or("", String::as_str)
    }

    /// Unit price in the storefront currency.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }

    /// Case-insensitive search over name, description, and category.
    ///
    /// A blank query matches nothing.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        [&self.name, &self.description, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Mean review rating.
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        super::average_rating(&self.reviews)
    }

    /// Validate and prepend a shopper's review, returning its new id.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] if the draft is incomplete.
    pub fn add_review(
        &mut self,
        draft: ReviewDraft,
        author: Option<&str>,
        date: NaiveDate,
    ) -> Result<ReviewId, ReviewError> {
        let next_id = self
            .reviews
            .iter()
            .map(|r| r.id.as_i32())
            .max()
            .map_or(1, |max| max.saturating_add(1));
        let review = draft.publish(ReviewId::new(next_id), author, date)?;
        let id = review.id;
        self.reviews.insert(0, review);
        Ok(id)
    }
}

/// A browsable product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn sofa() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Modern Velvet Sofa".to_owned(),
            description: "A plush velvet sofa".to_owned(),
            price: Decimal::new(89_999, 2),
            images: vec!["a.jpg".to_owned(), "b.jpg".to_owned()],
            category: "sofas".to_owned(),
            specs: BTreeMap::new(),
            stock: 15,
            reviews: Vec::new(),
        }
    }

    #[test]
    fn test_image_ref_uses_first_image() {
        assert_eq!(sofa().image_ref(), "a.jpg");
        let mut bare = sofa();
        bare.images.clear();
        assert_eq!(bare.image_ref(), "");
    }

    #[test]
    fn test_matches() {
        let p = sofa();
        assert!(p.matches("VELVET"));
        assert!(p.matches("  sofas "));
        assert!(!p.matches("table"));
        assert!(!p.matches("   "));
    }

    #[test]
    fn test_deserialize_api_shape() {
        let json = r#"{
            "_id": "65f0c0ffee",
            "id": 2,
            "name": "Eames Lounge Chair",
            "description": "Iconic",
            "price": 1250,
            "images": ["chair.jpg"],
            "category": "chairs",
            "specs": {"Material": "Leather"},
            "stock": 8,
            "reviews": []
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(2));
        assert_eq!(product.price, Decimal::from(1250));
        assert_eq!(product.specs["Material"], "Leather");
        assert_eq!(product.unit_price().display(), "$1,250.00");
    }

    #[test]
    fn test_add_review_prepends_with_next_id() {
        let mut p = sofa();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let first = ReviewDraft {
            rating: 4,
            comment: "Good".to_owned(),
        };
        p.add_review(first, Some("Ann"), date).unwrap();
        let second = ReviewDraft {
            rating: 2,
            comment: "Meh".to_owned(),
        };
        let added = p.add_review(second, None, date).unwrap();
        assert_eq!(added, ReviewId::new(2));
        assert_eq!(p.reviews[0].comment, "Meh");
        assert_eq!(p.reviews.len(), 2);
        assert!((p.average_rating().unwrap() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_add_review_rejects_invalid_draft() {
        let mut p = sofa();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let err = p.add_review(ReviewDraft::default(), None, date);
        assert_eq!(err, Err(ReviewError::MissingRating));
        assert!(p.reviews.is_empty());
    }
}
