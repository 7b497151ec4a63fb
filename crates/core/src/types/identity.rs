//! Session identity types.
//!
//! An [`Identity`] scopes which persisted cart and wishlist a session binds
//! to. It is either a signed-in user, keyed by the auth provider's stable
//! user id, or anonymous browsing.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`UserKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UserKeyError {
    /// The input is empty or whitespace.
    #[error("user key cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("user key must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains control characters.
    #[error("user key cannot contain control characters")]
    ControlCharacter,
}

/// Stable, opaque key for a signed-in user (the auth provider's user id).
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length: 1-128 characters after trimming
/// - No control characters
///
/// ## Examples
///
/// ```
/// use furnish_flow_core::UserKey;
///
/// assert_eq!(UserKey::parse("  uid-123 ").unwrap().as_str(), "uid-123");
/// assert!(UserKey::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserKey(String);

impl UserKey {
    /// Maximum length of a user key.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `UserKey` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains control characters.
    pub fn parse(s: &str) -> Result<Self, UserKeyError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(UserKeyError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(UserKeyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(UserKeyError::ControlCharacter);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserKey {
    type Err = UserKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserKey {
    type Error = UserKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserKey> for String {
    fn from(key: UserKey) -> Self {
        key.0
    }
}

/// The identity a session is currently browsing under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user", rename_all = "snake_case")]
pub enum Identity {
    /// No signed-in user.
    #[default]
    Anonymous,
    /// A signed-in user.
    User(UserKey),
}

impl Identity {
    /// Returns the user key, if signed in.
    #[must_use]
    pub const fn user(&self) -> Option<&UserKey> {
        match self {
            Self::Anonymous => None,
            Self::User(key) => Some(key),
        }
    }

    /// Returns `true` for anonymous browsing.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl From<UserKey> for Identity {
    fn from(key: UserKey) -> Self {
        Self::User(key)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::User(key) => write!(f, "user {key}"),
        }
    }
}
