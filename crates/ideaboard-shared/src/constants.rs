/// Maximum length of a topic or idea name, in characters.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of a topic or idea description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Maximum length of a single tag name, in characters.
pub const MAX_TAG_LEN: usize = 50;

/// Maximum length of feedback notes, in characters.
pub const MAX_NOTES_LEN: usize = 500;

/// Lowest accepted feedback rating.
pub const MIN_RATING: i64 = 1;

/// Highest accepted feedback rating.
pub const MAX_RATING: i64 = 5;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";
