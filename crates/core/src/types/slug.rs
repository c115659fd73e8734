//! URL slugs for products, categories and combos.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug cannot be empty")]
    Empty,
    #[error("slug must be at most {max} characters")]
    TooLong { max: usize },
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidCharacters,
}

/// A URL-safe identifier such as `zomerjurk-linnen`.
///
/// ```
/// use jouwwinkel_core::Slug;
///
/// assert_eq!(Slug::from_title("Crème Brûlée & Co!").unwrap().as_str(), "creme-brulee-co");
/// assert!(Slug::parse("Bad Slug").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub const MAX_LENGTH: usize = 96;

    /// Validate an already-slugified string.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError`] for empty, over-long or malformed input.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let chars_ok = s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !chars_ok || s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Build a slug from free text, folding common accents and collapsing
    /// everything else into single hyphens.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] when nothing slug-worthy remains.
    pub fn from_title(title: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(title.len());
        let mut pending_hyphen = false;

        let mut buf = [0; 4];
        for c in title.chars().flat_map(char::to_lowercase) {
            let folded: &str = match fold_accent(c) {
                Some(ascii) => ascii,
                None => c.encode_utf8(&mut buf),
            };
            if folded.bytes().all(|b| b.is_ascii_alphanumeric()) {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.push_str(folded);
            } else {
                pending_hyphen = true;
            }
            if out.len() >= Self::MAX_LENGTH {
                break;
            }
        }

        out.truncate(Self::MAX_LENGTH);
        let trimmed = out.trim_end_matches('-');
        Self::parse(trimmed)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// ASCII spelling of a lowercase letter outside ASCII.
fn fold_accent(c: char) -> Option<&'static str> {
    let ascii = match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ą' => "a",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' => "i",
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' | 'ő' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ç' | 'ć' | 'č' => "c",
        'ñ' | 'ń' | 'ň' => "n",
        'ÿ' | 'ý' => "y",
        'ś' | 'š' | 'ş' => "s",
        'ź' | 'ż' | 'ž' => "z",
        'ð' | 'đ' | 'ď' => "d",
        'ğ' => "g",
        'ł' | 'ľ' => "l",
        'ř' => "r",
        'ť' => "t",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ĳ' => "ij",
        'þ' => "th",
        _ => return None,
    };
    Some(ascii)
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_title() {
        assert_eq!(Slug::from_title("Zomer Jurk").unwrap().as_str(), "zomer-jurk");
        assert_eq!(
            Slug::from_title("  T-shirt -- 100% katoen ").unwrap().as_str(),
            "t-shirt-100-katoen"
        );
        assert_eq!(Slug::from_title("Café Noël").unwrap().as_str(), "cafe-noel");
        assert_eq!(Slug::from_title("Straße").unwrap().as_str(), "strasse");
        assert_eq!(Slug::from_title("Œuvre Ærø").unwrap().as_str(), "oeuvre-aero");
        assert_eq!(Slug::from_title("Łódź").unwrap().as_str(), "lodz");
        assert_eq!(Slug::from_title("!!!"), Err(SlugError::Empty));
    }

    #[test]
    fn test_from_title_truncates() {
        let slug = Slug::from_title(&"ab ".repeat(80)).unwrap();
        assert!(slug.as_str().len() <= Slug::MAX_LENGTH);
        assert!(!slug.as_str().ends_with('-'));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Slug::parse("ok-slug-2").is_ok());
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("Upper"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("-lead"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("double--dash"), Err(SlugError::InvalidCharacters));
    }
}
