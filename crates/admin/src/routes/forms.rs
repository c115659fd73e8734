//! Small helpers shared by the edit forms.

use jouwwinkel_core::validation::ValidationErrors;

use crate::db::RepositoryError;
use crate::error::AppError;

const MAX_URL_LENGTH: usize = 500;

/// First letter upper-cased, for repository messages shown in forms.
#[must_use]
pub fn capitalise(message: &str) -> String {
    let mut chars = message.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// An optional image: an uploaded `/media/...` path or an absolute URL.
pub fn image_url(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<String> {
    let url = errors.optional_text(field, raw, MAX_URL_LENGTH)?;
    let accepted = url.starts_with("/media/")
        || url::Url::parse(&url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
    if !accepted {
        errors.add(field, "Upload an image or enter a full https:// address");
    }
    Some(url)
}

/// Turn a unique-constraint refusal into an error on `field`.
///
/// # Errors
///
/// Anything other than a conflict is passed on.
pub fn conflict_on(field: &str, err: RepositoryError) -> Result<ValidationErrors, AppError> {
    let mut errors = ValidationErrors::new();
    match err {
        RepositoryError::Conflict(message) => errors.add(field, capitalise(&message)),
        other => return Err(other.into()),
    }
    Ok(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalise() {
        assert_eq!(capitalise("this SKU is taken"), "This SKU is taken");
        assert_eq!(capitalise(""), "");
    }

    #[test]
    fn test_image_url() {
        let mut errors = ValidationErrors::new();
        assert_eq!(image_url(&mut errors, "image_url", "  "), None);
        assert_eq!(
            image_url(&mut errors, "image_url", "/media/a.png").as_deref(),
            Some("/media/a.png")
        );
        assert!(image_url(&mut errors, "image_url", "https://cdn.example.com/x.jpg").is_some());
        assert!(errors.is_empty());

        image_url(&mut errors, "image_url", "javascript:alert(1)");
        assert!(errors.get("image_url").is_some());
    }
}
