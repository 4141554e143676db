//! Storage key construction and validation.

use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

pub const GENERATED_PREFIX: &str = "generated";
pub const TEMPLATES_PREFIX: &str = "templates";

fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

/// `generated/<uuid>.png`
pub fn generated_poster_key() -> String {
    format!("{}/{}.png", GENERATED_PREFIX, Uuid::new_v4())
}

/// `templates/<id>_<6 hex>.png`
pub fn template_upload_key(template_id: &str) -> String {
    format!("{}/{}_{}.png", TEMPLATES_PREFIX, template_id, short_hex())
}

/// `templates/<id>_gen_<6 hex>.png`
pub fn template_background_key(template_id: &str) -> String {
    format!("{}/{}_gen_{}.png", TEMPLATES_PREFIX, template_id, short_hex())
}

/// Reject keys that could escape the upload root or address a directory.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("empty key"));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::invalid_key(key));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        let generated = generated_poster_key();
        assert!(generated.starts_with("generated/"));
        assert!(generated.ends_with(".png"));
        assert_eq!(generated.len(), "generated/".len() + 36 + ".png".len());

        let upload = template_upload_key("matrix");
        assert!(upload.starts_with("templates/matrix_"));
        assert_eq!(upload.len(), "templates/matrix_".len() + 6 + ".png".len());

        let background = template_background_key("matrix");
        assert!(background.starts_with("templates/matrix_gen_"));
        assert!(validate_key(&background).is_ok());
    }

    #[test]
    fn test_validate_rejects_traversal() {
        for bad in ["", "/etc/passwd", "../x.png", "a//b.png", "a/./b.png", "a/", "a\\b"] {
            assert!(validate_key(bad).is_err(), "{} should be rejected", bad);
        }
        assert!(validate_key("generated/abc.png").is_ok());
    }
}
