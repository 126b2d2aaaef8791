//! Destination filename sanitizing.

/// Extension every saved image carries.
pub const IMAGE_EXTENSION: &str = ".jpg";

/// Replaces every character outside `[A-Za-z0-9_.\- ]` with `_` and
/// appends `.jpg` unless the name already ends with it (case-insensitive).
///
/// Path separators are replaced too, so the result always names a file
/// directly inside the save folder.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let mut safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if !safe.to_ascii_lowercase().ends_with(IMAGE_EXTENSION) {
        safe.push_str(IMAGE_EXTENSION);
    }

    safe
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_extension() {
        assert_eq!(sanitize_filename("img1"), "img1.jpg");
        assert_eq!(sanitize_filename("photo.png"), "photo.png.jpg");
    }

    #[test]
    fn keeps_existing_extension_in_any_case() {
        assert_eq!(sanitize_filename("img1.jpg"), "img1.jpg");
        assert_eq!(sanitize_filename("IMG1.JPG"), "IMG1.JPG");
    }

    #[test]
    fn replaces_disallowed_characters() {
        assert_eq!(
            sanitize_filename("site A: shot #3 (final)"),
            "site A_ shot _3 _final_.jpg"
        );
        assert_eq!(sanitize_filename("café"), "caf_.jpg");
    }

    #[test]
    fn neutralises_path_separators() {
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd.jpg");
        assert_eq!(sanitize_filename(r"dir\file"), "dir_file.jpg");
    }
}
