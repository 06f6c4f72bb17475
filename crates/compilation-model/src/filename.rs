//! Filename helpers.

const FORBIDDEN: &[char] = &['/', '*', '?', ':', '"', '<', '>', '|'];
const MAX_LEN: usize = 200;

/// Make `name` safe to use as a file name.
///
/// Drops `/ * ? : " < > |`, turns spaces into underscores and keeps at most
/// 200 characters.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaces_and_forbidden_chars() {
        assert_eq!(sanitize_filename("normal_filename.mp4"), "normal_filename.mp4");
        assert_eq!(
            sanitize_filename("filename with spaces.mp4"),
            "filename_with_spaces.mp4"
        );
        assert_eq!(sanitize_filename("file/with/slashes.mp4"), "filewithslashes.mp4");
        assert_eq!(
            sanitize_filename("file*with?invalid<chars>:\"|pipe.mp4"),
            "filewithinvalidcharspipe.mp4"
        );
    }

    #[test]
    fn test_truncates_by_characters() {
        let long = "é".repeat(300);
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized.chars().count(), 200);
    }
}
