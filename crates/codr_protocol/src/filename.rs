//! Filename validation shared by the gateway (job creation) and the
//! executor (writing the source file into the job workdir).

/// `^[A-Za-z0-9_.-]+$`, no `..`, no leading `/`, at most 255 bytes.
pub fn validate_filename(filename: &str) -> Result<(), String> {
    if filename.is_empty() {
        return Err("filename must not be empty".to_string());
    }
    if filename.len() > 255 {
        return Err("filename exceeds 255 bytes".to_string());
    }
    if filename.starts_with('/') {
        return Err("filename must not be an absolute path".to_string());
    }
    if filename.contains("..") {
        return Err("filename must not contain '..'".to_string());
    }
    if !filename
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        return Err("filename contains characters outside [A-Za-z0-9_.-]".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_name() {
        assert!(validate_filename("main.py").is_ok());
    }

    #[test]
    fn rejects_parent_traversal() {
        assert!(validate_filename("../etc/passwd").is_err());
    }

    #[test]
    fn rejects_leading_slash() {
        assert!(validate_filename("/etc/passwd").is_err());
    }

    #[test]
    fn rejects_over_255_bytes() {
        let name = "a".repeat(256);
        assert!(validate_filename(&name).is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(validate_filename("main.py; rm -rf /").is_err());
    }
}
