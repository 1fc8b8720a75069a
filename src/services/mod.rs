pub mod download;
pub mod extract;
pub mod merge;
pub mod record;
pub mod transcribe;
pub mod translate;

/// Last meaningful line of a child process's stderr, for error messages.
pub(crate) fn last_stderr_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "process reported no error output".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_stderr_line() {
        assert_eq!(last_stderr_line(b"a\nsecond error\n\n"), "second error");
        assert_eq!(
            last_stderr_line(b""),
            "process reported no error output"
        );
    }
}
