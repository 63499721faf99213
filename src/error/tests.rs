//! Tests for error types.

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("debounce cannot be 0");
        assert_eq!(err.to_string(), "configuration error: debounce cannot be 0");
    }

    #[test]
    fn test_watcher_error_conversion() {
        let watch_err = WatcherError::WatchFailed {
            path: "/tmp/test".to_string(),
            reason: "permission denied".to_string(),
        };
        let err: Error = watch_err.into();
        assert!(matches!(err, Error::Watcher(_)));
        assert!(err.to_string().contains("/tmp/test"));
    }

    #[test]
    fn test_scan_error_conversion() {
        let scan_err = ScanError::SpawnFailed {
            thread: "scan worker".to_string(),
            reason: "resource temporarily unavailable".to_string(),
        };
        let err: Error = scan_err.into();
        assert!(matches!(err, Error::Scan(_)));
        assert_eq!(
            err.to_string(),
            "scan error: failed to spawn scan worker thread: resource temporarily unavailable"
        );
    }

    #[test]
    fn test_not_a_directory_display() {
        let err = ScanError::NotADirectory("/etc/hosts".to_string());
        assert_eq!(err.to_string(), "not a directory: '/etc/hosts'");
    }

    #[test]
    fn test_pattern_error_conversion() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: Error = regex_err.into();
        assert!(matches!(err, Error::Pattern(_)));
        assert!(err.to_string().starts_with("invalid pattern"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(Error::config("test error"))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::config("something went wrong");
        let debug_str = format!("{err:?}");
        assert!(debug_str.contains("Config"));
        assert!(debug_str.contains("something went wrong"));
    }
}
