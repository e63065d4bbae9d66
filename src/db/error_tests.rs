//! Unit tests for database error types

#[cfg(test)]
mod tests {
    use crate::db::error::DbError;
    use std::error::Error;

    #[test]
    fn test_not_found_error() {
        let error = DbError::NotFound("container 12".to_string());
        assert_eq!(error.to_string(), "Not found: container 12");
    }

    #[test]
    fn test_serialize_error() {
        let error = DbError::SerializeError("short key".to_string());
        assert_eq!(error.to_string(), "Error during serialization: short key");
    }

    #[test]
    fn test_validation_error_display() {
        let error = DbError::ValidationError("title is empty".to_string());
        let display = format!("{}", error);
        assert!(display.contains("Validation failed"));
        assert!(display.contains("title is empty"));
    }

    #[test]
    fn test_is_validation() {
        assert!(DbError::ValidationError("x".into()).is_validation());
        assert!(!DbError::NotFound("x".into()).is_validation());
        assert!(!DbError::InvalidInput("x".into()).is_validation());
    }

    #[test]
    fn test_error_debug() {
        let error = DbError::SerializeError("test error".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("SerializeError"));
        assert!(debug.contains("test error"));
    }

    #[test]
    fn test_error_source() {
        let error = DbError::NotFound("item 3".to_string());
        assert!(error.source().is_none());
    }

    #[test]
    fn test_decode_error_conversion() {
        let bad: &[u8] = &[0xff, 0xff, 0xff];
        let result: Result<(String, usize), _> =
            bincode::serde::decode_from_slice(bad, bincode::config::standard());
        let error: DbError = result.unwrap_err().into();
        assert!(matches!(error, DbError::DecodeError(_)));
        assert!(error.to_string().starts_with("Error while decoding data"));
    }
}
