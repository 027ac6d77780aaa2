//! Result type alias for mdsync

use super::errors::MdError;

/// Result type alias for mdsync operations
///
/// # Examples
///
/// ```
/// use mdsync::domain::result::Result;
/// use mdsync::domain::errors::MdError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(MdError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, MdError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::MdError;

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(MdError::Validation("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
