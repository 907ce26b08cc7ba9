pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns `InvalidArgument` from the enclosing function unless the condition
/// holds. The argument name and the condition text become the error message.
///
/// ```
/// use rankdb_common::{ErrorKind, Result, verify_arg};
///
/// fn page(limit: usize) -> Result<usize> {
///     verify_arg!(limit, limit <= 1000);
///     Ok(limit)
/// }
///
/// assert!(page(10).is_ok());
/// assert!(matches!(page(5000).unwrap_err().kind(), ErrorKind::InvalidArgument { .. }));
/// ```
#[macro_export]
macro_rules! verify_arg {
    ($name:ident, $cond:expr) => {{
        let holds = $cond;
        $crate::result::check_arg(holds, stringify!($name), stringify!($cond))?;
    }};
}

/// Returns `InvalidFormat` from the enclosing function unless the condition
/// holds. Used when validating data read back from storage.
#[macro_export]
macro_rules! verify_data {
    ($element:ident, $cond:expr) => {{
        let holds = $cond;
        $crate::result::check_data(holds, stringify!($element), stringify!($cond))?;
    }};
}

#[inline]
pub fn check_arg(holds: bool, name: &str, condition: &str) -> Result<()> {
    if holds { Ok(()) } else { Err(violated_arg(name, condition)) }
}

#[inline]
pub fn check_data(holds: bool, element: &str, condition: &str) -> Result<()> {
    if holds { Ok(()) } else { Err(violated_data(element, condition)) }
}

#[cold]
fn violated_arg(name: &str, condition: &str) -> crate::Error {
    crate::Error::invalid_arg(name, format!("requires {condition}"))
}

#[cold]
fn violated_data(element: &str, condition: &str) -> crate::Error {
    crate::Error::corrupted(element.replace('_', " "), format!("expected {condition}"))
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_count(count: u64) -> crate::Result<u64> {
        verify_data!(bucket_header, count > 0);
        Ok(count)
    }

    #[test]
    fn test_verify_data() {
        assert!(check_count(1).is_ok());
        let err = check_count(0).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidFormat { element, message } => {
                assert_eq!(element, "bucket header");
                assert_eq!(message, "expected count > 0");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
