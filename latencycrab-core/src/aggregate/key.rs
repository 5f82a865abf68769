use crate::error::KeySelectionError;
use crate::types::StreamKey;

/// Derives the aggregation key from an input record.
///
/// Any `Fn(&IN) -> Result<K, KeySelectionError>` closure is a selector.
pub trait KeySelector<IN>: Send {
    type Key: StreamKey;

    fn get_key(&self, value: &IN) -> Result<Self::Key, KeySelectionError>;
}

impl<IN, K, F> KeySelector<IN> for F
where
    F: Fn(&IN) -> Result<K, KeySelectionError> + Send,
    K: StreamKey,
{
    type Key = K;

    fn get_key(&self, value: &IN) -> Result<K, KeySelectionError> {
        self(value)
    }
}

/// Uses the record itself as its key.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityKey;

impl<T: StreamKey> KeySelector<T> for IdentityKey {
    type Key = T;

    fn get_key(&self, value: &T) -> Result<T, KeySelectionError> {
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key() {
        assert_eq!(IdentityKey.get_key(&42i32).unwrap(), 42);
    }

    #[test]
    fn test_closure_selector() {
        let selector = |line: &String| {
            line.split(',')
                .next()
                .and_then(|field| field.trim().parse::<i32>().ok())
                .ok_or_else(|| KeySelectionError::new(format!("no key in {line:?}")))
        };

        assert_eq!(selector.get_key(&"7, click".to_string()).unwrap(), 7);
        let err = selector.get_key(&"oops".to_string()).unwrap_err();
        assert_eq!(err.reason, "no key in \"oops\"");
    }
}
