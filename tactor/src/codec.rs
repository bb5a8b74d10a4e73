use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::CodecError;

/// Turns states and events into the opaque form handed to storage, and back.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, CodecError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Compact binary encoding, the same format used on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postcard;

// Implementations

impl Codec for Postcard {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, CodecError> {
        postcard::to_stdvec(value)
            .map(Bytes::from)
            .map_err(CodecError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        postcard::from_bytes(bytes).map_err(CodecError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Account {
        owner: String,
        balance: i64,
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = Postcard.decode::<Account>(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_decode_wrong_shape_fails() {
        let bytes = Postcard.encode(&true).unwrap();
        assert!(Postcard.decode::<Account>(&bytes).is_err());
    }

    #[test]
    fn test_value_survives() {
        let account = Account {
            owner: "ada".into(),
            balance: -12,
        };
        let bytes = Postcard.encode(&account).unwrap();
        assert_eq!(Postcard.decode::<Account>(&bytes).unwrap(), account);
    }
}
