//! Interface token authentication.
//!
//! Every request starts with the descriptor of the interface it was written
//! for. The receiver compares it byte for byte with its own descriptor before
//! decoding anything else. A mismatch means the caller was built against a
//! different (or no) version of the interface.

use crate::{Parcel, ParcelReader, ProtocolError, Result};

/// Descriptor of the surface-composer interface
pub const SURFACE_COMPOSER_DESCRIPTOR: &str = "android.ui.ISurfaceComposer";

impl Parcel {
    /// Write an interface token. Must be the first field of a request.
    pub fn write_interface_token(&mut self, descriptor: &str) -> Result<()> {
        self.write_string(descriptor)
    }
}

impl ParcelReader<'_> {
    /// Read the interface token and check it against `expected`.
    ///
    /// A token that cannot be read at all is treated as a mismatch with an
    /// empty descriptor.
    ///
    /// # Errors
    ///
    /// `ProtocolError::InterfaceMismatch` unless the token equals `expected`.
    pub fn enforce_interface(&mut self, expected: &str) -> Result<()> {
        let actual = self.read_string().unwrap_or_default();
        if actual != expected {
            return Err(ProtocolError::InterfaceMismatch { expected: expected.to_owned(), actual });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_token_accepted() {
        let mut parcel = Parcel::new();
        parcel.write_interface_token(SURFACE_COMPOSER_DESCRIPTOR).unwrap();
        parcel.write_i32(5).unwrap();

        let mut reader = parcel.reader();
        reader.enforce_interface(SURFACE_COMPOSER_DESCRIPTOR).unwrap();
        assert_eq!(reader.read_i32(), Ok(5));
    }

    #[test]
    fn token_comparison_is_exact() {
        let mut parcel = Parcel::new();
        parcel.write_interface_token("android.ui.ISurfaceComposer2").unwrap();
        assert_eq!(
            parcel.reader().enforce_interface(SURFACE_COMPOSER_DESCRIPTOR),
            Err(ProtocolError::InterfaceMismatch {
                expected: SURFACE_COMPOSER_DESCRIPTOR.to_string(),
                actual: "android.ui.ISurfaceComposer2".to_string(),
            })
        );
    }

    #[test]
    fn missing_token_is_mismatch() {
        let parcel = Parcel::new();
        let err = parcel.reader().enforce_interface(SURFACE_COMPOSER_DESCRIPTOR).unwrap_err();
        assert!(matches!(err, ProtocolError::InterfaceMismatch { ref actual, .. } if actual.is_empty()));
    }
}
