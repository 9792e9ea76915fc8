//! Method codes for surface-composer transactions.
//!
//! A method code selects which operation a transaction invokes. Codes are
//! dense, assigned once, and never renumbered: the proxy writes them and the
//! stub switches on them, so both sides embed this single table.
//!
//! # Code Ranges
//!
//! - `0-12`: Surface-composer operations (this interface)
//! - `0x5F00_0000-0x5FFF_FFFF`: Base transactions understood by every stub
//!   (ping, interface introspection)

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Base transaction: liveness check (`'_PNG'`)
pub const PING_TRANSACTION: u32 = u32::from_be_bytes(*b"_PNG");

/// Base transaction: return the interface descriptor (`'_NTF'`)
pub const INTERFACE_TRANSACTION: u32 = u32::from_be_bytes(*b"_NTF");

/// Surface-composer operation codes
///
/// # Representation
///
/// Codes travel as `u32` in the transaction envelope. The `#[repr(u32)]`
/// keeps the numeric values stable for wire compatibility.
///
/// # Security
///
/// - **Unknown Codes**: [`MethodCode::from_u32`] returns `None` for values
///   outside the table. The stub routes those to its base handler, which
///   answers `UNKNOWN_TRANSACTION` instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum MethodCode {
    /// Open a client connection context
    CreateConnection = 0,
    /// Obtain the graphic buffer allocator
    CreateGraphicBufferAllocator = 1,
    /// Obtain the shared control block heap
    GetControlBlock = 2,
    /// Submit a batch of layer and display state changes
    SetTransactionState = 3,
    /// Client-side boot setup is complete
    BootFinished = 4,
    /// Snapshot composited content into a shared heap
    CaptureScreen = 5,
    /// Check that a texture was issued by this service
    AuthenticateSurfaceTexture = 6,
    /// Open a vsync/hotplug event stream
    CreateDisplayEventConnection = 7,
    /// Create a virtual display
    CreateDisplay = 8,
    /// Look up a built-in display by id
    GetBuiltInDisplay = 9,
    /// Power a display down
    Blank = 10,
    /// Power a display up
    Unblank = 11,
    /// Fetch the fixed display descriptor block
    GetDisplayInfo = 12,
}

impl MethodCode {
    /// Every code in the table, in numeric order
    pub const ALL: [Self; 13] = [
        Self::CreateConnection,
        Self::CreateGraphicBufferAllocator,
        Self::GetControlBlock,
        Self::SetTransactionState,
        Self::BootFinished,
        Self::CaptureScreen,
        Self::AuthenticateSurfaceTexture,
        Self::CreateDisplayEventConnection,
        Self::CreateDisplay,
        Self::GetBuiltInDisplay,
        Self::Blank,
        Self::Unblank,
        Self::GetDisplayInfo,
    ];

    /// Convert to raw u32 value
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    /// Convert from raw u32 value
    ///
    /// Returns `None` if the value is not in the table. This function is
    /// total: every `u32` maps to either a known code or `None`.
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::CreateConnection),
            1 => Some(Self::CreateGraphicBufferAllocator),
            2 => Some(Self::GetControlBlock),
            3 => Some(Self::SetTransactionState),
            4 => Some(Self::BootFinished),
            5 => Some(Self::CaptureScreen),
            6 => Some(Self::AuthenticateSurfaceTexture),
            7 => Some(Self::CreateDisplayEventConnection),
            8 => Some(Self::CreateDisplay),
            9 => Some(Self::GetBuiltInDisplay),
            10 => Some(Self::Blank),
            11 => Some(Self::Unblank),
            12 => Some(Self::GetDisplayInfo),
            _ => None,
        }
    }

    /// Operation name as used in logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateConnection => "createConnection",
            Self::CreateGraphicBufferAllocator => "createGraphicBufferAllocator",
            Self::GetControlBlock => "getControlBlock",
            Self::SetTransactionState => "setTransactionState",
            Self::BootFinished => "bootFinished",
            Self::CaptureScreen => "captureScreen",
            Self::AuthenticateSurfaceTexture => "authenticateSurfaceTexture",
            Self::CreateDisplayEventConnection => "createDisplayEventConnection",
            Self::CreateDisplay => "createDisplay",
            Self::GetBuiltInDisplay => "getBuiltInDisplay",
            Self::Blank => "blank",
            Self::Unblank => "unblank",
            Self::GetDisplayInfo => "getDisplayInfo",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for code in MethodCode::ALL {
            assert_eq!(MethodCode::from_u32(code.to_u32()), Some(code));
        }
    }

    #[test]
    fn codes_are_dense_and_stable() {
        for (index, code) in MethodCode::ALL.iter().enumerate() {
            assert_eq!(code.to_u32() as usize, index);
        }
        assert_eq!(MethodCode::GetDisplayInfo.to_u32(), 12);
    }

    #[test]
    fn unknown_codes() {
        assert_eq!(MethodCode::from_u32(13), None);
        assert_eq!(MethodCode::from_u32(u32::MAX), None);
        assert_eq!(MethodCode::from_u32(PING_TRANSACTION), None);
        assert_eq!(MethodCode::from_u32(INTERFACE_TRANSACTION), None);
    }

    #[test]
    fn base_transaction_codes() {
        assert_eq!(PING_TRANSACTION, 0x5F50_4E47);
        assert_eq!(INTERFACE_TRANSACTION, 0x5F4E_5446);
    }

    #[test]
    fn code_serializes_as_bare_integer() {
        let mut cbor = Vec::new();
        ciborium::ser::into_writer(&MethodCode::CaptureScreen, &mut cbor).unwrap();
        // CBOR unsigned integer 5 is a single byte
        assert_eq!(cbor, vec![0x05]);
    }
}
