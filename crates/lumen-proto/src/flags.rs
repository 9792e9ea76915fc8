//! Flag sets used on the wire.
//!
//! - [`TransactFlags`]: transport envelope flags (one-way delivery)
//! - [`TransactionFlags`]: `setTransactionState` apply semantics
//! - [`LayerChange`]: which fields of a `LayerState` are meaningful
//! - [`DisplayChange`]: which fields of a `DisplayState` are meaningful

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Transport envelope flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TransactFlags: u32 {
        /// Caller does not wait for a reply body
        const ONE_WAY = 0x0000_0001;
    }
}

bitflags! {
    /// Apply semantics for a `setTransactionState` batch
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TransactionFlags: u32 {
        /// Block until the batch is applied to the next frame
        const SYNCHRONOUS = 0x0000_0001;
        /// Batch is part of an animation
        const ANIMATION = 0x0000_0002;
    }
}

bitflags! {
    /// Fields changed by a `LayerState`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct LayerChange: u32 {
        /// `x`, `y`
        const POSITION = 0x0000_0001;
        /// `z`
        const LAYER = 0x0000_0002;
        /// `w`, `h`
        const SIZE = 0x0000_0004;
        /// `alpha`
        const ALPHA = 0x0000_0008;
        /// `matrix`
        const MATRIX = 0x0000_0010;
        /// `transparent_region`
        const TRANSPARENT_REGION = 0x0000_0020;
        /// `flags` under `mask`
        const VISIBILITY = 0x0000_0040;
        /// `layer_stack`
        const LAYER_STACK = 0x0000_0080;
        /// `crop`
        const CROP = 0x0000_0100;
    }
}

bitflags! {
    /// Fields changed by a `DisplayState`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DisplayChange: u32 {
        /// `surface`
        const SURFACE = 0x0000_0001;
        /// `layer_stack`
        const LAYER_STACK = 0x0000_0002;
        /// `orientation`, `viewport`, `frame`
        const PROJECTION = 0x0000_0004;
    }
}

macro_rules! raw_bits {
    ($($ty:ty),*) => {$(
        impl $ty {
            /// Create flags from a raw wire value, keeping unknown bits
            #[must_use]
            pub const fn from_raw(raw: u32) -> Self {
                Self::from_bits_retain(raw)
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::empty()
            }
        }
    )*};
}

raw_bits!(TransactFlags, TransactionFlags, LayerChange, DisplayChange);
