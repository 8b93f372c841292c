//! Quote and transaction types shared across adapters and the HTTP surface.

pub mod quotes;

pub use quotes::{Approval, CurveQuote, RouteStep, SwapQuote, TxRequest};

/// Serialises `U256` as a decimal string so JSON consumers never lose precision.
pub mod u256_dec {
    use ethers::types::U256;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub mod option {
        use ethers::types::U256;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_str(&v.to_string()),
                None => serializer.serialize_none(),
            }
        }
    }
}
