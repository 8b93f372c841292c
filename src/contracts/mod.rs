// Contracts Module - read/encode ABIs only, nothing here signs or sends

pub mod curve;
pub mod erc20;

pub use curve::{ICurveCryptoPool, ICurveFactory, ICurveRouterNg, ICurveStablePool};
pub use erc20::Erc20;
