//! Cryptographic building blocks needed in `protocols`.

pub mod curve;
pub mod mask;
pub mod ot;
pub mod rng;
