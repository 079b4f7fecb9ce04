pub mod dense;
pub mod gated;
pub mod layernorm;
pub mod se3norm;
