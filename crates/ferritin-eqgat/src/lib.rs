//! ferritin-eqgat
//!
//! Equivariant building blocks for graph networks over molecules. Nodes carry
//! invariant scalar features `[N, S]` and equivariant vector features
//! `[N, 3, V]`; graphs in a batch are concatenated along the node axis and
//! identified by a per-node batch index.
//!
//! ```no_run
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use ferritin_eqgat::{GatedEquivBlock, GatedEquivConfig, GraphBatch, LayerNorm, LayerNormConfig, NodeFeatures};
//!
//! # fn main() -> candle_core::Result<()> {
//! let dev = Device::Cpu;
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
//!
//! let norm = LayerNorm::load(vb.pp("norm"), &LayerNormConfig::new(32, Some(8)))?;
//! let block = GatedEquivBlock::load(vb.pp("block"), &GatedEquivConfig::new((32, 8), (32, Some(8))))?;
//!
//! let s = Tensor::randn(0f32, 1., (10, 32), &dev)?;
//! let v = Tensor::randn(0f32, 1., (10, 3, 8), &dev)?;
//! let batch = GraphBatch::new(&Tensor::new(&[0u32, 0, 0, 0, 1, 1, 1, 1, 1, 1], &dev)?)?;
//!
//! let x = norm.forward(&NodeFeatures::new(s, v), &batch)?;
//! let x = block.forward_features(&x)?;
//! # Ok(())
//! # }
//! ```
pub mod batch;
pub mod configs;
pub mod layers;

pub use batch::{GraphBatch, NodeFeatures};
pub use configs::{GatedEquivConfig, LayerNormConfig, SE3NormConfig};
pub use layers::dense::{DenseConfig, DenseLayer, WeightInit};
pub use layers::gated::GatedEquivBlock;
pub use layers::layernorm::{AdaptiveLayerNorm, LayerNorm};
pub use layers::se3norm::SE3Norm;
