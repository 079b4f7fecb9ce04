use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SE3NormConfig {
    pub eps: f64,
}

impl Default for SE3NormConfig {
    fn default() -> Self {
        Self { eps: 1e-5 }
    }
}

/// Gated equivariant block.
///
/// `in_dims` is `(scalar, vector)`, `out_dims` is `(scalar, vector)` where a
/// missing output vector width means the block only produces scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatedEquivConfig {
    pub in_dims: (usize, usize),
    pub out_dims: (usize, Option<usize>),
    /// width of the vector channels reduced to invariants; defaults to `max(vi, vo)`
    pub hv_dim: Option<usize>,
    pub norm_eps: f64,
    pub use_mlp: bool,
}

impl GatedEquivConfig {
    pub fn new(in_dims: (usize, usize), out_dims: (usize, Option<usize>)) -> Self {
        Self {
            in_dims,
            out_dims,
            hv_dim: None,
            norm_eps: 1e-6,
            use_mlp: false,
        }
    }

    pub fn with_mlp(mut self) -> Self {
        self.use_mlp = true;
        self
    }

    pub fn so(&self) -> usize {
        self.out_dims.0
    }

    pub fn vo(&self) -> usize {
        self.out_dims.1.unwrap_or(0)
    }

    pub fn hv(&self) -> usize {
        self.hv_dim.unwrap_or(self.in_dims.1.max(self.vo()))
    }
}

/// Graph-batched layer norm over `(scalar, vector)` features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerNormConfig {
    pub sdim: usize,
    pub vdim: Option<usize>,
    pub eps: f64,
    pub affine: bool,
}

impl LayerNormConfig {
    pub fn new(sdim: usize, vdim: Option<usize>) -> Self {
        Self {
            sdim,
            vdim,
            eps: 1e-6,
            affine: true,
        }
    }
}
