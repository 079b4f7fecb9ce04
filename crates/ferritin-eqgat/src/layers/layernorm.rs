//! Layer norms whose statistics are pooled over every node of a graph.
//!
//! Scalars are centered and divided by the per-graph mean squared deviation
//! (the variance itself, not its square root). Vectors are only rescaled by the
//! per-graph mean squared norm, centering them would break equivariance.
use super::dense::{DenseConfig, DenseLayer};
use crate::batch::{GraphBatch, NodeFeatures};
use crate::configs::LayerNormConfig;
use candle_core::{bail, Module, Result, Tensor, D};
use candle_nn::{init::Init, VarBuilder};
use tracing::debug;

fn normalize_scalar(s: &Tensor, batch: &GraphBatch, eps: f64) -> Result<Tensor> {
    let smean = batch.scatter_mean(&s.mean_keepdim(D::Minus1)?)?;
    let s = s.broadcast_sub(&batch.gather(&smean)?)?;

    let var = batch.scatter_mean(&s.sqr()?.mean_keepdim(D::Minus1)?)?;
    let var = var.maximum(eps)?;
    s.broadcast_div(&batch.gather(&var)?)
}

fn normalize_vector(v: &Tensor, batch: &GraphBatch, eps: f64) -> Result<Tensor> {
    // [n, 3, c] -> [n, 1, 1]
    let vmean = v.sqr()?.sum_keepdim(1)?.mean_keepdim(D::Minus1)?;
    let vmean = batch.scatter_mean(&vmean)?.maximum(eps)?;
    v.broadcast_div(&batch.gather(&vmean)?)
}

#[derive(Clone, Debug)]
pub struct LayerNorm {
    sdim: usize,
    vdim: Option<usize>,
    eps: f64,
    weight: Option<Tensor>,
    bias: Option<Tensor>,
}

impl LayerNorm {
    pub fn load(vb: VarBuilder, config: &LayerNormConfig) -> Result<Self> {
        let (weight, bias) = if config.affine {
            let weight = vb.get_with_hints(config.sdim, "weight", Init::Const(1.0))?;
            let bias = vb.get_with_hints(config.sdim, "bias", Init::Const(0.0))?;
            (Some(weight), Some(bias))
        } else {
            (None, None)
        };
        Ok(Self {
            sdim: config.sdim,
            vdim: config.vdim,
            eps: config.eps,
            weight,
            bias,
        })
    }

    pub fn dims(&self) -> (usize, Option<usize>) {
        (self.sdim, self.vdim)
    }

    pub fn affine(&self) -> bool {
        self.weight.is_some()
    }

    pub fn forward(&self, x: &NodeFeatures, batch: &GraphBatch) -> Result<NodeFeatures> {
        let mut sout = normalize_scalar(&x.scalar, batch, self.eps)?;
        if let (Some(weight), Some(bias)) = (&self.weight, &self.bias) {
            sout = sout.broadcast_mul(weight)?.broadcast_add(bias)?;
        }

        let vout = match &x.vector {
            Some(v) => Some(normalize_vector(v, batch, self.eps)?),
            None => None,
        };

        Ok(NodeFeatures {
            scalar: sout,
            vector: vout,
        })
    }
}

/// Layer norm whose affine scale and shift are predicted from a context vector.
///
/// `Dense(latent_dim -> 2 * sdim)` maps the context to a `(scale, shift)` pair
/// and the normalized scalars become `s * scale + shift`. A freshly created
/// projection has its bias set to ones for the scale half and zeros for the
/// shift half, so it starts out with unit scale and zero shift. Parameters that
/// already exist in the builder (a loaded checkpoint) are used as they are.
pub struct AdaptiveLayerNorm {
    sdim: usize,
    vdim: Option<usize>,
    latent_dim: usize,
    eps: f64,
    weight_bias: DenseLayer,
}

impl AdaptiveLayerNorm {
    pub fn load(vb: VarBuilder, config: &LayerNormConfig, latent_dim: usize) -> Result<Self> {
        if !config.affine {
            bail!("AdaptiveLayerNorm requires affine = true, the context only enters through the affine transform")
        }
        debug!(sdim = config.sdim, latent_dim, "AdaptiveLayerNorm");
        let vb = vb.pp("weight_bias");
        let fresh = !vb.contains_tensor("bias");
        let weight_bias = DenseLayer::load(vb.clone(), DenseConfig::new(latent_dim, 2 * config.sdim))?;
        if fresh {
            if let Some(bias) = weight_bias.bias() {
                // writes through to the freshly created variable
                let ones = Tensor::ones(config.sdim, bias.dtype(), bias.device())?;
                bias.slice_set(&ones, 0, 0)?;
            }
        }
        Ok(Self {
            sdim: config.sdim,
            vdim: config.vdim,
            latent_dim,
            eps: config.eps,
            weight_bias,
        })
    }

    pub fn dims(&self) -> (usize, Option<usize>) {
        (self.sdim, self.vdim)
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    /// `context` is either per graph (`[num_graphs, latent_dim]`) or per node
    /// (`[num_nodes, latent_dim]`).
    pub fn forward(
        &self,
        x: &NodeFeatures,
        context: &Tensor,
        batch: &GraphBatch,
    ) -> Result<NodeFeatures> {
        let sout = normalize_scalar(&x.scalar, batch, self.eps)?;

        let chunks = self.weight_bias.forward(context)?.chunk(2, D::Minus1)?;
        let (weight, bias) = (&chunks[0], &chunks[1]);
        let rows = context.dim(0)?;
        let (weight, bias) = if rows == batch.num_graphs() {
            (batch.gather(weight)?, batch.gather(bias)?)
        } else if rows == batch.num_nodes() {
            (weight.clone(), bias.clone())
        } else {
            bail!(
                "context must have {} (graphs) or {} (nodes) rows, got {rows}",
                batch.num_graphs(),
                batch.num_nodes()
            )
        };
        let sout = ((sout * weight)? + bias)?;

        let vout = match &x.vector {
            Some(v) => Some(normalize_vector(v, batch, self.eps)?),
            None => None,
        };

        Ok(NodeFeatures {
            scalar: sout,
            vector: vout,
        })
    }
}
