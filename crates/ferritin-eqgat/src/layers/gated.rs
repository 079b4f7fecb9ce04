use super::dense::{DenseConfig, DenseLayer};
use crate::batch::NodeFeatures;
use crate::configs::GatedEquivConfig;
use candle_core::{bail, Module, Result, Tensor, D};
use candle_nn::{Activation, VarBuilder};
use tracing::debug;

enum ScalarPath {
    Linear(DenseLayer),
    Mlp(DenseLayer, DenseLayer),
}

impl Module for ScalarPath {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match self {
            ScalarPath::Linear(ws) => ws.forward(xs),
            ScalarPath::Mlp(ws0, ws1) => ws1.forward(&ws0.forward(xs)?),
        }
    }
}

/// Gated equivariant block mixing scalar and vector node features.
///
/// The vector channels are combined linearly (`Wv0`, no bias) and split into a
/// hidden part and an output part. Squared norms of the hidden part are rotation
/// invariant and join the scalar input to compute, through `Ws`, the scalar
/// output and one gate per output vector channel. Scaling equivariant vectors by
/// invariant gates keeps them equivariant.
pub struct GatedEquivBlock {
    si: usize,
    vi: usize,
    so: usize,
    vo: usize,
    hv_dim: usize,
    norm_eps: f64,
    wv0: DenseLayer,
    ws: ScalarPath,
    wv1: Option<DenseLayer>,
}

impl GatedEquivBlock {
    pub fn load(vb: VarBuilder, config: &GatedEquivConfig) -> Result<Self> {
        let (si, vi) = config.in_dims;
        let so = config.so();
        let vo = config.vo();
        let hv_dim = config.hv();
        debug!(si, vi, so, vo, hv_dim, use_mlp = config.use_mlp, "GatedEquivBlock");

        let wv0 = DenseLayer::load(vb.pp("Wv0"), DenseConfig::new(vi, hv_dim + vo).no_bias())?;

        let (ws, wv1) = if config.use_mlp {
            // the hidden layer keeps the scalar input width
            let ws0 = DenseLayer::load(
                vb.pp("Ws").pp(0),
                DenseConfig::new(hv_dim + si, si).with_activation(Activation::Silu),
            )?;
            let ws1 = DenseLayer::load(vb.pp("Ws").pp(1), DenseConfig::new(si, vo + so))?;
            let wv1 = if vo > 0 {
                Some(DenseLayer::load(
                    vb.pp("Wv1"),
                    DenseConfig::new(vo, vo).no_bias(),
                )?)
            } else {
                None
            };
            (ScalarPath::Mlp(ws0, ws1), wv1)
        } else {
            let ws = DenseLayer::load(vb.pp("Ws"), DenseConfig::new(hv_dim + si, vo + so))?;
            (ScalarPath::Linear(ws), None)
        };

        Ok(Self {
            si,
            vi,
            so,
            vo,
            hv_dim,
            norm_eps: config.norm_eps,
            wv0,
            ws,
            wv1,
        })
    }

    pub fn in_dims(&self) -> (usize, usize) {
        (self.si, self.vi)
    }

    pub fn out_dims(&self) -> (usize, usize) {
        (self.so, self.vo)
    }

    /// * `s`: `[num_nodes, si]`
    /// * `v`: `[num_nodes, 3, vi]`
    ///
    /// Returns `[num_nodes, so]` scalars and, when the block has output vector
    /// channels, `[num_nodes, 3, vo]` vectors.
    pub fn forward(&self, s: &Tensor, v: &Tensor) -> Result<NodeFeatures> {
        let vv = self.wv0.forward(v)?;

        let (vdot, v) = if self.vo > 0 {
            let vdot = vv.narrow(D::Minus1, 0, self.hv_dim)?;
            let v = vv.narrow(D::Minus1, self.hv_dim, self.vo)?;
            (vdot, Some(v))
        } else {
            (vv, None)
        };

        // invariant proxy: squared norm of each hidden vector channel
        let vdot = vdot.sqr()?.sum(1)?.maximum(self.norm_eps)?;

        let s = Tensor::cat(&[s, &vdot], D::Minus1)?;
        let s = self.ws.forward(&s)?;

        match v {
            Some(v) => {
                let gate = s.narrow(D::Minus1, 0, self.vo)?;
                let s = s.narrow(D::Minus1, self.vo, self.so)?;
                let v = gate.unsqueeze(1)?.broadcast_mul(&v)?;
                let v = match &self.wv1 {
                    Some(wv1) => wv1.forward(&v)?,
                    None => v,
                };
                Ok(NodeFeatures::new(s, v))
            }
            None => Ok(NodeFeatures::scalar_only(s)),
        }
    }

    /// Same as [`GatedEquivBlock::forward`] on a feature bundle.
    pub fn forward_features(&self, x: &NodeFeatures) -> Result<NodeFeatures> {
        match &x.vector {
            Some(v) => self.forward(&x.scalar, v),
            None => bail!("GatedEquivBlock requires vector features"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_output_shapes() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let block = GatedEquivBlock::load(vb, &GatedEquivConfig::new((10, 4), (6, Some(5))))?;

        let s = Tensor::randn(0f32, 1., (7, 10), &dev)?;
        let v = Tensor::randn(0f32, 1., (7, 3, 4), &dev)?;
        let out = block.forward(&s, &v)?;
        assert_eq!(out.scalar.dims(), &[7, 6]);
        assert_eq!(out.vector.expect("vector output").dims(), &[7, 3, 5]);
        Ok(())
    }

    #[test]
    fn test_scalar_only_output() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let config = GatedEquivConfig::new((10, 4), (3, None)).with_mlp();
        let block = GatedEquivBlock::load(vb, &config)?;
        assert_eq!(block.out_dims(), (3, 0));

        let s = Tensor::randn(0f32, 1., (5, 10), &dev)?;
        let v = Tensor::randn(0f32, 1., (5, 3, 4), &dev)?;
        let out = block.forward(&s, &v)?;
        assert_eq!(out.scalar.dims(), &[5, 3]);
        assert!(out.vector.is_none());
        Ok(())
    }

    #[test]
    fn test_parameter_names() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let config = GatedEquivConfig::new((8, 2), (8, Some(2))).with_mlp();
        let _block = GatedEquivBlock::load(vb.pp("block"), &config)?;

        let data = varmap.data().lock().unwrap();
        for name in [
            "block.Wv0.weight",
            "block.Ws.0.weight",
            "block.Ws.0.bias",
            "block.Ws.1.weight",
            "block.Ws.1.bias",
            "block.Wv1.weight",
        ] {
            assert!(data.contains_key(name), "missing {name}");
        }
        assert!(!data.contains_key("block.Wv0.bias"));
        Ok(())
    }

    #[test]
    fn test_mlp_hidden_width_is_scalar_input() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        // wider scalar output than input
        let config = GatedEquivConfig::new((4, 4), (16, Some(4))).with_mlp();
        let _block = GatedEquivBlock::load(vb, &config)?;

        let data = varmap.data().lock().unwrap();
        assert_eq!(data["Ws.0.weight"].as_tensor().dims(), &[4, 8]);
        assert_eq!(data["Ws.1.weight"].as_tensor().dims(), &[20, 4]);
        Ok(())
    }

    #[test]
    fn test_requires_vectors() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let block = GatedEquivBlock::load(vb, &GatedEquivConfig::new((4, 2), (4, Some(2))))?;
        let x = NodeFeatures::scalar_only(Tensor::zeros((3, 4), DType::F32, &dev)?);
        assert!(block.forward_features(&x).is_err());
        Ok(())
    }
}
