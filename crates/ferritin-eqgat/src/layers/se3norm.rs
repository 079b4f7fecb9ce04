use crate::batch::GraphBatch;
use crate::configs::SE3NormConfig;
use candle_core::{Result, Tensor, D};
use candle_nn::{init::Init, VarBuilder};

/// Rescales per-node 3D vectors so that the mean vector norm of each graph
/// equals a learned scalar.
///
/// `out = weight * pos / (mean_norm[batch] + eps)`
///
/// Norms and a global scale commute with rotations, so the output rotates with
/// the input.
#[derive(Clone, Debug)]
pub struct SE3Norm {
    weight: Tensor,
    eps: f64,
}

impl SE3Norm {
    pub fn load(vb: VarBuilder, config: SE3NormConfig) -> Result<Self> {
        let weight = vb.get_with_hints((1, 1), "weight", Init::Const(1.0))?;
        Ok(Self {
            weight,
            eps: config.eps,
        })
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// * `pos`: `[num_nodes, 3]`
    /// * `batch_lig`: graph index of the ligand nodes only; when given, the
    ///   per-graph norm sum is divided by the ligand node count instead of the
    ///   full node count.
    /// * `pocket_mask`: `[num_nodes]` or `[num_nodes, 1]` 0/1 mask of the nodes
    ///   contributing to the statistics.
    pub fn forward(
        &self,
        pos: &Tensor,
        batch: &GraphBatch,
        batch_lig: Option<&Tensor>,
        pocket_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let norm = pos.sqr()?.sum_keepdim(D::Minus1)?.sqrt()?; // n, 1
        let norm = match pocket_mask {
            Some(mask) => {
                let mask = mask.reshape((norm.dim(0)?, 1))?.to_dtype(norm.dtype())?;
                (norm * mask)?
            }
            None => norm,
        };

        let mean_norm = match batch_lig {
            Some(batch_lig) => {
                let n_nodes_lig = batch.bincount(batch_lig, norm.dtype())?.unsqueeze(1)?;
                batch.scatter_sum(&norm)?.broadcast_div(&n_nodes_lig)?
            }
            None => batch.scatter_mean(&norm)?,
        };

        let denom = (batch.gather(&mean_norm)? + self.eps)?;
        pos.broadcast_div(&denom)?.broadcast_mul(&self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn mean_norm(xs: &Tensor) -> Result<f32> {
        xs.sqr()?
            .sum_keepdim(D::Minus1)?
            .sqrt()?
            .mean_all()?
            .to_scalar::<f32>()
    }

    #[test]
    fn test_single_graph_mean_norm_matches_weight() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let norm = SE3Norm::load(vb, SE3NormConfig { eps: 1e-8 })?;

        let pos = (Tensor::randn(0f32, 1., (12, 3), &dev)? * 7.5)?;
        let batch = GraphBatch::single(12, &dev)?;
        let out = norm.forward(&pos, &batch, None, None)?;
        assert!((mean_norm(&out)? - 1.0).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_graphs_are_normalised_independently() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let norm = SE3Norm::load(vb, SE3NormConfig { eps: 1e-8 })?;

        let small = Tensor::randn(0f32, 0.1, (4, 3), &dev)?;
        let large = Tensor::randn(0f32, 50., (6, 3), &dev)?;
        let pos = Tensor::cat(&[&small, &large], 0)?;
        let batch = GraphBatch::new(&Tensor::new(&[0u32, 0, 0, 0, 1, 1, 1, 1, 1, 1], &dev)?)?;
        let out = norm.forward(&pos, &batch, None, None)?;

        assert!((mean_norm(&out.narrow(0, 0, 4)?)? - 1.0).abs() < 1e-4);
        assert!((mean_norm(&out.narrow(0, 4, 6)?)? - 1.0).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_pocket_mask_with_ligand_index() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let norm = SE3Norm::load(vb, SE3NormConfig { eps: 1e-8 })?;

        // two ligand atoms at distance 2, one pocket atom far away
        let pos = Tensor::new(&[[2f32, 0., 0.], [0., 2., 0.], [100., 0., 0.]], &dev)?;
        let batch = GraphBatch::single(3, &dev)?;
        let batch_lig = Tensor::new(&[0u32, 0], &dev)?;
        let mask = Tensor::new(&[1f32, 1., 0.], &dev)?;
        let out = norm.forward(&pos, &batch, Some(&batch_lig), Some(&mask))?;

        let ligand = out.narrow(0, 0, 2)?;
        assert!((mean_norm(&ligand)? - 1.0).abs() < 1e-4);
        let pocket = out.get(2)?.to_vec1::<f32>()?;
        assert!((pocket[0] - 50.0).abs() < 1e-2);
        Ok(())
    }
}
