//! Node features and per-graph aggregation.
//!
//! Graphs in a batch are concatenated along the node axis. Every node carries the
//! index of the graph it belongs to, and the statistics used by the norm layers are
//! computed per graph by scattering node values into `(num_graphs, ..)` buffers and
//! gathering them back to `(num_nodes, ..)`.
use candle_core::{bail, DType, Result, Tensor};

/// Scalar and (optional) vector features of every node in a batch.
///
/// * `scalar`: `[num_nodes, scalar_dim]`
/// * `vector`: `[num_nodes, 3, vector_dim]`
#[derive(Clone, Debug)]
pub struct NodeFeatures {
    pub scalar: Tensor,
    pub vector: Option<Tensor>,
}

impl NodeFeatures {
    pub fn new(scalar: Tensor, vector: Tensor) -> Self {
        Self {
            scalar,
            vector: Some(vector),
        }
    }

    pub fn scalar_only(scalar: Tensor) -> Self {
        Self {
            scalar,
            vector: None,
        }
    }

    pub fn num_nodes(&self) -> Result<usize> {
        let n = self.scalar.dim(0)?;
        if let Some(v) = &self.vector {
            let (nv, three, _) = v.dims3()?;
            if nv != n || three != 3 {
                bail!(
                    "vector features must be [{n}, 3, _], got {:?}",
                    v.shape().dims()
                )
            }
        }
        Ok(n)
    }
}

/// Per-node graph assignment for a batch of concatenated graphs.
#[derive(Clone, Debug)]
pub struct GraphBatch {
    index: Tensor,
    num_graphs: usize,
}

impl GraphBatch {
    /// Wraps a `[num_nodes]` integer tensor. Values are graph ids in `0..num_graphs`.
    pub fn new(index: &Tensor) -> Result<Self> {
        let index = to_index_dtype(index)?;
        let num_nodes = index.dims1()?;
        if num_nodes == 0 {
            bail!("batch index is empty")
        }
        let num_graphs = index.max(0)?.to_scalar::<u32>()? as usize + 1;
        Ok(Self { index, num_graphs })
    }

    /// Batch of a single graph holding `num_nodes` nodes.
    pub fn single(num_nodes: usize, device: &candle_core::Device) -> Result<Self> {
        let index = Tensor::zeros(num_nodes, DType::U32, device)?;
        Self::new(&index)
    }

    pub fn index(&self) -> &Tensor {
        &self.index
    }

    pub fn num_graphs(&self) -> usize {
        self.num_graphs
    }

    pub fn num_nodes(&self) -> usize {
        self.index.dim(0).unwrap_or(0)
    }

    fn check_nodes(&self, xs: &Tensor) -> Result<()> {
        let n = xs.dim(0)?;
        if n != self.num_nodes() {
            bail!(
                "expected {} nodes along dim 0, got {:?}",
                self.num_nodes(),
                xs.shape().dims()
            )
        }
        Ok(())
    }

    /// Sum of node values per graph: `[num_nodes, ..] -> [num_graphs, ..]`.
    pub fn scatter_sum(&self, xs: &Tensor) -> Result<Tensor> {
        self.check_nodes(xs)?;
        scatter_add(&self.index, xs, self.num_graphs)
    }

    /// Mean of node values per graph. Graphs without nodes come out as zero.
    pub fn scatter_mean(&self, xs: &Tensor) -> Result<Tensor> {
        let summed = self.scatter_sum(xs)?;
        let counts = self.bincount(&self.index, xs.dtype())?.maximum(1f64)?;
        summed.broadcast_div(&align_counts(&counts, summed.rank())?)
    }

    /// Broadcast per-graph values back onto their nodes: `[num_graphs, ..] -> [num_nodes, ..]`.
    pub fn gather(&self, per_graph: &Tensor) -> Result<Tensor> {
        if per_graph.dim(0)? != self.num_graphs {
            bail!(
                "expected {} graphs along dim 0, got {:?}",
                self.num_graphs,
                per_graph.shape().dims()
            )
        }
        per_graph.contiguous()?.index_select(&self.index, 0)
    }

    /// Number of entries per graph id in `other`, sized to this batch: `[num_graphs]`.
    pub fn bincount(&self, other: &Tensor, dtype: DType) -> Result<Tensor> {
        let other = to_index_dtype(other)?;
        let n = other.dims1()?;
        let ones = Tensor::ones(n, dtype, other.device())?;
        scatter_add(&other, &ones, self.num_graphs)
    }
}

fn to_index_dtype(index: &Tensor) -> Result<Tensor> {
    match index.dtype() {
        DType::U32 => Ok(index.clone()),
        DType::U8 | DType::I64 => index.to_dtype(DType::U32),
        dtype => bail!("batch index must be an integer tensor, got {dtype:?}"),
    }
}

fn scatter_add(index: &Tensor, xs: &Tensor, dim_size: usize) -> Result<Tensor> {
    let mut shape = xs.shape().dims().to_vec();
    shape[0] = dim_size;
    Tensor::zeros(shape, xs.dtype(), xs.device())?.index_add(index, &xs.contiguous()?, 0)
}

// [num_graphs] -> [num_graphs, 1, ..] so it broadcasts against a rank `rank` tensor
fn align_counts(counts: &Tensor, rank: usize) -> Result<Tensor> {
    let mut shape = vec![1usize; rank.max(1)];
    shape[0] = counts.dim(0)?;
    counts.reshape(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_scatter_mean_per_graph() -> Result<()> {
        let dev = Device::Cpu;
        let batch = GraphBatch::new(&Tensor::new(&[0u32, 0, 1, 1, 1], &dev)?)?;
        assert_eq!(batch.num_graphs(), 2);

        let xs = Tensor::new(&[[1f32], [3.], [2.], [4.], [6.]], &dev)?;
        let mean = batch.scatter_mean(&xs)?;
        assert_eq!(mean.to_vec2::<f32>()?, vec![vec![2.0], vec![4.0]]);

        let back = batch.gather(&mean)?;
        assert_eq!(back.dims(), &[5, 1]);
        assert_eq!(
            back.flatten_all()?.to_vec1::<f32>()?,
            vec![2.0, 2.0, 4.0, 4.0, 4.0]
        );
        Ok(())
    }

    #[test]
    fn test_scatter_rank3() -> Result<()> {
        let dev = Device::Cpu;
        let batch = GraphBatch::new(&Tensor::new(&[0i64, 1, 1], &dev)?)?;
        let xs = Tensor::ones((3, 1, 1), DType::F32, &dev)?;
        let summed = batch.scatter_sum(&xs)?;
        assert_eq!(summed.flatten_all()?.to_vec1::<f32>()?, vec![1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_bincount_and_validation() -> Result<()> {
        let dev = Device::Cpu;
        let batch = GraphBatch::new(&Tensor::new(&[0u32, 1, 1, 2], &dev)?)?;
        let counts = batch.bincount(&Tensor::new(&[0u32, 2, 2], &dev)?, DType::F32)?;
        assert_eq!(counts.to_vec1::<f32>()?, vec![1.0, 0.0, 2.0]);

        assert!(GraphBatch::new(&Tensor::new(&[0f32, 1.], &dev)?).is_err());
        assert!(batch.scatter_sum(&Tensor::ones((2, 4), DType::F32, &dev)?).is_err());
        Ok(())
    }
}
