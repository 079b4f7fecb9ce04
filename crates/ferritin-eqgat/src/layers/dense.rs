use candle_core::{Module, Result, Tensor};
use candle_nn::{init::Init, Activation, Linear, VarBuilder};

/// Fan-in aware parameter initialisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInit {
    /// Kaiming/He uniform with leaky-relu slope `a`.
    /// `a = sqrt(5)` gives `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
    KaimingUniform { a: f64 },
    XavierUniform,
    Const(f64),
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::KaimingUniform { a: 5f64.sqrt() }
    }
}

impl WeightInit {
    pub fn zeros() -> Self {
        WeightInit::Const(0.0)
    }

    pub fn to_init(self, fan_in: usize, fan_out: usize) -> Init {
        match self {
            WeightInit::KaimingUniform { a } => {
                let gain = (2.0 / (1.0 + a * a)).sqrt();
                let bound = gain * (3.0 / fan_in.max(1) as f64).sqrt();
                Init::Uniform {
                    lo: -bound,
                    up: bound,
                }
            }
            WeightInit::XavierUniform => {
                let bound = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
                Init::Uniform {
                    lo: -bound,
                    up: bound,
                }
            }
            WeightInit::Const(value) => Init::Const(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DenseConfig {
    pub in_features: usize,
    pub out_features: usize,
    pub bias: bool,
    pub activation: Option<Activation>,
    pub weight_init: WeightInit,
    pub bias_init: WeightInit,
}

impl DenseConfig {
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self {
            in_features,
            out_features,
            bias: true,
            activation: None,
            weight_init: WeightInit::default(),
            bias_init: WeightInit::zeros(),
        }
    }

    pub fn no_bias(mut self) -> Self {
        self.bias = false;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }
}

/// Affine map `y = x W^T + b` on the last axis, followed by an optional activation.
///
/// Works on `[N, in]` scalar features as well as `[N, 3, in]` vector features.
#[derive(Clone, Debug)]
pub struct DenseLayer {
    linear: Linear,
    activation: Option<Activation>,
}

impl DenseLayer {
    pub fn load(vb: VarBuilder, config: DenseConfig) -> Result<Self> {
        let DenseConfig {
            in_features,
            out_features,
            bias,
            activation,
            weight_init,
            bias_init,
        } = config;

        let weight = vb.get_with_hints(
            (out_features, in_features),
            "weight",
            weight_init.to_init(in_features, out_features),
        )?;
        let bias = if bias {
            Some(vb.get_with_hints(
                out_features,
                "bias",
                bias_init.to_init(in_features, out_features),
            )?)
        } else {
            None
        };

        Ok(Self {
            linear: Linear::new(weight, bias),
            activation,
        })
    }

    pub fn weight(&self) -> &Tensor {
        self.linear.weight()
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.linear.bias()
    }
}

impl Module for DenseLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = self.linear.forward(xs)?;
        match &self.activation {
            Some(act) => act.forward(&ys),
            None => Ok(ys),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_dense_shapes_and_init() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let dense = DenseLayer::load(vb.pp("dense"), DenseConfig::new(16, 4))?;

        let bound = 1.0 / 4.0; // 1 / sqrt(16)
        let w = dense.weight().flatten_all()?.to_vec1::<f32>()?;
        assert!(w.iter().all(|x| x.abs() <= bound + 1e-6));
        let b = dense.bias().expect("bias").to_vec1::<f32>()?;
        assert!(b.iter().all(|x| *x == 0.0));

        let xs = Tensor::randn(0f32, 1., (5, 16), &dev)?;
        assert_eq!(dense.forward(&xs)?.dims(), &[5, 4]);

        let vs = Tensor::randn(0f32, 1., (5, 3, 16), &dev)?;
        assert_eq!(dense.forward(&vs)?.dims(), &[5, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_dense_activation() -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let config = DenseConfig::new(3, 3).with_activation(Activation::Relu);
        let dense = DenseLayer::load(vb, config)?;
        let xs = Tensor::randn(0f32, 1., (7, 3), &dev)?;
        let ys = dense.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        assert!(ys.iter().all(|y| *y >= 0.0));
        Ok(())
    }
}
