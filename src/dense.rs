//! Плотное представление разреженной сети для расчета через candle.
//! Отсутствующие связи заполняются нулями.

use crate::*;
use candle_core::{Device, Module, Tensor};
use candle_nn::{seq, Linear, Sequential};
use tracing::debug;

impl SparseLayer {
    /// Матрица весов (выходы x входы) построчно
    pub fn dense_weights(&self) -> Vec<f64> {
        let inputs = self.inputs();
        let mut dense = vec![0.0; self.outputs() * inputs];
        for (out, w, inp) in self.topology.links() {
            dense[out * inputs + inp] += self.weights.vector[w];
        }
        dense
    }

    /// Линейный слой candle с теми же весами и смещениями
    pub fn to_linear(&self) -> Result<Linear> {
        self.validate()?;
        let weights = Tensor::from_vec(self.dense_weights(), (self.outputs(), self.inputs()), &Device::Cpu)?;
        let biases = Tensor::from_vec(self.biases.vector.clone(), self.outputs(), &Device::Cpu)?;
        Ok(Linear::new(weights, Some(biases)))
    }
}

impl Network {
    /// Модель для расчета
    pub fn model(&self) -> Result<Sequential> {
        self.validate()?;
        let mut model = seq();
        for layer in &self.layers {
            model = match layer {
                NetLayer::Sparse(layer) => model.add(layer.to_linear()?),
                NetLayer::Activation(Activation::Relu) => model.add(candle_nn::Activation::Relu),
                NetLayer::Activation(Activation::Tanh) => model.add_fn(|xs| xs.tanh()),
            };
        }
        debug!(layers = model.len(), "dense model");
        Ok(model)
    }

    /// Расчет в прямом направлении через плотную модель
    pub fn propagate_dense(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let width = self.sparse_layers().next().map(|l| l.inputs()).unwrap_or(inputs.len());
        check_len("input", width, inputs.len())?;
        let model = self.model()?;
        let xs = Tensor::from_vec(inputs.to_vec(), (1, inputs.len()), &Device::Cpu)?;
        let ys = model.forward(&xs)?;
        Ok(ys.flatten_all()?.to_vec1::<f64>()?)
    }
}
