use crate::*;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

/// Разреженный слой, нейроны которого расположены в пространстве.
///
/// Топология после создания не меняется, снаружи доступна только для чтения:
///
/// ```compile_fail
/// # use lib_sparse_network::*;
/// # use rand::SeedableRng;
/// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
/// let mut layer = SparseLayer::new_unbiased(&mut rng, 3, 4, 2).unwrap();
/// layer.topology.indices[0][0] = 100;
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SparseLayer {
    pub(crate) topology: LayerTopology,
    /// По одному весу на связь, веса одного нейрона идут подряд
    /// в порядке topology.indices
    pub weights: Variable,
    /// По одному смещению на нейрон
    pub biases: Variable,
}

impl SparseLayer {
    /// Слой со случайными связями (первый слой сети)
    pub fn new_unbiased(
        rng: &mut dyn RngCore,
        inputs: usize,
        neurons: usize,
        connections: usize,
    ) -> Result<Self> {
        let topology = LayerTopology::unbiased(rng, inputs, neurons, connections)?;
        Ok(Self::with_random_params(rng, topology))
    }

    /// Слой, связи которого статистически зависят от координат нейронов
    /// входного слоя. spread задает разброс связей: малое значение (например 1)
    /// дает более локальные связи, большее (например 5) - более случайные.
    pub fn new_from(
        rng: &mut dyn RngCore,
        input: &SparseLayer,
        neurons: usize,
        connections: usize,
        spread: f64,
    ) -> Result<Self> {
        Self::new_from_with(rng, input, neurons, connections, spread, SamplingPolicy::default())
    }

    /// То же, что new_from, с явным выбором способа отбора связей
    pub fn new_from_with(
        rng: &mut dyn RngCore,
        input: &SparseLayer,
        neurons: usize,
        connections: usize,
        spread: f64,
        policy: SamplingPolicy,
    ) -> Result<Self> {
        let topology = LayerTopology::spatial(
            rng,
            &input.topology.coords,
            neurons,
            connections,
            spread,
            policy,
        )?;
        Ok(Self::with_random_params(rng, topology))
    }

    /// Веса ~ N(0, 1/sqrt(connections)), смещения ~ N(0, 1)
    fn with_random_params(rng: &mut dyn RngCore, topology: LayerTopology) -> Self {
        let count = topology.neurons() * topology.connections;
        let stddev = 1.0 / (topology.connections.max(1) as f64).sqrt();
        let weights: Vec<f64> = (0..count).map(|_| gaussian(rng) * stddev).collect();
        let biases: Vec<f64> = (0..topology.neurons()).map(|_| gaussian(rng)).collect();
        debug!(weights = weights.len(), biases = biases.len(), "sparse layer parameters");
        Self {
            topology,
            weights: Variable::new(weights),
            biases: Variable::new(biases),
        }
    }

    pub fn inputs(&self) -> usize {
        self.topology.inputs
    }
    pub fn outputs(&self) -> usize {
        self.topology.neurons()
    }
    pub fn coords(&self) -> &[Coordinate] {
        &self.topology.coords
    }
    pub fn indices(&self) -> &[Vec<usize>] {
        &self.topology.indices
    }
    pub fn connections(&self) -> usize {
        self.topology.connections
    }
    pub fn topology(&self) -> &LayerTopology {
        &self.topology
    }

    /// Размеры параметров могли измениться снаружи
    fn check_params(&self) -> Result<()> {
        check_len(
            "weights",
            self.topology.neurons() * self.topology.connections,
            self.weights.len(),
        )?;
        check_len("biases", self.topology.neurons(), self.biases.len())
    }

    /// Расчет в прямом направлении
    pub fn propagate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        self.check_params()?;
        check_len("input", self.inputs(), inputs.len())?;
        let weights = &self.weights.vector;
        let mut output = vec![0.0; self.outputs()];
        for (out, w, inp) in self.topology.links() {
            output[out] += weights[w] * inputs[inp];
        }
        output
            .iter_mut()
            .zip(&self.biases.vector)
            .for_each(|(o, b)| *o += b);
        Ok(output)
    }

    /// Сериализация в JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
    /// Загрузка из JSON с проверкой топологии
    pub fn from_json(json: &str) -> Result<Self> {
        let layer: SparseLayer = serde_json::from_str(json)?;
        layer.validate()?;
        Ok(layer)
    }
    pub fn validate(&self) -> Result<()> {
        self.topology.validate()?;
        self.check_params()
    }
}

fn gaussian(rng: &mut dyn RngCore) -> f64 {
    StandardNormal.sample(rng)
}

impl Layer for SparseLayer {
    fn apply<'a>(&'a self, input: Box<dyn Res + 'a>) -> Result<Box<dyn Res + 'a>> {
        let output = self.propagate(input.output())?;
        Ok(Box::new(LayerResult { layer: self, output, input }))
    }

    fn apply_r<'a>(&'a self, rv: &RVector, input: Box<dyn RRes + 'a>) -> Result<Box<dyn RRes + 'a>> {
        self.check_params()?;
        let weights = RVariable::new(&self.weights, rv)?;
        let biases = RVariable::new(&self.biases, rv)?;
        let in_vec = input.output();
        let in_vec_r = input.r_output();
        check_len("input", self.inputs(), in_vec.len())?;
        check_len("input r", self.inputs(), in_vec_r.len())?;

        let (w, w_r) = (weights.output(), weights.r_output());
        let mut output = vec![0.0; self.outputs()];
        let mut output_r = vec![0.0; self.outputs()];
        for (out, wi, inp) in self.topology.links() {
            output[out] += w[wi] * in_vec[inp];
            output_r[out] += w_r[wi] * in_vec[inp] + w[wi] * in_vec_r[inp];
        }
        for (o, (b, b_r)) in biases.output().iter().zip(biases.r_output()).enumerate() {
            output[o] += b;
            output_r[o] += b_r;
        }
        Ok(Box::new(LayerRResult {
            layer: self,
            weights_r: weights.r_output().to_vec(),
            output,
            output_r,
            input,
        }))
    }

    fn parameters(&self) -> Vec<&Variable> {
        vec![&self.weights, &self.biases]
    }
    fn parameters_mut(&mut self) -> Vec<&mut Variable> {
        vec![&mut self.weights, &mut self.biases]
    }
}

/// Результат прямого прохода разреженного слоя
pub struct LayerResult<'a> {
    layer: &'a SparseLayer,
    output: Vec<f64>,
    input: Box<dyn Res + 'a>,
}

impl Res for LayerResult<'_> {
    fn output(&self) -> &[f64] {
        &self.output
    }

    fn constant(&self, g: &Gradient) -> bool {
        self.layer.weights.constant(g) && self.layer.biases.constant(g) && self.input.constant(g)
    }

    fn propagate_gradient(&self, upstream: Vec<f64>, g: &mut Gradient) -> Result<()> {
        let layer = self.layer;
        check_len("upstream", layer.outputs(), upstream.len())?;
        layer.biases.propagate_gradient(upstream.clone(), g)?;

        let inputs = self.input.output();
        if let Some(grad) = g.get_mut(layer.weights.id()) {
            for (out, w, inp) in layer.topology.links() {
                grad[w] += inputs[inp] * upstream[out];
            }
        }

        if !self.input.constant(g) {
            let weights = &layer.weights.vector;
            let mut downstream = vec![0.0; inputs.len()];
            for (out, w, inp) in layer.topology.links() {
                downstream[inp] += weights[w] * upstream[out];
            }
            self.input.propagate_gradient(downstream, g)?;
        }
        Ok(())
    }
}

/// Результат прохода с R-оператором
pub struct LayerRResult<'a> {
    layer: &'a SparseLayer,
    weights_r: Vec<f64>,
    output: Vec<f64>,
    output_r: Vec<f64>,
    input: Box<dyn RRes + 'a>,
}

impl RRes for LayerRResult<'_> {
    fn output(&self) -> &[f64] {
        &self.output
    }

    fn r_output(&self) -> &[f64] {
        &self.output_r
    }

    fn constant(&self, rg: &RGradient, g: &Gradient) -> bool {
        self.layer.weights.r_constant(rg, g)
            && self.layer.biases.r_constant(rg, g)
            && self.input.constant(rg, g)
    }

    fn propagate_r_gradient(
        &self,
        upstream: Vec<f64>,
        upstream_r: Vec<f64>,
        rg: &mut RGradient,
        g: &mut Gradient,
    ) -> Result<()> {
        let layer = self.layer;
        check_len("upstream", layer.outputs(), upstream.len())?;
        check_len("upstream r", layer.outputs(), upstream_r.len())?;

        //смещения
        g.accumulate(layer.biases.id(), &upstream)?;
        rg.accumulate(layer.biases.id(), &upstream_r)?;

        let inputs = self.input.output();
        let inputs_r = self.input.r_output();
        if let Some(grad) = g.get_mut(layer.weights.id()) {
            for (out, w, inp) in layer.topology.links() {
                grad[w] += inputs[inp] * upstream[out];
            }
        }
        if let Some(rgrad) = rg.get_mut(layer.weights.id()) {
            for (out, w, inp) in layer.topology.links() {
                rgrad[w] += inputs[inp] * upstream_r[out] + inputs_r[inp] * upstream[out];
            }
        }

        if !self.input.constant(rg, g) {
            let weights = &layer.weights.vector;
            let weights_r = &self.weights_r;
            let mut downstream = vec![0.0; inputs.len()];
            let mut downstream_r = vec![0.0; inputs.len()];
            for (out, w, inp) in layer.topology.links() {
                downstream[inp] += weights[w] * upstream[out];
                downstream_r[inp] += weights_r[w] * upstream[out] + weights[w] * upstream_r[out];
            }
            self.input.propagate_r_gradient(downstream, downstream_r, rg, g)?;
        }
        Ok(())
    }
}
