use crate::*;
use tracing::debug;

/// Топология разреженного слоя
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerTopology {
    /// Количество входов слоя
    pub(crate) inputs: usize,
    /// Количество входных связей у каждого нейрона
    pub(crate) connections: usize,
    /// Координаты нейронов слоя (по одной на выходной нейрон)
    pub(crate) coords: Vec<Coordinate>,
    /// Номера входов каждого нейрона (список смежности).
    /// Порядок совпадает с порядком весов нейрона.
    pub(crate) indices: Vec<Vec<usize>>,
}

impl LayerTopology {
    /// Первый слой: входы выбираются равномерно
    pub fn unbiased(
        rng: &mut dyn RngCore,
        inputs: usize,
        neurons: usize,
        connections: usize,
    ) -> Result<Self> {
        check_counts(inputs, neurons, connections)?;
        let coords = random_coords(rng, neurons);
        let mut indices = Vec::with_capacity(neurons);
        for _ in 0..neurons {
            //новый выбор для каждого нейрона
            let mut ch = Chooser::new_uniform(rng, inputs);
            indices.push(draw(rng, &mut ch, connections)?);
        }
        debug!(inputs, neurons, connections, "unbiased topology");
        Ok(Self { inputs, connections, coords, indices })
    }

    /// Последующий слой: входы выбираются с учетом расстояния
    /// от нейрона до нейронов предыдущего слоя (input_coords).
    pub fn spatial(
        rng: &mut dyn RngCore,
        input_coords: &[Coordinate],
        neurons: usize,
        connections: usize,
        spread: f64,
        policy: SamplingPolicy,
    ) -> Result<Self> {
        let inputs = input_coords.len();
        check_counts(inputs, neurons, connections)?;
        let coords = random_coords(rng, neurons);
        let mut indices = Vec::with_capacity(neurons);
        for target in &coords {
            let mut ch = Chooser::new_spatial(rng, input_coords, target, spread, policy)?;
            indices.push(draw(rng, &mut ch, connections)?);
        }
        debug!(inputs, neurons, connections, spread, ?policy, "spatial topology");
        Ok(Self { inputs, connections, coords, indices })
    }

    /// Количество нейронов (выходов) слоя
    pub fn neurons(&self) -> usize {
        self.indices.len()
    }
    pub fn inputs(&self) -> usize {
        self.inputs
    }
    pub fn connections(&self) -> usize {
        self.connections
    }
    pub fn coords(&self) -> &[Coordinate] {
        &self.coords
    }
    pub fn indices(&self) -> &[Vec<usize>] {
        &self.indices
    }

    /// Все связи слоя: (нейрон, номер веса, вход).
    /// Номер веса = нейрон * connections + k, один порядок для всех проходов.
    pub fn links(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.indices.iter().enumerate().flat_map(move |(out, ins)| {
            ins.iter()
                .enumerate()
                .map(move |(k, &inp)| (out, out * self.connections + k, inp))
        })
    }

    /// Проверка инвариантов (после загрузки)
    pub fn validate(&self) -> Result<()> {
        if self.coords.len() != self.indices.len() {
            return Err(SparseNetError::InvalidTopology(format!(
                "{} coordinates for {} neurons",
                self.coords.len(),
                self.indices.len()
            )));
        }
        check_counts(self.inputs, self.neurons(), self.connections)?;
        for (out, ins) in self.indices.iter().enumerate() {
            if ins.len() != self.connections {
                return Err(SparseNetError::InvalidTopology(format!(
                    "neuron {} has {} connections instead of {}",
                    out,
                    ins.len(),
                    self.connections
                )));
            }
            if let Some(bad) = ins.iter().find(|&&i| i >= self.inputs) {
                return Err(SparseNetError::InvalidTopology(format!(
                    "neuron {} refers to input {} of {}",
                    out, bad, self.inputs
                )));
            }
            if !ins.iter().all_unique() {
                return Err(SparseNetError::InvalidTopology(format!(
                    "neuron {} has duplicate connections",
                    out
                )));
            }
        }
        Ok(())
    }
}

/// Связей не больше, чем нейронов на входе и на выходе
fn check_counts(inputs: usize, neurons: usize, connections: usize) -> Result<()> {
    if connections > inputs || connections > neurons {
        return Err(SparseNetError::TooManyConnections {
            connections,
            inputs,
            outputs: neurons,
        });
    }
    Ok(())
}

fn random_coords(rng: &mut dyn RngCore, count: usize) -> Vec<Coordinate> {
    (0..count).map(|_| Coordinate::random(rng)).collect()
}

fn draw(rng: &mut dyn RngCore, ch: &mut Chooser, count: usize) -> Result<Vec<usize>> {
    (0..count).map(|_| ch.choose(rng)).collect()
}
