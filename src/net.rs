use crate::*;
use tracing::debug;

/// Слой сети: разреженный слой или функция активации
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "layer")]
pub enum NetLayer {
    Sparse(SparseLayer),
    Activation(Activation),
}

impl Layer for NetLayer {
    fn apply<'a>(&'a self, input: Box<dyn Res + 'a>) -> Result<Box<dyn Res + 'a>> {
        match self {
            NetLayer::Sparse(layer) => layer.apply(input),
            NetLayer::Activation(act) => act.apply(input),
        }
    }
    fn apply_r<'a>(&'a self, rv: &RVector, input: Box<dyn RRes + 'a>) -> Result<Box<dyn RRes + 'a>> {
        match self {
            NetLayer::Sparse(layer) => layer.apply_r(rv, input),
            NetLayer::Activation(act) => act.apply_r(rv, input),
        }
    }
    fn parameters(&self) -> Vec<&Variable> {
        match self {
            NetLayer::Sparse(layer) => layer.parameters(),
            NetLayer::Activation(_) => Vec::new(),
        }
    }
    fn parameters_mut(&mut self) -> Vec<&mut Variable> {
        match self {
            NetLayer::Sparse(layer) => layer.parameters_mut(),
            NetLayer::Activation(_) => Vec::new(),
        }
    }
}

/// Сеть из последовательно соединенных слоев
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<NetLayer>,
}

impl Network {
    /// Конструктор
    pub fn new(layers: Vec<NetLayer>) -> Self {
        Self { layers }
    }

    /// Создание сети со случайными весами и топологией по настройкам.
    /// Первый слой - без учета расстояния, остальные - с учетом координат
    /// нейронов предыдущего разреженного слоя.
    pub fn random(rng: &mut dyn RngCore, config: &NetworkConfig) -> Result<Self> {
        if config.layers.is_empty() {
            return Err(SparseNetError::InvalidTopology("network has no layers".into()));
        }
        let mut layers: Vec<NetLayer> = Vec::new();
        let mut prev: Option<SparseLayer> = None;
        for lc in &config.layers {
            let layer = match &prev {
                None => SparseLayer::new_unbiased(rng, config.inputs, lc.neurons, lc.connections)?,
                Some(prev) => SparseLayer::new_from_with(
                    rng,
                    prev,
                    lc.neurons,
                    lc.connections,
                    lc.spread.unwrap_or(DEFAULT_SPREAD),
                    config.policy,
                )?,
            };
            layers.push(NetLayer::Sparse(layer.clone()));
            if let Some(act) = lc.activation {
                layers.push(NetLayer::Activation(act));
            }
            prev = Some(layer);
        }
        debug!(layers = layers.len(), inputs = config.inputs, "random network");
        Ok(Self { layers })
    }

    /// Разреженные слои сети по порядку
    pub fn sparse_layers(&self) -> impl Iterator<Item = &SparseLayer> + '_ {
        self.layers.iter().filter_map(|l| match l {
            NetLayer::Sparse(layer) => Some(layer),
            NetLayer::Activation(_) => None,
        })
    }

    /// Расчет в прямом направлении
    pub fn propagate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        self.layers
            .iter()
            .try_fold(inputs.to_vec(), |xs, layer| match layer {
                NetLayer::Sparse(layer) => layer.propagate(&xs),
                NetLayer::Activation(act) => Ok(act.propagate(&xs)),
            })
    }

    /// Проверка топологии и согласованности размеров соседних слоев
    pub fn validate(&self) -> Result<()> {
        let mut width: Option<usize> = None;
        for layer in self.sparse_layers() {
            layer.validate()?;
            if let Some(w) = width {
                if w != layer.inputs() {
                    return Err(SparseNetError::InvalidTopology(format!(
                        "layer expects {} inputs, previous layer has {} outputs",
                        layer.inputs(),
                        w
                    )));
                }
            }
            width = Some(layer.outputs());
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
    pub fn from_json(json: &str) -> Result<Self> {
        let net: Network = serde_json::from_str(json)?;
        net.validate()?;
        Ok(net)
    }
}

impl Layer for Network {
    fn apply<'a>(&'a self, input: Box<dyn Res + 'a>) -> Result<Box<dyn Res + 'a>> {
        self.layers.iter().try_fold(input, |res, layer| layer.apply(res))
    }
    fn apply_r<'a>(&'a self, rv: &RVector, input: Box<dyn RRes + 'a>) -> Result<Box<dyn RRes + 'a>> {
        self.layers.iter().try_fold(input, |res, layer| layer.apply_r(rv, res))
    }
    fn parameters(&self) -> Vec<&Variable> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }
    fn parameters_mut(&mut self) -> Vec<&mut Variable> {
        self.layers.iter_mut().flat_map(|l| l.parameters_mut()).collect()
    }
}
