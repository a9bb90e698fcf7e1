use crate::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Разброс связей по умолчанию
pub const DEFAULT_SPREAD: f64 = 1.0;

/// Настройки одного разреженного слоя
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Количество нейронов в слое
    pub neurons: usize,
    /// Количество входных связей у каждого нейрона
    pub connections: usize,
    /// Разброс связей (не используется в первом слое)
    #[serde(default)]
    pub spread: Option<f64>,
    /// Функция активации после слоя
    #[serde(default)]
    pub activation: Option<Activation>,
}

impl LayerConfig {
    pub fn new(neurons: usize, connections: usize) -> Self {
        Self {
            neurons,
            connections,
            spread: None,
            activation: None,
        }
    }
    pub fn spread(mut self, spread: f64) -> Self {
        self.spread = Some(spread);
        self
    }
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }
}

/// Настройки сети
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Размер входного вектора
    pub inputs: usize,
    /// Способ выбора связей для всех слоев кроме первого
    #[serde(default)]
    pub policy: SamplingPolicy,
    /// Зерно генератора, без него - случайное
    #[serde(default)]
    pub seed: Option<u64>,
    pub layers: Vec<LayerConfig>,
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}
