use crate::*;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};
use tracing::warn;

/// Способ выбора входных нейронов
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingPolicy {
    /// Без учета расстояния, все перестановки равновероятны
    Uniform,
    /// Сортировка по (расстояние + шум N(0, spread)), порядок выдачи
    /// определяется один раз при создании
    #[default]
    NoisyRank,
    /// Выбор без возвращения с весами softmax(1/расстояние, температура = spread)
    SoftmaxWeighted,
}

/// Выбирает номера нейронов (каждый не более одного раза) с заданным смещением.
#[derive(Clone, Debug)]
pub struct Chooser {
    policy: SamplingPolicy,
    /// Оставшиеся номера. Для Uniform и NoisyRank лежат в обратном порядке выдачи.
    indices: Vec<usize>,
    /// 1/расстояние для оставшихся номеров (только SoftmaxWeighted)
    scores: Vec<f64>,
    temperature: f64,
}

impl Chooser {
    /// Равномерный выбор из 0..count
    pub fn new_uniform(rng: &mut dyn RngCore, count: usize) -> Self {
        let mut indices: Vec<usize> = (0..count).collect();
        indices.shuffle(rng);
        Self {
            policy: SamplingPolicy::Uniform,
            indices,
            scores: Vec::new(),
            temperature: 1.0,
        }
    }

    /// Выбор из 0..inputs.len() со смещением в сторону нейронов, близких к target.
    /// Чем меньше spread, тем сильнее предпочтение ближайших.
    pub fn new_spatial(
        rng: &mut dyn RngCore,
        inputs: &[Coordinate],
        target: &Coordinate,
        spread: f64,
        policy: SamplingPolicy,
    ) -> Result<Self> {
        match policy {
            SamplingPolicy::Uniform => Ok(Self::new_uniform(rng, inputs.len())),
            SamplingPolicy::NoisyRank => Self::noisy_rank(rng, inputs, target, spread),
            SamplingPolicy::SoftmaxWeighted => Self::softmax_weighted(inputs, target, spread),
        }
    }

    fn noisy_rank(
        rng: &mut dyn RngCore,
        inputs: &[Coordinate],
        target: &Coordinate,
        spread: f64,
    ) -> Result<Self> {
        if !spread.is_finite() || spread < 0.0 {
            return Err(SparseNetError::InvalidSpread(spread));
        }
        let noise = Normal::new(0.0, spread).map_err(|_| SparseNetError::InvalidSpread(spread))?;
        let keys: Vec<f64> = inputs
            .iter()
            .map(|c| distance(c, target) + noise.sample(&mut *rng))
            .collect();
        //по убыванию, т.к. выдаем с конца
        let indices = (0..inputs.len())
            .sorted_by(|&a, &b| keys[b].total_cmp(&keys[a]))
            .collect();
        Ok(Self {
            policy: SamplingPolicy::NoisyRank,
            indices,
            scores: Vec::new(),
            temperature: 1.0,
        })
    }

    fn softmax_weighted(inputs: &[Coordinate], target: &Coordinate, spread: f64) -> Result<Self> {
        if !spread.is_finite() || spread <= 0.0 {
            return Err(SparseNetError::InvalidSpread(spread));
        }
        let scores = inputs
            .iter()
            .map(|c| 1.0 / distance(c, target).max(f64::EPSILON))
            .collect();
        Ok(Self {
            policy: SamplingPolicy::SoftmaxWeighted,
            indices: (0..inputs.len()).collect(),
            scores,
            temperature: spread,
        })
    }

    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }
    /// Сколько номеров осталось
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Выбирает очередной номер и удаляет его из набора.
    pub fn choose(&mut self, rng: &mut dyn RngCore) -> Result<usize> {
        match self.policy {
            SamplingPolicy::Uniform | SamplingPolicy::NoisyRank => {
                self.indices.pop().ok_or(SparseNetError::ChooserExhausted)
            }
            SamplingPolicy::SoftmaxWeighted => {
                if self.indices.is_empty() {
                    return Err(SparseNetError::ChooserExhausted);
                }
                let pos = weighted_position(&self.scores, self.temperature, rng.gen());
                self.scores.swap_remove(pos);
                Ok(self.indices.swap_remove(pos))
            }
        }
    }
}

/// Позиция, выбранная с весами softmax(scores / temperature) при u из [0, 1).
/// Веса нормируются по оставшимся номерам на каждом шаге.
fn weighted_position(scores: &[f64], temperature: f64, u: f64) -> usize {
    let weights = softmax(scores, temperature);
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        warn!(remaining = scores.len(), "chooser weights degenerate, taking the nearest");
        return scores.iter().position_max_by(|a, b| a.total_cmp(b)).unwrap_or(0);
    }
    bracket(&weights, u * total)
}

/// Номер интервала, в который попало r; при ошибке округления - последний
fn bracket(weights: &[f64], mut r: f64) -> usize {
    weights
        .iter()
        .position(|w| {
            r -= w;
            r < 0.0
        })
        .unwrap_or(weights.len().saturating_sub(1))
}

/// softmax с температурой
fn softmax(values: &[f64], temperature: f64) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| ((v - max) / temperature).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
