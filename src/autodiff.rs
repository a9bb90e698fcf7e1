//! Дифференцируемые значения: переменные, карты градиентов и интерфейс
//! результатов для обратного распространения и R-оператора.

use crate::*;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(1);

/// Уникальный (в пределах процесса) идентификатор переменной
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarId(u64);

impl VarId {
    pub fn fresh() -> Self {
        Self(NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Вектор параметров, который меняет оптимизатор.
/// Копия переменной получает новый идентификатор.
#[derive(Debug, Serialize, Deserialize)]
pub struct Variable {
    #[serde(skip, default = "VarId::fresh")]
    id: VarId,
    pub vector: Vec<f64>,
}

impl Clone for Variable {
    fn clone(&self) -> Self {
        Self::new(self.vector.clone())
    }
}

impl Variable {
    pub fn new(vector: Vec<f64>) -> Self {
        Self {
            id: VarId::fresh(),
            vector,
        }
    }
    pub fn id(&self) -> VarId {
        self.id
    }
    pub fn len(&self) -> usize {
        self.vector.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }
    /// Константа и для градиента, и для R-градиента
    pub fn r_constant(&self, rg: &RGradient, g: &Gradient) -> bool {
        !rg.contains(self.id) && !g.contains(self.id)
    }
}

/// Векторы, привязанные к переменным: градиент, R-градиент или
/// направление возмущения (RVector).
#[derive(Clone, Debug, Default)]
pub struct VarMap(HashMap<VarId, Vec<f64>>);

pub type Gradient = VarMap;
pub type RGradient = VarMap;
pub type RVector = VarMap;

impl VarMap {
    pub fn new() -> Self {
        Self::default()
    }
    /// Нулевые векторы для указанных переменных
    pub fn zeros<'v>(vars: impl IntoIterator<Item = &'v Variable>) -> Self {
        Self(vars.into_iter().map(|v| (v.id(), vec![0.0; v.len()])).collect())
    }
    pub fn insert(&mut self, id: VarId, vector: Vec<f64>) {
        self.0.insert(id, vector);
    }
    pub fn contains(&self, id: VarId) -> bool {
        self.0.contains_key(&id)
    }
    pub fn get(&self, id: VarId) -> Option<&[f64]> {
        self.0.get(&id).map(|v| v.as_slice())
    }
    pub fn get_mut(&mut self, id: VarId) -> Option<&mut Vec<f64>> {
        self.0.get_mut(&id)
    }
    /// Прибавляет values к вектору переменной (если она отслеживается)
    pub fn accumulate(&mut self, id: VarId, values: &[f64]) -> Result<()> {
        if let Some(slot) = self.0.get_mut(&id) {
            check_len("gradient", slot.len(), values.len())?;
            slot.iter_mut().zip(values).for_each(|(s, v)| *s += v);
        }
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Результат прямого прохода, через который можно распространить градиент
pub trait Res {
    fn output(&self) -> &[f64];
    /// true, если результат не зависит от переменных из g
    fn constant(&self, g: &Gradient) -> bool;
    /// Добавляет в g производные по отслеживаемым переменным,
    /// upstream - производная скалярной функции по output()
    fn propagate_gradient(&self, upstream: Vec<f64>, g: &mut Gradient) -> Result<()>;
}

/// Результат прохода с R-оператором (производная по направлению)
pub trait RRes {
    fn output(&self) -> &[f64];
    /// Производная output() по направлению возмущения
    fn r_output(&self) -> &[f64];
    fn constant(&self, rg: &RGradient, g: &Gradient) -> bool;
    /// upstream_r - R-производная от upstream.
    /// В rg накапливается R-оператор от градиента, в g - сам градиент.
    fn propagate_r_gradient(
        &self,
        upstream: Vec<f64>,
        upstream_r: Vec<f64>,
        rg: &mut RGradient,
        g: &mut Gradient,
    ) -> Result<()>;
}

/// Слой (или сеть слоев), применяемый к дифференцируемому значению
pub trait Layer {
    fn apply<'a>(&'a self, input: Box<dyn Res + 'a>) -> Result<Box<dyn Res + 'a>>;
    fn apply_r<'a>(&'a self, rv: &RVector, input: Box<dyn RRes + 'a>) -> Result<Box<dyn RRes + 'a>>;
    /// Обучаемые параметры
    fn parameters(&self) -> Vec<&Variable> {
        Vec::new()
    }
    fn parameters_mut(&mut self) -> Vec<&mut Variable> {
        Vec::new()
    }
}

impl Res for Variable {
    fn output(&self) -> &[f64] {
        &self.vector
    }
    fn constant(&self, g: &Gradient) -> bool {
        !g.contains(self.id)
    }
    fn propagate_gradient(&self, upstream: Vec<f64>, g: &mut Gradient) -> Result<()> {
        check_len("upstream", self.len(), upstream.len())?;
        g.accumulate(self.id, &upstream)
    }
}

impl<T: Res + ?Sized> Res for &T {
    fn output(&self) -> &[f64] {
        (**self).output()
    }
    fn constant(&self, g: &Gradient) -> bool {
        (**self).constant(g)
    }
    fn propagate_gradient(&self, upstream: Vec<f64>, g: &mut Gradient) -> Result<()> {
        (**self).propagate_gradient(upstream, g)
    }
}

/// Переменная вместе со своим направлением возмущения
#[derive(Clone, Debug)]
pub struct RVariable<'a> {
    var: &'a Variable,
    r: Vec<f64>,
}

impl<'a> RVariable<'a> {
    /// Направление берется из rv, для отсутствующих переменных - нулевое
    pub fn new(var: &'a Variable, rv: &RVector) -> Result<Self> {
        let r = match rv.get(var.id()) {
            Some(r) => {
                check_len("r-vector", var.len(), r.len())?;
                r.to_vec()
            }
            None => vec![0.0; var.len()],
        };
        Ok(Self { var, r })
    }
    pub fn variable(&self) -> &'a Variable {
        self.var
    }
}

impl RRes for RVariable<'_> {
    fn output(&self) -> &[f64] {
        &self.var.vector
    }
    fn r_output(&self) -> &[f64] {
        &self.r
    }
    fn constant(&self, rg: &RGradient, g: &Gradient) -> bool {
        self.var.r_constant(rg, g)
    }
    fn propagate_r_gradient(
        &self,
        upstream: Vec<f64>,
        upstream_r: Vec<f64>,
        rg: &mut RGradient,
        g: &mut Gradient,
    ) -> Result<()> {
        check_len("upstream", self.var.len(), upstream.len())?;
        check_len("upstream r", self.var.len(), upstream_r.len())?;
        g.accumulate(self.var.id(), &upstream)?;
        rg.accumulate(self.var.id(), &upstream_r)
    }
}

/// Постоянный вход (ни от чего не зависит)
#[derive(Clone, Debug)]
pub struct Constant {
    vector: Vec<f64>,
    zeros: Vec<f64>,
}

impl Constant {
    pub fn new(vector: Vec<f64>) -> Self {
        let zeros = vec![0.0; vector.len()];
        Self { vector, zeros }
    }
}

impl Res for Constant {
    fn output(&self) -> &[f64] {
        &self.vector
    }
    fn constant(&self, _g: &Gradient) -> bool {
        true
    }
    fn propagate_gradient(&self, _upstream: Vec<f64>, _g: &mut Gradient) -> Result<()> {
        Ok(())
    }
}

impl RRes for Constant {
    fn output(&self) -> &[f64] {
        &self.vector
    }
    fn r_output(&self) -> &[f64] {
        &self.zeros
    }
    fn constant(&self, _rg: &RGradient, _g: &Gradient) -> bool {
        true
    }
    fn propagate_r_gradient(
        &self,
        _upstream: Vec<f64>,
        _upstream_r: Vec<f64>,
        _rg: &mut RGradient,
        _g: &mut Gradient,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clone_gets_new_id() {
        let a = Variable::new(vec![1.0, 2.0]);
        let b = a.clone();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.vector, b.vector);
    }

    #[test]
    fn variable_gradient() {
        let a = Variable::new(vec![1.0, 2.0]);
        let b = Variable::new(vec![3.0]);
        let mut g = Gradient::zeros([&a]);
        assert!(!a.constant(&g));
        assert!(Res::constant(&b, &g));

        a.propagate_gradient(vec![0.5, -1.0], &mut g).unwrap();
        a.propagate_gradient(vec![0.5, -1.0], &mut g).unwrap();
        b.propagate_gradient(vec![7.0], &mut g).unwrap();
        assert_relative_eq!(g.get(a.id()).unwrap(), [1.0, -2.0].as_slice());
        assert!(g.get(b.id()).is_none());

        assert!(matches!(
            a.propagate_gradient(vec![1.0], &mut g),
            Err(SparseNetError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn r_variable() {
        let a = Variable::new(vec![1.0, 2.0]);
        let b = Variable::new(vec![3.0]);
        let mut rv = RVector::new();
        rv.insert(a.id(), vec![0.1, 0.2]);

        let ra = RVariable::new(&a, &rv).unwrap();
        let rb = RVariable::new(&b, &rv).unwrap();
        assert_eq!(ra.r_output(), [0.1, 0.2].as_slice());
        assert_eq!(rb.r_output(), [0.0].as_slice());

        let mut g = Gradient::zeros([&a]);
        let mut rg = RGradient::zeros([&a, &b]);
        assert!(!rb.constant(&rg, &g));
        ra.propagate_r_gradient(vec![1.0, 1.0], vec![2.0, 3.0], &mut rg, &mut g).unwrap();
        assert_eq!(g.get(a.id()).unwrap(), [1.0, 1.0].as_slice());
        assert_eq!(rg.get(a.id()).unwrap(), [2.0, 3.0].as_slice());

        rv.insert(b.id(), vec![1.0, 2.0]);
        assert!(RVariable::new(&b, &rv).is_err());
    }

    #[test]
    fn constant_is_constant() {
        let c = Constant::new(vec![1.0, 2.0]);
        let a = Variable::new(vec![0.0]);
        let mut g = Gradient::zeros([&a]);
        let mut rg = RGradient::new();
        assert!(Res::constant(&c, &g));
        assert!(RRes::constant(&c, &rg, &g));
        assert_eq!(RRes::r_output(&c), [0.0, 0.0].as_slice());
        c.propagate_gradient(vec![1.0, 1.0], &mut g).unwrap();
        c.propagate_r_gradient(vec![1.0, 1.0], vec![1.0, 1.0], &mut rg, &mut g).unwrap();
        assert_eq!(g.get(a.id()).unwrap(), [0.0].as_slice());
    }
}
