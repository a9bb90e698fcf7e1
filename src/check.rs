//! Проверка производных численным дифференцированием (только для тестов)

use crate::*;
use approx::assert_relative_eq;
use rand_distr::{Distribution, StandardNormal};

const DELTA: f64 = 1e-6;
const EPSILON: f64 = 1e-6;
const MAX_RELATIVE: f64 = 1e-4;

/// Сравнивает градиент, R-оператор и R-градиент слоя с конечными разностями.
/// Переменные: вход и все параметры слоя.
pub struct FuncChecker<'l, L: Layer> {
    layer: &'l mut L,
    input: Variable,
    rv: RVector,
}

impl<'l, L: Layer> FuncChecker<'l, L> {
    /// Случайное направление возмущения для каждой переменной
    pub fn new(rng: &mut dyn RngCore, layer: &'l mut L, input: Variable) -> Self {
        let mut rv = RVector::new();
        for var in std::iter::once(&input).chain(layer.parameters()) {
            let dir: Vec<f64> = (0..var.len()).map(|_| StandardNormal.sample(&mut *rng)).collect();
            rv.insert(var.id(), dir);
        }
        Self { layer, input, rv }
    }

    pub fn full_check(&mut self) {
        self.check_jacobian();
        self.check_r();
        self.check_r_gradient();
    }

    fn vars(&self) -> Vec<&Variable> {
        std::iter::once(&self.input).chain(self.layer.parameters()).collect()
    }

    fn var_mut(&mut self, i: usize) -> &mut Variable {
        if i == 0 {
            &mut self.input
        } else {
            self.layer.parameters_mut().swap_remove(i - 1)
        }
    }

    fn output(&self) -> Vec<f64> {
        self.layer.apply(Box::new(&self.input)).unwrap().output().to_vec()
    }

    /// Градиент выхода out_idx по всем переменным
    fn gradient(&self, out_idx: usize) -> Gradient {
        let mut g = Gradient::zeros(self.vars());
        let result = self.layer.apply(Box::new(&self.input)).unwrap();
        let mut upstream = vec![0.0; result.output().len()];
        upstream[out_idx] = 1.0;
        result.propagate_gradient(upstream, &mut g).unwrap();
        g
    }

    fn r_gradient(&self, upstream: Vec<f64>, upstream_r: Vec<f64>) -> (Gradient, RGradient) {
        let mut g = Gradient::zeros(self.vars());
        let mut rg = RGradient::zeros(self.vars());
        let input = RVariable::new(&self.input, &self.rv).unwrap();
        let result = self.layer.apply_r(&self.rv, Box::new(input)).unwrap();
        result.propagate_r_gradient(upstream, upstream_r, &mut rg, &mut g).unwrap();
        (g, rg)
    }

    /// Сдвигает все переменные на scale * rv
    fn shift_all(&mut self, scale: f64) {
        for i in 0..self.vars().len() {
            let id = self.var_mut(i).id();
            let dir = self.rv.get(id).unwrap().to_vec();
            self.var_mut(i)
                .vector
                .iter_mut()
                .zip(dir)
                .for_each(|(v, d)| *v += scale * d);
        }
    }

    fn snapshot(&self) -> Vec<Vec<f64>> {
        self.vars().iter().map(|v| v.vector.clone()).collect()
    }

    fn restore(&mut self, saved: Vec<Vec<f64>>) {
        for (i, vector) in saved.into_iter().enumerate() {
            self.var_mut(i).vector = vector;
        }
    }

    /// Полный якобиан по входу и параметрам
    fn check_jacobian(&mut self) {
        let outputs = self.output().len();
        let ids: Vec<VarId> = self.vars().iter().map(|v| v.id()).collect();
        let grads: Vec<Gradient> = (0..outputs).map(|j| self.gradient(j)).collect();
        for (vi, id) in ids.iter().enumerate() {
            for k in 0..self.var_mut(vi).len() {
                let orig = self.var_mut(vi).vector[k];
                self.var_mut(vi).vector[k] = orig + DELTA;
                let plus = self.output();
                self.var_mut(vi).vector[k] = orig - DELTA;
                let minus = self.output();
                self.var_mut(vi).vector[k] = orig;
                for j in 0..outputs {
                    let numeric = (plus[j] - minus[j]) / (2.0 * DELTA);
                    let analytic = grads[j].get(*id).unwrap()[k];
                    assert_relative_eq!(analytic, numeric, epsilon = EPSILON, max_relative = MAX_RELATIVE);
                }
            }
        }
    }

    /// Производная по направлению rv
    fn check_r(&mut self) {
        let (output, output_r) = {
            let input = RVariable::new(&self.input, &self.rv).unwrap();
            let result = self.layer.apply_r(&self.rv, Box::new(input)).unwrap();
            (result.output().to_vec(), result.r_output().to_vec())
        };
        assert_eq!(output, self.output());

        let saved = self.snapshot();
        self.shift_all(DELTA);
        let plus = self.output();
        self.restore(saved.clone());
        self.shift_all(-DELTA);
        let minus = self.output();
        self.restore(saved);

        for j in 0..output.len() {
            let numeric = (plus[j] - minus[j]) / (2.0 * DELTA);
            assert_relative_eq!(output_r[j], numeric, epsilon = EPSILON, max_relative = MAX_RELATIVE);
        }
    }

    /// R-оператор от градиента
    fn check_r_gradient(&mut self) {
        let outputs = self.output().len();
        let ids: Vec<VarId> = self.vars().iter().map(|v| v.id()).collect();
        for j in 0..outputs {
            let mut upstream = vec![0.0; outputs];
            upstream[j] = 1.0;
            let (g, rg) = self.r_gradient(upstream.clone(), vec![0.0; outputs]);
            let plain = self.gradient(j);

            let saved = self.snapshot();
            self.shift_all(DELTA);
            let plus = self.gradient(j);
            self.restore(saved.clone());
            self.shift_all(-DELTA);
            let minus = self.gradient(j);
            self.restore(saved);

            for id in &ids {
                assert_relative_eq!(
                    g.get(*id).unwrap(),
                    plain.get(*id).unwrap(),
                    epsilon = EPSILON,
                    max_relative = MAX_RELATIVE
                );
                let numeric: Vec<f64> = plus
                    .get(*id)
                    .unwrap()
                    .iter()
                    .zip(minus.get(*id).unwrap())
                    .map(|(p, m)| (p - m) / (2.0 * DELTA))
                    .collect();
                assert_relative_eq!(
                    rg.get(*id).unwrap(),
                    numeric.as_slice(),
                    epsilon = EPSILON,
                    max_relative = MAX_RELATIVE
                );
            }

            //R-производная самого upstream дает обычный градиент
            let (g, rg) = self.r_gradient(vec![0.0; outputs], upstream);
            for id in &ids {
                assert!(g.get(*id).unwrap().iter().all(|&v| v == 0.0));
                assert_relative_eq!(
                    rg.get(*id).unwrap(),
                    plain.get(*id).unwrap(),
                    epsilon = EPSILON,
                    max_relative = MAX_RELATIVE
                );
            }
        }
    }
}
