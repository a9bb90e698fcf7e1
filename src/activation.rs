use crate::*;
use itertools::izip;

/// Функция активации (поэлементно)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Tanh,
    Relu,
}

impl Activation {
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
        }
    }
    /// Первая производная, y = eval(x)
    fn deriv(&self, x: f64, y: f64) -> f64 {
        match self {
            Activation::Tanh => 1.0 - y * y,
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
    /// Вторая производная, y = eval(x)
    fn deriv2(&self, _x: f64, y: f64) -> f64 {
        match self {
            Activation::Tanh => -2.0 * y * (1.0 - y * y),
            Activation::Relu => 0.0,
        }
    }
    pub fn propagate(&self, inputs: &[f64]) -> Vec<f64> {
        inputs.iter().map(|&x| self.eval(x)).collect()
    }
}

impl Layer for Activation {
    fn apply<'a>(&'a self, input: Box<dyn Res + 'a>) -> Result<Box<dyn Res + 'a>> {
        let output = self.propagate(input.output());
        Ok(Box::new(ActivationResult { activation: *self, output, input }))
    }

    fn apply_r<'a>(&'a self, _rv: &RVector, input: Box<dyn RRes + 'a>) -> Result<Box<dyn RRes + 'a>> {
        check_len("input r", input.output().len(), input.r_output().len())?;
        let output = self.propagate(input.output());
        let output_r = izip!(input.output(), input.r_output(), &output)
            .map(|(&x, &x_r, &y)| self.deriv(x, y) * x_r)
            .collect();
        Ok(Box::new(ActivationRResult {
            activation: *self,
            output,
            output_r,
            input,
        }))
    }
}

pub struct ActivationResult<'a> {
    activation: Activation,
    output: Vec<f64>,
    input: Box<dyn Res + 'a>,
}

impl Res for ActivationResult<'_> {
    fn output(&self) -> &[f64] {
        &self.output
    }

    fn constant(&self, g: &Gradient) -> bool {
        self.input.constant(g)
    }

    fn propagate_gradient(&self, upstream: Vec<f64>, g: &mut Gradient) -> Result<()> {
        check_len("upstream", self.output.len(), upstream.len())?;
        if self.input.constant(g) {
            return Ok(());
        }
        let downstream = izip!(self.input.output(), &self.output, upstream)
            .map(|(&x, &y, u)| self.activation.deriv(x, y) * u)
            .collect();
        self.input.propagate_gradient(downstream, g)
    }
}

pub struct ActivationRResult<'a> {
    activation: Activation,
    output: Vec<f64>,
    output_r: Vec<f64>,
    input: Box<dyn RRes + 'a>,
}

impl RRes for ActivationRResult<'_> {
    fn output(&self) -> &[f64] {
        &self.output
    }

    fn r_output(&self) -> &[f64] {
        &self.output_r
    }

    fn constant(&self, rg: &RGradient, g: &Gradient) -> bool {
        self.input.constant(rg, g)
    }

    fn propagate_r_gradient(
        &self,
        upstream: Vec<f64>,
        upstream_r: Vec<f64>,
        rg: &mut RGradient,
        g: &mut Gradient,
    ) -> Result<()> {
        check_len("upstream", self.output.len(), upstream.len())?;
        check_len("upstream r", self.output.len(), upstream_r.len())?;
        if self.input.constant(rg, g) {
            return Ok(());
        }
        let act = self.activation;
        let mut downstream = Vec::with_capacity(upstream.len());
        let mut downstream_r = Vec::with_capacity(upstream.len());
        for (&x, &x_r, &y, &u, &u_r) in
            izip!(self.input.output(), self.input.r_output(), &self.output, &upstream, &upstream_r)
        {
            let d = act.deriv(x, y);
            downstream.push(d * u);
            //d(f'(x) * u) = f''(x) * x_r * u + f'(x) * u_r
            downstream_r.push(act.deriv2(x, y) * x_r * u + d * u_r);
        }
        self.input.propagate_r_gradient(downstream, downstream_r, rg, g)
    }
}
