//! Рецептивное поле одного нейрона: какие входы выбирает нейрон
//! в зависимости от расстояния и разброса. Вывод - проекция x/y в виде
//! текстовой сетки: `.` - входной нейрон, `#` - выбранный вход, `@` - нейрон.

use clap::{Parser, ValueEnum};
use lib_sparse_network::{Chooser, Coordinate, Result, SamplingPolicy};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    Uniform,
    NoisyRank,
    Softmax,
}

impl From<Policy> for SamplingPolicy {
    fn from(p: Policy) -> Self {
        match p {
            Policy::Uniform => SamplingPolicy::Uniform,
            Policy::NoisyRank => SamplingPolicy::NoisyRank,
            Policy::Softmax => SamplingPolicy::SoftmaxWeighted,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "visualize")]
#[command(about = "Show which inputs a sparse neuron connects to")]
struct Args {
    /// Количество входных нейронов
    num_in: usize,

    /// Количество связей нейрона
    num_weights: usize,

    /// Разброс связей
    spread: f64,

    /// Способ выбора связей
    #[arg(long, value_enum, default_value_t = Policy::NoisyRank)]
    policy: Policy,

    /// Зерно генератора
    #[arg(long)]
    seed: Option<u64>,

    /// Размер сетки в символах
    #[arg(long, default_value_t = 50)]
    size: usize,
}

fn cell(c: f64, size: usize) -> usize {
    ((c * size as f64) as usize).min(size - 1)
}

/// Текстовая сетка size x size, строка y сверху вниз
fn render(inputs: &[Coordinate], chosen: &[usize], target: &Coordinate, size: usize) -> String {
    let size = size.max(1);
    let mut grid = vec![vec![' '; size]; size];
    for c in inputs {
        grid[cell(c.y, size)][cell(c.x, size)] = '.';
    }
    for &i in chosen {
        let c = &inputs[i];
        grid[cell(c.y, size)][cell(c.x, size)] = '#';
    }
    grid[cell(target.y, size)][cell(target.x, size)] = '@';
    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn run(args: &Args) -> Result<String> {
    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let inputs: Vec<Coordinate> = (0..args.num_in).map(|_| Coordinate::random(&mut rng)).collect();
    let target = Coordinate::random(&mut rng);
    let mut ch = Chooser::new_spatial(&mut rng, &inputs, &target, args.spread, args.policy.into())?;
    let chosen = (0..args.num_weights)
        .map(|_| ch.choose(&mut rng))
        .collect::<Result<Vec<_>>>()?;

    let mean = chosen.iter().map(|&i| inputs[i].distance_to(&target)).sum::<f64>()
        / chosen.len().max(1) as f64;
    info!(inputs = args.num_in, chosen = chosen.len(), mean_distance = mean, "receptive field");
    Ok(render(&inputs, &chosen, &target, args.size))
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    match run(&args) {
        Ok(grid) => println!("{}", grid),
        Err(e) => {
            eprintln!("visualize: {}", e);
            std::process::exit(1);
        }
    }
}
