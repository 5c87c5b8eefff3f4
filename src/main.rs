//! Демонстрация: оценка классификатора составными метриками.
//!
//! Генерирует синтетические предсказания, подключает к циклу оценки
//! Precision/Recall по классам, Accuracy и F1, построенный из Precision и
//! Recall, и печатает опубликованные значения в JSON.

use rustymetrics::engine::{Engine, EngineConfig};
use rustymetrics::metrics::{fbeta, Accuracy, MetricHandle, PredTarget, Precision, Recall};

use clap::Parser;
use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Аргументы командной строки
#[derive(Parser, Debug)]
#[command(author, version, about = "rustymetrics: composable evaluation metrics demo", long_about = None)]
struct Args {
    /// JSON-файл с конфигурацией EngineConfig
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Количество эпох (перекрывает max_epochs из конфигурации)
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Количество батчей
    #[arg(long, default_value_t = 10)]
    batches: usize,

    /// Размер батча
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Количество классов
    #[arg(long, default_value_t = 10)]
    classes: usize,

    /// Seed генератора
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

/// Синтетические батчи: в ~60% случаев верный класс получает максимальную оценку.
fn synthetic_batches(args: &Args) -> Vec<PredTarget> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut batches = Vec::with_capacity(args.batches);

    for b in 0..args.batches {
        let mut preds = Array2::<f32>::random_using(
            (args.batch_size, args.classes),
            Uniform::new(0.0, 0.2),
            &mut rng,
        );
        let targets = Array1::from_shape_fn(args.batch_size, |i| {
            ((b * args.batch_size + i) % args.classes) as f32
        });

        for (i, &target) in targets.iter().enumerate() {
            if rng.gen::<f64>() > 0.4 {
                preds[[i, target as usize]] = 1.0;
            } else {
                let j = rng.gen_range(0..args.classes);
                preds[[i, j]] = 0.7;
            }
        }
        batches.push((preds.into_dyn(), targets.into_dyn()));
    }
    batches
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.classes < 2 || args.batch_size == 0 {
        return Err("нужно хотя бы 2 класса и ненулевой размер батча".into());
    }
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        config.max_epochs = epochs;
    }
    config.validate()?;

    let data = synthetic_batches(&args);
    let mut evaluator = Engine::with_config(|_state, batch: &PredTarget| Ok(batch.clone()), config);

    let precision = MetricHandle::new(Precision::new().with_average(false));
    let recall = MetricHandle::new(Recall::new().with_average(false));
    let accuracy = MetricHandle::new(Accuracy::new());
    let f1 = fbeta(1.0, &precision, &recall, true)?;

    precision.attach(&mut evaluator, "precision")?;
    recall.attach(&mut evaluator, "recall")?;
    accuracy.attach(&mut evaluator, "accuracy")?;
    f1.attach(&mut evaluator, "f1")?;

    let state = evaluator.run_default(&data)?;
    println!("{}", serde_json::to_string_pretty(&state.metrics)?);
    Ok(())
}
