use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Likert item on 1..=5, or `None` about 3% of the time.
    fn likert(&mut self, centre: f64) -> Option<i64> {
        if self.next_f64() < 0.03 {
            return None;
        }
        Some(self.gauss(centre, 1.0).round().clamp(1.0, 5.0) as i64)
    }
}

const CARRERAS: [&str; 4] = ["Psicología", "Ingeniería", "Derecho", "Administración"];
const SEXOS: [&str; 2] = ["Femenino", "Masculino"];

fn level(z: f64) -> &'static str {
    if z < -0.5 {
        "Bajo"
    } else if z > 0.5 {
        "Alto"
    } else {
        "Medio"
    }
}

fn zscores(raw: &[f64]) -> Vec<f64> {
    let n = raw.len() as f64;
    let mean = raw.iter().sum::<f64>() / n;
    let sd = (raw.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
    raw.iter()
        .map(|x| if sd > 0.0 { (x - mean) / sd } else { 0.0 })
        .collect()
}

fn cell(v: Option<i64>) -> String {
    v.map(|i| i.to_string()).unwrap_or_default()
}

/// Labor self-efficacy survey: three subscales with z-scores and levels.
fn write_efficacy(rng: &mut SimpleRng, n: usize, csv_path: &Path, parquet_path: &Path) -> Result<()> {
    let carreras: Vec<&str> = (0..n).map(|_| rng.pick(&CARRERAS)).collect();
    let sexos: Vec<&str> = (0..n).map(|_| rng.pick(&SEXOS)).collect();
    let items: Vec<Vec<Option<i64>>> = carreras
        .iter()
        .map(|c| {
            let centre = if *c == "Ingeniería" { 3.6 } else { 3.2 };
            (0..9).map(|_| rng.likert(centre)).collect()
        })
        .collect();

    let subscale = |row: &[Option<i64>], range: std::ops::Range<usize>| -> f64 {
        row[range].iter().flatten().sum::<i64>() as f64
    };
    let coe: Vec<f64> = items.iter().map(|r| subscale(r, 0..3)).collect();
    let info: Vec<f64> = items.iter().map(|r| subscale(r, 3..6)).collect();
    let te: Vec<f64> = items.iter().map(|r| subscale(r, 6..9)).collect();
    let total: Vec<f64> = (0..n).map(|i| coe[i] + info[i] + te[i]).collect();
    let (z_coe, z_info, z_te, z_total) = (zscores(&coe), zscores(&info), zscores(&te), zscores(&total));
    let cf1: Vec<i64> = (0..n).map(|_| (rng.next_u64() % 3) as i64 + 1).collect();

    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    let mut header = vec![
        "CARRERA", "SEXO", "NIVEL_AE_COE", "NIVEL_AE_INFO", "NIVEL_AE_TE", "Nivel_AE_TOTAL",
        "Z_COE", "Z_INFO", "Z_TE", "AE_Total", "CF1",
    ]
    .into_iter()
    .map(String::from)
    .collect::<Vec<_>>();
    header.extend((1..=9).map(|i| format!("F1{i}")));
    writer.write_record(&header)?;

    for i in 0..n {
        let mut record = vec![
            carreras[i].to_string(),
            sexos[i].to_string(),
            level(z_coe[i]).to_string(),
            level(z_info[i]).to_string(),
            level(z_te[i]).to_string(),
            level(z_total[i]).to_string(),
            format!("{:.4}", z_coe[i]),
            format!("{:.4}", z_info[i]),
            format!("{:.4}", z_te[i]),
            format!("{}", total[i]),
            cf1[i].to_string(),
        ];
        record.extend(items[i].iter().map(|v| cell(*v)));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    // Parquet copy with the headline columns only.
    let schema = Arc::new(Schema::new(vec![
        Field::new("CARRERA", DataType::Utf8, false),
        Field::new("Nivel_AE_TOTAL", DataType::Utf8, false),
        Field::new("Z_COE", DataType::Float64, false),
        Field::new("Z_INFO", DataType::Float64, false),
        Field::new("Z_TE", DataType::Float64, false),
        Field::new("AE_Total", DataType::Float64, false),
        Field::new("CF1", DataType::Int64, false),
    ]));
    let levels: Vec<&str> = z_total.iter().map(|z| level(*z)).collect();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(carreras.clone())),
        Arc::new(StringArray::from(levels)),
        Arc::new(Float64Array::from(z_coe)),
        Arc::new(Float64Array::from(z_info)),
        Arc::new(Float64Array::from(z_te)),
        Arc::new(Float64Array::from(total)),
        Arc::new(Int64Array::from(cf1)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(parquet_path)
        .with_context(|| format!("creating {}", parquet_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Academic anxiety survey: same shape, different scales.
fn write_anxiety(rng: &mut SimpleRng, n: usize, csv_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    writer.write_record([
        "CARRERA", "SEXO", "SEMESTRE", "ANSIEDAD_TOTAL", "Z_ANSIEDAD", "NIVEL_ANSIEDAD",
    ])?;

    let raw: Vec<f64> = (0..n).map(|_| rng.gauss(45.0, 9.0).max(10.0).round()).collect();
    let z = zscores(&raw);
    for i in 0..n {
        let carrera = rng.pick(&CARRERAS);
        let sexo = rng.pick(&SEXOS);
        let semestre = (rng.next_u64() % 10 + 1).to_string();
        writer.write_record([
            carrera.to_string(),
            sexo.to_string(),
            semestre,
            format!("{}", raw[i]),
            format!("{:.4}", z[i]),
            level(z[i]).to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);
    let n = 240;

    write_efficacy(
        &mut rng,
        n,
        Path::new("dataset_limpio_para_app.csv"),
        Path::new("dataset_limpio_para_app.parquet"),
    )?;
    write_anxiety(&mut rng, n, Path::new("dataset_ansiedad.csv"))?;

    log::info!("wrote {n} responses per survey");
    println!("Wrote dataset_limpio_para_app.csv, dataset_limpio_para_app.parquet, dataset_ansiedad.csv");
    Ok(())
}
