use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde_json::json;

/// Write a synthetic visits dataset and matching municipality boundaries.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Number of visits to generate
    #[arg(long, default_value_t = 20_000)]
    rows: usize,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

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

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    /// Pick from `(item, weight)` pairs.
    fn weighted<'a, T>(&mut self, items: &'a [(T, f64)]) -> &'a T {
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        let mut target = self.next_f64() * total;
        for (item, weight) in items {
            if target < *weight {
                return item;
            }
            target -= weight;
        }
        &items[items.len() - 1].0
    }
}

/// `(boundary name, spelling used in the dataset, weight, column, row)`.
/// The last entry has no boundary polygon.
const MUNICIPALITIES: [(&str, &str, f64, u32, u32); 12] = [
    ("Vitória", "VITORIA", 20.0, 2, 1),
    ("Vila Velha", "VILA VELHA", 15.0, 2, 0),
    ("Serra", "SERRA", 14.0, 2, 2),
    ("Cariacica", "CARIACICA", 10.0, 1, 1),
    ("São Mateus", "SAO MATEUS", 6.0, 2, 4),
    ("Linhares", "LINHARES", 6.0, 2, 3),
    ("Colatina", "Colatina", 5.0, 1, 3),
    ("Guarapari", "GUARAPARI", 5.0, 1, 0),
    ("Aracruz", "ARACRUZ", 4.0, 1, 2),
    ("Cachoeiro de Itapemirim", "CACHOEIRO DE ITAPEMIRIM", 4.0, 0, 0),
    ("Conceição da Barra", "CONCEIÇÃO DA BARRA", 2.0, 1, 4),
    ("", "OUTRO ESTADO", 1.0, 0, 0),
];

const CODES: [(&str, f64); 8] = [
    ("DENGUE", 18.0),
    ("INFECCAO DO TRATO URINARIO", 14.0),
    ("HIPERTENSAO ESSENCIAL", 12.0),
    ("GASTROENTERITE", 10.0),
    ("PNEUMONIA", 8.0),
    ("DIABETES MELLITUS", 6.0),
    ("ASMA", 2.0),
    ("FRATURA DO PUNHO", 0.5),
];

const SPECIALTIES: [(&str, f64); 18] = [
    ("CLINICA MEDICA", 25.0),
    ("PEDIATRIA", 15.0),
    ("ORTOPEDIA", 10.0),
    ("CARDIOLOGIA", 8.0),
    ("GINECOLOGIA", 8.0),
    ("CIRURGIA GERAL", 6.0),
    ("NEUROLOGIA", 4.0),
    ("UROLOGIA", 4.0),
    ("DERMATOLOGIA", 3.0),
    ("OFTALMOLOGIA", 3.0),
    ("PNEUMOLOGIA", 2.0),
    ("NEFROLOGIA", 2.0),
    ("ENDOCRINOLOGIA", 2.0),
    ("GASTROENTEROLOGIA", 2.0),
    ("ONCOLOGIA", 1.5),
    ("PSIQUIATRIA", 1.0),
    ("REUMATOLOGIA", 0.5),
    ("INFECTOLOGIA", 0.5),
];

const INSURERS: [(&str, f64); 6] = [
    ("SUS", 60.0),
    ("UNIMED", 15.0),
    ("BRADESCO SAUDE", 8.0),
    ("SULAMERICA", 7.0),
    ("PARTICULAR", 6.0),
    ("CASSI", 4.0),
];

struct Visit {
    date: String,
    patient: String,
    age: Option<i64>,
    sex: String,
    code: String,
    specialty: String,
    insurer: String,
    municipality: String,
}

fn generate_visits(rows: usize, rng: &mut SimpleRng) -> Vec<Visit> {
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let span_days = 578; // 2024-01-01 ..= 2025-07-31
    let patients = (rows / 3).max(1);
    let municipalities: Vec<(&str, f64)> = MUNICIPALITIES.iter().map(|m| (m.1, m.2)).collect();

    (0..rows)
        .map(|i| {
            let day = first + Days::new(rng.below(span_days) as u64);
            // A few timestamps carry a time suffix, a few are unparseable.
            let date = match i % 97 {
                0 => "sem data".to_string(),
                1..=20 => format!("{} 08:30:00", day.format("%d/%m/%Y")),
                _ => day.format("%d/%m/%Y").to_string(),
            };
            let age = (i % 211 != 0).then(|| (rng.next_f64().powf(1.3) * 95.0) as i64);
            let sex = if rng.next_f64() < 0.54 { "FEMININO" } else { "MASCULINO" };

            Visit {
                date,
                patient: format!("{:06}", rng.below(patients)),
                age,
                sex: sex.to_string(),
                code: rng.weighted(&CODES).to_string(),
                specialty: rng.weighted(&SPECIALTIES).to_string(),
                insurer: rng.weighted(&INSURERS).to_string(),
                municipality: rng.weighted(&municipalities).to_string(),
            }
        })
        .collect()
}

fn write_csv(path: &Path, visits: &[Visit]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "DT_ATENDIMENTO",
        "CD_PACIENTE",
        "IDADE",
        "SEXO",
        "DESCRICAO_CID",
        "DS_ESPECIALID",
        "NM_CONVENIO",
        "MUNICIPIO",
    ])?;
    for v in visits {
        let age = v.age.map(|a| a.to_string()).unwrap_or_default();
        writer.write_record([
            v.date.as_str(),
            v.patient.as_str(),
            age.as_str(),
            v.sex.as_str(),
            v.code.as_str(),
            v.specialty.as_str(),
            v.insurer.as_str(),
            v.municipality.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, visits: &[Visit]) -> Result<()> {
    let text = |f: fn(&Visit) -> &str| -> StringArray {
        StringArray::from(visits.iter().map(f).collect::<Vec<_>>())
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("DT_ATENDIMENTO", DataType::Utf8, false),
        Field::new("CD_PACIENTE", DataType::Utf8, false),
        Field::new("IDADE", DataType::Int64, true),
        Field::new("SEXO", DataType::Utf8, false),
        Field::new("DESCRICAO_CID", DataType::Utf8, false),
        Field::new("DS_ESPECIALID", DataType::Utf8, false),
        Field::new("NM_CONVENIO", DataType::Utf8, false),
        Field::new("MUNICIPIO", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(text(|v| v.date.as_str())),
            Arc::new(text(|v| v.patient.as_str())),
            Arc::new(Int64Array::from(visits.iter().map(|v| v.age).collect::<Vec<_>>())),
            Arc::new(text(|v| v.sex.as_str())),
            Arc::new(text(|v| v.code.as_str())),
            Arc::new(text(|v| v.specialty.as_str())),
            Arc::new(text(|v| v.insurer.as_str())),
            Arc::new(text(|v| v.municipality.as_str())),
        ],
    )
    .context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Square municipalities on a coarse grid around the Espírito Santo coast.
fn boundaries_geojson() -> serde_json::Value {
    let features: Vec<_> = MUNICIPALITIES
        .iter()
        .filter(|m| !m.0.is_empty())
        .map(|&(name, _, _, col, row)| {
            let lon = -41.6 + f64::from(col) * 0.45;
            let lat = -21.0 + f64::from(row) * 0.6;
            json!({
                "type": "Feature",
                "properties": { "name": name },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [lon, lat], [lon + 0.4, lat], [lon + 0.4, lat + 0.55],
                        [lon, lat + 0.55], [lon, lat]
                    ]]
                }
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let mut rng = SimpleRng::new(42);
    let visits = generate_visits(args.rows, &mut rng);

    let csv_path = args.out.join("visits.csv");
    write_csv(&csv_path, &visits)?;
    let parquet_path = args.out.join("visits.parquet");
    write_parquet(&parquet_path, &visits)?;
    let geo_path = args.out.join("boundaries.geojson");
    std::fs::write(&geo_path, serde_json::to_string_pretty(&boundaries_geojson())?)
        .with_context(|| format!("writing {}", geo_path.display()))?;

    println!(
        "Wrote {} visits to {} and {}, boundaries to {}",
        visits.len(),
        csv_path.display(),
        parquet_path.display(),
        geo_path.display()
    );
    Ok(())
}
