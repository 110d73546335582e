use std::sync::Arc;

use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use audit_sampler::format;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROWS: usize = 2_000;

/// Booking categories and their relative weight.
const CATEGORIES: [(&str, u32); 4] = [("DT", 50), ("KR", 30), ("AB", 15), ("SO", 5)];
const ACCOUNTS: [&str; 6] = ["1200", "1400", "1600", "3300", "4400", "8400"];
const COUNTERPARTIES: [&str; 8] = [
    "Müller GmbH",
    "Schmidt & Söhne",
    "Nordbank AG",
    "Office Supplies KG",
    "Stadtwerke",
    "Travel Partner",
    "Consulting Group",
    "Private",
];

struct Booking {
    id: String,
    date: NaiveDate,
    account: &'static str,
    category: &'static str,
    amount: f64,
    counterparty: &'static str,
}

fn pick_category(rng: &mut StdRng) -> &'static str {
    let total: u32 = CATEGORIES.iter().map(|(_, w)| w).sum();
    let mut roll = rng.random_range(0..total);
    for (name, weight) in CATEGORIES {
        if roll < weight {
            return name;
        }
        roll -= weight;
    }
    CATEGORIES[0].0
}

/// Log-uniform amounts between 10 and 250 000, rounded to cents.
fn random_amount(rng: &mut StdRng) -> f64 {
    let exp = rng.random_range(1.0f64..5.4);
    (10f64.powf(exp) * 100.0).round() / 100.0
}

fn main() {
    let mut rng = StdRng::seed_from_u64(42);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid start date");

    let bookings: Vec<Booking> = (0..ROWS)
        .map(|i| Booking {
            id: format!("B-{:05}", i + 1),
            date: start + Duration::days(rng.random_range(0..366)),
            account: ACCOUNTS[rng.random_range(0..ACCOUNTS.len())],
            category: pick_category(&mut rng),
            amount: random_amount(&mut rng),
            counterparty: COUNTERPARTIES[rng.random_range(0..COUNTERPARTIES.len())],
        })
        .collect();

    // ---- CSV, European notation ----
    let csv_path = "sample_bookings.csv";
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(csv_path)
        .expect("Failed to create CSV file");
    writer
        .write_record([
            "booking_id",
            "booking_date",
            "account",
            "category",
            "amount",
            "counterparty",
        ])
        .expect("Failed to write CSV header");
    for b in &bookings {
        writer
            .write_record([
                b.id.clone(),
                format::date(b.date),
                b.account.to_string(),
                b.category.to_string(),
                format::number_grouped(b.amount, 2),
                b.counterparty.to_string(),
            ])
            .expect("Failed to write CSV row");
    }
    writer.flush().expect("Failed to flush CSV");

    // ---- Parquet, typed columns ----
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
    let schema = Arc::new(Schema::new(vec![
        Field::new("booking_id", DataType::Utf8, false),
        Field::new("booking_date", DataType::Date32, false),
        Field::new("account", DataType::Utf8, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("amount", DataType::Float64, false),
        Field::new("counterparty", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(bookings.iter().map(|b| b.id.as_str()))),
            Arc::new(Date32Array::from_iter_values(
                bookings.iter().map(|b| (b.date - epoch).num_days() as i32),
            )),
            Arc::new(StringArray::from_iter_values(bookings.iter().map(|b| b.account))),
            Arc::new(StringArray::from_iter_values(bookings.iter().map(|b| b.category))),
            Arc::new(Float64Array::from_iter_values(bookings.iter().map(|b| b.amount))),
            Arc::new(StringArray::from_iter_values(bookings.iter().map(|b| b.counterparty))),
        ],
    )
    .expect("Failed to create RecordBatch");

    let parquet_path = "sample_bookings.parquet";
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!("Wrote {ROWS} bookings to {csv_path} and {parquet_path}");
}
