use std::path::Path;

use audit_sampler::export;
use audit_sampler::format;
use audit_sampler::{
    load_file, CellValue, DimensionalFilter, LoadOptions, SampleSize, SamplingConfig,
    SamplingRule, Session, Stratum,
};

const CATEGORIES: [&str; 3] = ["DT", "KR", "AB"];

/// 100 bookings in European notation, semicolon separated.
fn write_bookings(path: &Path) {
    let mut text = String::from("booking_id;booking_date;category;amount\n");
    for i in 0..100u32 {
        let amount = f64::from((i * 53) % 2500) + 0.5;
        text.push_str(&format!(
            "B-{:03};{:02}.{:02}.2024;{};{}\n",
            i + 1,
            i % 28 + 1,
            i % 12 + 1,
            CATEGORIES[i as usize % 3],
            format::number_grouped(amount, 2),
        ));
    }
    std::fs::write(path, text).unwrap();
}

fn config() -> SamplingConfig {
    let mut config = SamplingConfig::new("large debits");
    config.filters = vec![DimensionalFilter::range("amount", Some(1000.0), None)];
    config.rules = vec![
        SamplingRule::new("DT", Stratum::value("category", "DT"), SampleSize::Count(5)),
        SamplingRule::new("missing", Stratum::value("category", "XX"), SampleSize::Count(5)),
    ];
    config.seed = Some(42);
    config
}

#[test]
fn sample_from_csv_is_filtered_stratified_and_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("bookings.csv");
    write_bookings(&data);

    let dataset = load_file(&data, &LoadOptions::default()).unwrap();
    assert_eq!(dataset.len(), 100);

    let mut session = Session::new(dataset.clone());
    session.apply_config(config()).unwrap();
    let first = session.run(Some(42)).unwrap().clone();

    let dt = first.stratum("DT").unwrap();
    assert_eq!(dt.len(), 5);
    for row in &dt.rows {
        assert_eq!(row.record.get("category"), Some(&CellValue::Text("DT".into())));
        assert!(row.record.get("amount").and_then(CellValue::as_f64).unwrap() >= 1000.0);
    }
    assert!(dt.rows.windows(2).all(|w| w[0].row_index < w[1].row_index));

    let missing = first.stratum("missing").unwrap();
    assert_eq!(missing.candidates, 0);
    assert!(missing.is_empty());
    assert_eq!(first.summary.total_sampled, 5);

    let mut again = Session::new(dataset);
    again.apply_config(config()).unwrap();
    assert_eq!(again.run(Some(42)).unwrap(), &first);
}

#[test]
fn config_file_and_exports_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("bookings.csv");
    let config_path = dir.path().join("sampling.json");
    write_bookings(&data);
    config().save(&config_path).unwrap();

    let dataset = load_file(&data, &LoadOptions::default()).unwrap();
    let loaded = SamplingConfig::load(&config_path).unwrap();
    let seed = loaded.seed;
    let mut session = Session::new(dataset);
    session.apply_config(loaded).unwrap();
    let result = session.run(seed).unwrap();
    assert_eq!(result.seed, 42);

    let out = dir.path().join("sample.csv");
    export::write_csv(result, &out, b';').unwrap();
    let exported = load_file(&out, &LoadOptions::default()).unwrap();
    assert_eq!(exported.len(), 5);
    assert!(exported.column("rule").is_some());

    let split = export::write_csv_by_rule(result, &dir.path().join("split"), b';').unwrap();
    assert_eq!(split.len(), 1);
    assert!(split[0].ends_with("DT.csv"));

    let json = dir.path().join("sample.json");
    export::write_json(result, &json).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(value["seed"], 42);
    assert_eq!(value["summary"]["total_sampled"], 5);
}

#[test]
fn percentage_rule_on_empty_filter_result_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("bookings.csv");
    write_bookings(&data);

    let mut session = Session::new(load_file(&data, &LoadOptions::default()).unwrap());
    session
        .add_filter(DimensionalFilter::range("amount", Some(1_000_000.0), None))
        .unwrap();
    session
        .add_rule(SamplingRule::new("tenth", Stratum::All, SampleSize::Percentage(10.0)))
        .unwrap();

    let err = session.run(Some(1)).unwrap_err();
    assert!(err.to_string().contains("tenth"));
}
