//! European number and date rendering used for display and export.

use chrono::NaiveDate;

/// `1234.5` → `1.234,50` (with `decimals = 2`).
pub fn number_grouped(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int, frac) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));

    let mut grouped = String::with_capacity(rendered.len() + int.len() / 3 + 1);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if !frac.is_empty() {
        grouped.push(',');
        grouped.push_str(frac);
    }

    let is_zero = rendered.bytes().all(|b| b == b'0' || b == b'.');
    if value.is_sign_negative() && !is_zero {
        grouped.insert(0, '-');
    }
    grouped
}

/// Full precision with a decimal comma and no grouping: `1234.56` → `1234,56`.
/// This is the notation written to export files so they load back as numbers.
pub fn number_plain(value: f64) -> String {
    value.to_string().replace('.', ",")
}

/// `DD.MM.YYYY`
pub fn date(value: NaiveDate) -> String {
    value.format("%d.%m.%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping() {
        assert_eq!(number_grouped(1234.5, 2), "1.234,50");
        assert_eq!(number_grouped(1_234_567.891, 2), "1.234.567,89");
        assert_eq!(number_grouped(999.0, 0), "999");
        assert_eq!(number_grouped(-1000.0, 2), "-1.000,00");
        assert_eq!(number_grouped(-0.001, 2), "0,00");
    }

    #[test]
    fn plain_and_date() {
        assert_eq!(number_plain(1234.56), "1234,56");
        assert_eq!(number_plain(2000.0), "2000");
        assert_eq!(date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()), "05.01.2024");
    }
}
