use rust_decimal::Decimal;

/// Label printed wherever a savings rate has no defined value.
pub const NOT_APPLICABLE: &str = "N/A";

/// Format a decimal as a dollar amount with thousands separators: $1,234.56
pub fn money(val: Decimal) -> String {
    let negative = val.is_sign_negative() && !val.is_zero();
    let cents = fixed2(val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Plain two-decimal rendering used by the CSV export: 1234.50
pub fn fixed2(val: Decimal) -> String {
    format!("{val:.2}")
}

/// Percentage with two decimals, or "N/A" when undefined.
pub fn pct(val: Option<Decimal>) -> String {
    match val {
        Some(v) => format!("{v:.2}%"),
        None => NOT_APPLICABLE.to_string(),
    }
}
