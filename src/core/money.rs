use rust_decimal::{Decimal, RoundingStrategy};

/// Round to cents, half away from zero, always at scale 2 so every reported
/// figure serializes as "1234.50" rather than "1234.5" or "1234". Every
/// multiplication of a money value goes through here so repeated runs produce
/// identical figures.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents
}

/// Apply a rate to an amount and round to cents
pub fn apply_rate(amount: Decimal, rate: Decimal) -> Decimal {
    round_money(amount * rate)
}

/// Format as "$1,234.56" (negative as "-$1,234.56")
pub fn format_aud(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${grouped}.{cents}")
    } else {
        format!("${grouped}.{cents}")
    }
}

/// Format a rate as a percentage, e.g. 0.5 -> "50%", 1/3 -> "33.33%"
pub fn format_percent(rate: Decimal) -> String {
    let pct = (rate * Decimal::ONE_HUNDRED).round_dp(2).normalize();
    format!("{pct}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn money_is_always_at_cent_scale() {
        assert_eq!(round_money(dec!(120000)).to_string(), "120000.00");
        assert_eq!(round_money(dec!(60000.0)).to_string(), "60000.00");
        assert_eq!(round_money(Decimal::ZERO).to_string(), "0.00");
        assert_eq!(apply_rate(dec!(1000), Decimal::ONE / dec!(3)).to_string(), "333.33");
    }

    #[test]
    fn apply_rate_rounds_once() {
        assert_eq!(apply_rate(dec!(100.01), dec!(0.5)), dec!(50.01));
        assert_eq!(apply_rate(dec!(1000), Decimal::ONE / dec!(3)), dec!(333.33));
    }

    #[test]
    fn format_with_thousands_separators() {
        assert_eq!(format_aud(dec!(0)), "$0.00");
        assert_eq!(format_aud(dec!(999.5)), "$999.50");
        assert_eq!(format_aud(dec!(1000)), "$1,000.00");
        assert_eq!(format_aud(dec!(120000)), "$120,000.00");
        assert_eq!(format_aud(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(format_aud(dec!(-2500)), "-$2,500.00");
    }

    #[test]
    fn format_percentages() {
        assert_eq!(format_percent(dec!(0.5)), "50%");
        assert_eq!(format_percent(Decimal::ONE / dec!(3)), "33.33%");
    }
}
