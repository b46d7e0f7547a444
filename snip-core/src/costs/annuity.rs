//! Time value of money

/// Present value of one currency unit paid at the end of each of `years`
/// years, discounted at `rate` (fraction). Degrades to `years` when the
/// rate is zero.
pub fn present_value_factor(rate: f64, years: u32) -> f64 {
    let n = f64::from(years);
    if rate.abs() < 1e-12 {
        return n;
    }
    (1.0 - (1.0 + rate).powf(-n)) / rate
}

/// Equivalent yearly payment of an investment `amount` over `years` years.
/// Zero for a zero lifespan.
pub fn annuity(amount: f64, rate: f64, years: u32) -> f64 {
    if years == 0 {
        return 0.0;
    }
    amount / present_value_factor(rate, years)
}
