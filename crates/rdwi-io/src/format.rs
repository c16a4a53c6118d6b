//! Deterministic textual formatting of floating-point values.
//!
//! Both serializers write every floating value through this one function so
//! the output is byte-reproducible and round-trips 64-bit floats losslessly
//! through text.

/// Format a float as 17-significant-digit scientific notation with a
/// C-style exponent (`1.0000000000000000e+03`).
pub fn fmt_f64(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{value:.16e}");
    let (mantissa, exponent) = formatted
        .split_once('e')
        .expect("{:.16e} always yields an exponent");
    let exponent: i32 = exponent.parse().expect("exponent is a valid integer");
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_whole_numbers() {
        assert_eq!(fmt_f64(1000.0), "1.0000000000000000e+03");
        assert_eq!(fmt_f64(0.0), "0.0000000000000000e+00");
        assert_eq!(fmt_f64(1.0), "1.0000000000000000e+00");
    }

    #[test]
    fn test_fmt_negative_and_fractional() {
        assert_eq!(fmt_f64(-1000.0), "-1.0000000000000000e+03");
        assert_eq!(fmt_f64(0.5), "5.0000000000000000e-01");
        assert_eq!(fmt_f64(2.5), "2.5000000000000000e+00");
    }

    #[test]
    fn test_fmt_roundtrips_doubles() {
        for value in [0.2, 1.0 / 3.0, -9.87654321e-12, 3.14159265358979, 2.0f64.sqrt()] {
            let parsed: f64 = fmt_f64(value).parse().unwrap();
            assert_eq!(parsed, value, "lossy for {value}");
        }
    }

    #[test]
    fn test_fmt_large_exponents_keep_all_digits() {
        assert_eq!(fmt_f64(1e100), "1.0000000000000000e+100");
        assert_eq!(fmt_f64(1e-100), "1.0000000000000000e-100");
    }
}
