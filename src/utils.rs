// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as u64
}

/// Format an integer amount in smallest units as a decimal string,
/// e.g. (1_500_000_000, 9) -> "1.5".
pub fn format_decimal_amount(amount: u64, decimals: u8) -> String {
    // Past 38 decimals the scale overflows u128; any u64 amount is then
    // purely fractional.
    let (whole, frac) = match 10u128.checked_pow(decimals as u32) {
        Some(scale) => (amount as u128 / scale, amount as u128 % scale),
        None => (0, amount as u128),
    };
    if frac == 0 {
        format!("{}", whole)
    } else {
        let frac_str = format!("{:0width$}", frac, width = decimals as usize)
            .trim_end_matches('0')
            .to_string();
        format!("{}.{}", whole, frac_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        // Sanity bound: after 2020-01-01 and monotone-ish across two calls
        let a = now_ms();
        let b = now_ms();
        assert!(a > 1_577_836_800_000);
        assert!(b >= a);
    }

    #[test]
    fn test_format_decimal_amount() {
        assert_eq!(format_decimal_amount(0, 9), "0");
        assert_eq!(format_decimal_amount(1_000_000_000, 9), "1");
        assert_eq!(format_decimal_amount(1_500_000_000, 9), "1.5");
        assert_eq!(format_decimal_amount(123, 9), "0.000000123");
        assert_eq!(format_decimal_amount(1_000_001, 6), "1.000001");
        assert_eq!(format_decimal_amount(42, 0), "42");
    }

    #[test]
    fn test_format_decimal_amount_extreme_decimals() {
        // Scales past u64 (and past u128) must not overflow
        assert_eq!(
            format_decimal_amount(1, 20),
            "0.00000000000000000001"
        );
        assert_eq!(format_decimal_amount(0, 40), "0");
        let formatted = format_decimal_amount(u64::MAX, u8::MAX);
        assert!(formatted.starts_with("0."));
        assert!(formatted.ends_with("18446744073709551615"));
    }
}
