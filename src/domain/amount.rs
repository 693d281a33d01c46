//! Ether amount parsing and formatting.

use color_eyre::eyre::{Result, eyre};

/// Decimal places of one ether expressed in wei.
pub const ETHER_DECIMALS: usize = 18;

pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Parse a decimal ether amount (e.g. `"0.5"`) into wei.
pub fn parse_ether(s: &str) -> Result<u128> {
    let s = s.trim();
    if s.is_empty() {
        return Err(eyre!("Amount is empty"));
    }

    let mut parts = s.split('.');
    let int = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");

    if parts.next().is_some() {
        return Err(eyre!("Invalid amount format"));
    }
    if frac.len() > ETHER_DECIMALS {
        return Err(eyre!("Too many decimal places (max {})", ETHER_DECIMALS));
    }
    if int.is_empty() && frac.is_empty() {
        return Err(eyre!("Invalid amount format"));
    }
    if !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(eyre!("Invalid amount format"));
    }

    let digits = format!("{}{:0<width$}", int, frac, width = ETHER_DECIMALS);
    digits
        .parse::<u128>()
        .map_err(|_| eyre!("Amount is too large"))
}

/// Exact ether representation of `wei`, trailing zeros trimmed.
pub fn format_ether(wei: u128) -> String {
    let int = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return format!("{}.0", int);
    }
    let frac = format!("{:0>width$}", frac, width = ETHER_DECIMALS);
    format!("{}.{}", int, frac.trim_end_matches('0'))
}

/// Balance display with four decimal places, rounded half-up.
pub fn format_balance(wei: u128) -> String {
    const UNIT: u128 = WEI_PER_ETHER / 10_000;
    let scaled = wei.saturating_add(UNIT / 2) / UNIT;
    format!("{}.{:04}", scaled / 10_000, scaled % 10_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ether() {
        assert_eq!(parse_ether("1").unwrap(), WEI_PER_ETHER);
        assert_eq!(parse_ether("0.5").unwrap(), WEI_PER_ETHER / 2);
        assert_eq!(parse_ether(".25").unwrap(), WEI_PER_ETHER / 4);
        assert_eq!(parse_ether("2.").unwrap(), 2 * WEI_PER_ETHER);
        assert_eq!(parse_ether("0.000000000000000001").unwrap(), 1);
        assert_eq!(parse_ether(" 10 ").unwrap(), 10 * WEI_PER_ETHER);
    }

    #[test]
    fn test_parse_ether_rejects_invalid() {
        assert!(parse_ether("").is_err());
        assert!(parse_ether(".").is_err());
        assert!(parse_ether("1.2.3").is_err());
        assert!(parse_ether("-1").is_err());
        assert!(parse_ether("1e18").is_err());
        assert!(parse_ether("0.0000000000000000001").is_err());
        assert!(parse_ether("999999999999999999999999999999").is_err());
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(0), "0.0");
        assert_eq!(format_ether(WEI_PER_ETHER), "1.0");
        assert_eq!(format_ether(WEI_PER_ETHER + WEI_PER_ETHER / 2), "1.5");
        assert_eq!(format_ether(1), "0.000000000000000001");
    }

    #[test]
    fn test_format_balance_rounds() {
        assert_eq!(format_balance(0), "0.0000");
        assert_eq!(format_balance(12 * WEI_PER_ETHER), "12.0000");
        assert_eq!(format_balance(parse_ether("1.23456").unwrap()), "1.2346");
        assert_eq!(format_balance(parse_ether("1.23454").unwrap()), "1.2345");
        assert_eq!(format_balance(parse_ether("0.99999").unwrap()), "1.0000");
    }
}
