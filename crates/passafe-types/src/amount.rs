use crate::constants::ETH_DECIMALS;
use crate::crypto::Uint256;
use crate::error::{PassafeError, PassafeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    pub raw: u128,
    pub decimals: u8,
}

impl Default for TokenAmount {
    fn default() -> Self {
        Self::zero(ETH_DECIMALS)
    }
}

impl TokenAmount {
    pub fn from_raw(raw: u128, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Parses `"1.5"` style amounts into base units, like `parseEther` /
    /// `parseUnits`.
    pub fn from_decimal(s: &str, decimals: u8) -> PassafeResult<Self> {
        let s = s.trim();
        let (whole_str, frac_str) = match s.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (s, None),
        };
        if whole_str.is_empty() && frac_str.map_or(true, str::is_empty) {
            return Err(PassafeError::MalformedEncoding("Empty amount".into()));
        }

        let whole: u128 = if whole_str.is_empty() {
            0
        } else {
            whole_str
                .parse()
                .map_err(|_| PassafeError::MalformedEncoding(format!("Invalid number: {s}")))?
        };

        let frac = match frac_str {
            Some(frac_str) if !frac_str.is_empty() => {
                if frac_str.len() > decimals as usize {
                    return Err(PassafeError::MalformedEncoding("Too many decimal places".into()));
                }
                if !frac_str.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(PassafeError::MalformedEncoding(format!("Invalid fraction: {s}")));
                }
                let padded = format!("{:0<width$}", frac_str, width = decimals as usize);
                padded
                    .parse::<u128>()
                    .map_err(|_| PassafeError::MalformedEncoding("Invalid fraction".into()))?
            }
            _ => 0,
        };

        let multiplier = 10u128
            .checked_pow(decimals as u32)
            .ok_or_else(|| PassafeError::MalformedEncoding("Too many decimals".into()))?;
        let raw = whole
            .checked_mul(multiplier)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| PassafeError::MalformedEncoding("Amount overflow".into()))?;

        Ok(Self { raw, decimals })
    }

    pub fn ether(amount: &str) -> PassafeResult<Self> {
        Self::from_decimal(amount, ETH_DECIMALS)
    }

    pub fn to_decimal(&self) -> String {
        let (whole, frac) = match 10u128.checked_pow(self.decimals as u32) {
            Some(multiplier) => (self.raw / multiplier, self.raw % multiplier),
            // 10^decimals exceeds u128::MAX, so every raw value is a fraction.
            None => (0, self.raw),
        };

        if frac == 0 {
            whole.to_string()
        } else {
            let frac_str = format!("{:0>width$}", frac, width = self.decimals as usize);
            let trimmed = frac_str.trim_end_matches('0');
            format!("{}.{}", whole, trimmed)
        }
    }

    pub fn zero(decimals: u8) -> Self {
        Self { raw: 0, decimals }
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    pub fn to_uint(&self) -> Uint256 {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&self.raw.to_be_bytes());
        Uint256(word)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal() {
        let amount = TokenAmount::ether("1.5").unwrap();
        assert_eq!(amount.raw, 1_500_000_000_000_000_000);
        assert_eq!(amount.to_decimal(), "1.5");

        let usdc = TokenAmount::from_decimal("0.000001", 6).unwrap();
        assert_eq!(usdc.raw, 1);

        assert_eq!(TokenAmount::from_decimal("42", 0).unwrap().raw, 42);
        assert_eq!(TokenAmount::ether(".25").unwrap().to_decimal(), "0.25");
    }

    #[test]
    fn test_from_decimal_rejects_bad_input() {
        assert!(TokenAmount::ether("").is_err());
        assert!(TokenAmount::ether("1.2.3").is_err());
        assert!(TokenAmount::ether("abc").is_err());
        assert!(TokenAmount::from_decimal("1.1234567", 6).is_err());
        assert!(TokenAmount::from_decimal("1.-5", 6).is_err());
    }

    #[test]
    fn test_to_decimal_with_wide_decimals() {
        let tiny = TokenAmount::from_raw(5, 40);
        assert_eq!(tiny.to_string(), format!("0.{}5", "0".repeat(39)));

        let max = TokenAmount::from_raw(u128::MAX, u8::MAX);
        assert!(max.to_decimal().starts_with("0.000"));
        assert!(max.to_decimal().ends_with("211455"));
        assert_eq!(TokenAmount::from_raw(0, 60).to_decimal(), "0");
    }

    #[test]
    fn test_to_uint() {
        let amount = TokenAmount::from_raw(0x0102, 18);
        assert_eq!(amount.to_uint(), Uint256::from_u64(0x0102));
    }
}
