/// Kubernetes resource quantity parsing
///
/// Grammar accepted (same as the Kubernetes API server):
///
/// ```text
/// <quantity>        ::= <signedNumber><suffix>
/// <signedNumber>    ::= <number> | +<number> | -<number>
/// <number>          ::= <digits> | <digits>.<digits> | <digits>. | .<digits>
/// <suffix>          ::= <binarySI> | <decimalExponent> | <decimalSI>
/// <binarySI>        ::= Ki | Mi | Gi | Ti | Pi | Ei
/// <decimalSI>       ::= m | "" | k | M | G | T | P | E | n | u
/// <decimalExponent> ::= "e" <signedInteger> | "E" <signedInteger>
/// ```
use std::fmt;
use std::str::FromStr;

/// How the suffix of a quantity scales its number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityFormat {
    /// Powers of 1024 (`Ki`, `Mi`, ...)
    BinarySI,
    /// Powers of 1000 (`m`, `k`, `M`, ...)
    DecimalSI,
    /// Explicit exponent (`1e3`)
    DecimalExponent,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantities must match the regular expression '^([+-]?[0-9.]+)([eEinumkKMGTP]*[-+]?[0-9]*)$'")]
    Format,

    #[error("unable to parse quantity's suffix: {0:?}")]
    Suffix(String),
}

/// A parsed resource quantity such as `500m`, `8Gi` or `1e3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantity {
    raw: String,
    negative: bool,
    zero: bool,
    format: QuantityFormat,
    /// Power of the base (1000 or 1024, or 10 for exponents) the suffix stands for
    exponent: i32,
}

impl Quantity {
    /// Parse a quantity string
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        if s.is_empty() {
            return Err(QuantityError::Format);
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        let negative = match bytes[0] {
            b'-' => {
                pos += 1;
                true
            }
            b'+' => {
                pos += 1;
                false
            }
            _ => false,
        };

        let int_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let int_digits = &s[int_start..pos];

        let mut frac_digits = "";
        if pos < bytes.len() && bytes[pos] == b'.' {
            pos += 1;
            let frac_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            frac_digits = &s[frac_start..pos];
        }

        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(QuantityError::Format);
        }

        let zero = int_digits
            .bytes()
            .chain(frac_digits.bytes())
            .all(|b| b == b'0');

        let (format, exponent) = parse_suffix(&s[pos..])?;

        Ok(Self {
            raw: s.to_string(),
            negative,
            zero,
            format,
            exponent,
        })
    }

    /// -1, 0 or 1 depending on the sign of the quantity
    pub fn sign(&self) -> i32 {
        if self.zero {
            0
        } else if self.negative {
            -1
        } else {
            1
        }
    }

    pub fn format(&self) -> QuantityFormat {
        self.format
    }

    /// Power of the suffix base, e.g. 3 for `Gi` (1024^3) or -3 for `m` (1000^-1 == 10^-3)
    pub fn exponent(&self) -> i32 {
        self.exponent
    }
}

fn parse_suffix(suffix: &str) -> Result<(QuantityFormat, i32), QuantityError> {
    let known = match suffix {
        "Ki" => Some((QuantityFormat::BinarySI, 1)),
        "Mi" => Some((QuantityFormat::BinarySI, 2)),
        "Gi" => Some((QuantityFormat::BinarySI, 3)),
        "Ti" => Some((QuantityFormat::BinarySI, 4)),
        "Pi" => Some((QuantityFormat::BinarySI, 5)),
        "Ei" => Some((QuantityFormat::BinarySI, 6)),
        "n" => Some((QuantityFormat::DecimalSI, -9)),
        "u" => Some((QuantityFormat::DecimalSI, -6)),
        "m" => Some((QuantityFormat::DecimalSI, -3)),
        "" => Some((QuantityFormat::DecimalSI, 0)),
        "k" => Some((QuantityFormat::DecimalSI, 3)),
        "M" => Some((QuantityFormat::DecimalSI, 6)),
        "G" => Some((QuantityFormat::DecimalSI, 9)),
        "T" => Some((QuantityFormat::DecimalSI, 12)),
        "P" => Some((QuantityFormat::DecimalSI, 15)),
        "E" => Some((QuantityFormat::DecimalSI, 18)),
        _ => None,
    };
    if let Some(found) = known {
        return Ok(found);
    }

    // Decimal exponent: e/E followed by a signed integer
    let rest = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))
        .ok_or_else(|| QuantityError::Suffix(suffix.to_string()))?;
    let digits = rest.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(rest);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuantityError::Suffix(suffix.to_string()));
    }
    let exponent = rest
        .parse::<i32>()
        .map_err(|_| QuantityError::Suffix(suffix.to_string()))?;

    Ok((QuantityFormat::DecimalExponent, exponent))
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
