//! NUMERIC in its binary wire form: a header of digit count, weight, sign
//! and display scale, then base-10000 digits, most significant first.
//!
//! Values travel as decimal text on both sides, so any precision the
//! server accepts survives the round trip.

use std::fmt::{self, Write};
use std::iter;

use bytes::{Buf, BufMut, BytesMut};
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};

use super::connection::BoxError;

const SIGN_POSITIVE: u16 = 0x0000;
const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_INFINITY: u16 = 0xD000;
const SIGN_NEGATIVE_INFINITY: u16 = 0xF000;

const MAX_SCALE: u16 = 0x3FFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PgNumeric {
    Number {
        negative: bool,
        /// Digits shown after the decimal point.
        scale: u16,
        /// Power of 10000 of the first digit.
        weight: i16,
        digits: Vec<i16>,
    },
    NotANumber,
    Infinity {
        negative: bool,
    },
}

impl PgNumeric {
    /// Parses plain decimal text such as `-12.50`. Exponents are rejected.
    pub(crate) fn parse(text: &str) -> Result<Self, BoxError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("nan") {
            return Ok(PgNumeric::NotANumber);
        }

        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        if unsigned.eq_ignore_ascii_case("infinity") || unsigned.eq_ignore_ascii_case("inf") {
            return Ok(PgNumeric::Infinity { negative });
        }

        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(format!("invalid numeric `{}`", text).into());
        }

        let scale = u16::try_from(frac_part.len())
            .ok()
            .filter(|scale| *scale <= MAX_SCALE)
            .ok_or("numeric scale out of range")?;

        // Whole base-10000 groups on both sides of the point.
        let int_part = int_part.trim_start_matches('0');
        let int_pad = (4 - int_part.len() % 4) % 4;
        let frac_pad = (4 - frac_part.len() % 4) % 4;
        let decimal: Vec<u8> = iter::repeat(b'0')
            .take(int_pad)
            .chain(int_part.bytes())
            .chain(frac_part.bytes())
            .chain(iter::repeat(b'0').take(frac_pad))
            .map(|b| b - b'0')
            .collect();

        let mut digits: Vec<i16> = decimal
            .chunks(4)
            .map(|chunk| chunk.iter().fold(0i16, |acc, &d| acc * 10 + i16::from(d)))
            .collect();
        let mut weight = ((int_pad + int_part.len()) / 4) as i64 - 1;

        let leading = digits.iter().take_while(|d| **d == 0).count();
        digits.drain(..leading);
        weight -= leading as i64;
        while digits.last() == Some(&0) {
            digits.pop();
        }
        if digits.is_empty() {
            weight = 0;
        }

        let weight = i16::try_from(weight).map_err(|_| "numeric out of range")?;
        if i16::try_from(digits.len()).is_err() {
            return Err("numeric out of range".into());
        }

        Ok(PgNumeric::Number {
            negative: negative && !digits.is_empty(),
            scale,
            weight,
            digits,
        })
    }

    pub(crate) fn encode(&self, out: &mut BytesMut) {
        let special = |out: &mut BytesMut, sign: u16| {
            out.put_i16(0);
            out.put_i16(0);
            out.put_u16(sign);
            out.put_u16(0);
        };

        match self {
            PgNumeric::Number {
                negative,
                scale,
                weight,
                digits,
            } => {
                // `parse` keeps the digit count within i16
                out.put_i16(digits.len() as i16);
                out.put_i16(*weight);
                out.put_u16(if *negative { SIGN_NEGATIVE } else { SIGN_POSITIVE });
                out.put_u16(*scale);
                for digit in digits {
                    out.put_i16(*digit);
                }
            }
            PgNumeric::NotANumber => special(out, SIGN_NAN),
            PgNumeric::Infinity { negative: false } => special(out, SIGN_INFINITY),
            PgNumeric::Infinity { negative: true } => special(out, SIGN_NEGATIVE_INFINITY),
        }
    }

    pub(crate) fn from_bytes(mut raw: &[u8]) -> Result<Self, BoxError> {
        if raw.len() < 8 {
            return Err("numeric value is truncated".into());
        }
        let count = raw.get_i16();
        let weight = raw.get_i16();
        let sign = raw.get_u16();
        let scale = raw.get_u16();

        let negative = match sign {
            SIGN_POSITIVE => false,
            SIGN_NEGATIVE => true,
            SIGN_NAN => return Ok(PgNumeric::NotANumber),
            SIGN_INFINITY => return Ok(PgNumeric::Infinity { negative: false }),
            SIGN_NEGATIVE_INFINITY => return Ok(PgNumeric::Infinity { negative: true }),
            other => return Err(format!("invalid numeric sign 0x{:04x}", other).into()),
        };

        let count = usize::try_from(count).map_err(|_| "negative numeric digit count")?;
        if raw.len() != count * 2 {
            return Err("numeric digit count does not match its length".into());
        }
        let digits = (0..count).map(|_| raw.get_i16()).collect();

        Ok(PgNumeric::Number {
            negative,
            scale: scale & MAX_SCALE,
            weight,
            digits,
        })
    }
}

impl fmt::Display for PgNumeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (negative, scale, weight, digits) = match self {
            PgNumeric::Number {
                negative,
                scale,
                weight,
                digits,
            } => (*negative, *scale, i32::from(*weight), digits),
            PgNumeric::NotANumber => return f.write_str("NaN"),
            PgNumeric::Infinity { negative: false } => return f.write_str("Infinity"),
            PgNumeric::Infinity { negative: true } => return f.write_str("-Infinity"),
        };

        // Stripped leading and trailing zero groups read back as zero.
        let digit = |position: i32| {
            usize::try_from(position)
                .ok()
                .and_then(|p| digits.get(p))
                .copied()
                .unwrap_or(0)
        };

        if negative {
            f.write_char('-')?;
        }
        if weight < 0 {
            f.write_char('0')?;
        } else {
            write!(f, "{}", digit(0))?;
            for position in 1..=weight {
                write!(f, "{:04}", digit(position))?;
            }
        }

        if scale > 0 {
            let scale = usize::from(scale);
            let mut fraction = String::with_capacity(scale + 4);
            let mut position = weight + 1;
            while fraction.len() < scale {
                write!(fraction, "{:04}", digit(position))?;
                position += 1;
            }
            fraction.truncate(scale);
            write!(f, ".{}", fraction)?;
        }
        Ok(())
    }
}

impl ToSql for PgNumeric {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        self.encode(out);
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        PgNumeric::from_bytes(raw)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(text: &str) -> BytesMut {
        let mut out = BytesMut::new();
        PgNumeric::parse(text).unwrap().encode(&mut out);
        out
    }

    fn read_back(text: &str) -> String {
        PgNumeric::from_bytes(&wire(text)).unwrap().to_string()
    }

    #[test]
    fn test_digits_are_grouped_in_base_10000() {
        assert_eq!(
            PgNumeric::parse("12345.6").unwrap(),
            PgNumeric::Number {
                negative: false,
                scale: 1,
                weight: 1,
                digits: vec![1, 2345, 6000],
            }
        );
        assert_eq!(
            &wire("12345.6")[..],
            &[0, 3, 0, 1, 0, 0, 0, 1, 0, 1, 0x09, 0x29, 0x17, 0x70]
        );
        assert_eq!(
            PgNumeric::parse("-0.00001").unwrap(),
            PgNumeric::Number {
                negative: true,
                scale: 5,
                weight: -2,
                digits: vec![1000],
            }
        );
    }

    #[test]
    fn test_precision_beyond_28_digits_survives() {
        for text in [
            "0.12345678901234567890123456789",
            "123456789012345678901234567890.5",
            "-98765432109876543210987654321098765432.000100",
        ] {
            assert_eq!(read_back(text), text);
        }
    }

    #[test]
    fn test_zero_and_scale_padding() {
        assert_eq!(read_back("0"), "0");
        assert_eq!(read_back("-0.00"), "0.00");
        assert_eq!(read_back("10000"), "10000");
        assert_eq!(read_back("+.5"), "0.5");
        assert_eq!(read_back("007.250"), "7.250");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(read_back("NaN"), "NaN");
        assert_eq!(read_back("-Infinity"), "-Infinity");
        assert_eq!(PgNumeric::parse("inf").unwrap(), PgNumeric::Infinity { negative: false });
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        assert!(PgNumeric::parse("1e5").is_err());
        assert!(PgNumeric::parse("1.2.3").is_err());
        assert!(PgNumeric::parse("-").is_err());
        assert!(PgNumeric::parse("12a").is_err());
        assert!(PgNumeric::from_bytes(&[0, 1, 0, 0]).is_err());
        assert!(PgNumeric::from_bytes(&[0, 2, 0, 0, 0, 0, 0, 0, 0, 1]).is_err());
    }
}
