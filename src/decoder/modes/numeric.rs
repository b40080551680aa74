//! Numeric mode (0001): groups of 3 digits in 10 bits, 2 in 7, 1 in 4.

use crate::decoder::bit_source::BitSource;
use crate::error::DecodeError;

pub struct NumericDecoder;

impl NumericDecoder {
    pub fn decode(
        bits: &mut BitSource<'_>,
        result: &mut String,
        mut count: usize,
    ) -> Result<(), DecodeError> {
        while count >= 3 {
            let three_digits = bits.read(10)?;
            if three_digits >= 1000 {
                return Err(DecodeError::Format("digit triple out of range"));
            }
            result.push(digit(three_digits / 100)?);
            result.push(digit(three_digits / 10 % 10)?);
            result.push(digit(three_digits % 10)?);
            count -= 3;
        }
        if count == 2 {
            let two_digits = bits.read(7)?;
            if two_digits >= 100 {
                return Err(DecodeError::Format("digit pair out of range"));
            }
            result.push(digit(two_digits / 10)?);
            result.push(digit(two_digits % 10)?);
        } else if count == 1 {
            let one_digit = bits.read(4)?;
            if one_digit >= 10 {
                return Err(DecodeError::Format("digit out of range"));
            }
            result.push(digit(one_digit)?);
        }
        Ok(())
    }
}

fn digit(value: u32) -> Result<char, DecodeError> {
    char::from_digit(value, 10).ok_or(DecodeError::Format("digit out of range"))
}
