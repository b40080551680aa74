//! Immutable polynomials over GF(256).

use crate::error::DecodeError;

use super::gf256::Gf256;

/// Polynomial with coefficients stored highest degree first. The constant
/// zero polynomial is the single coefficient `[0]`; any other polynomial has
/// a nonzero leading coefficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfPoly {
    coefficients: Vec<u8>,
}

impl GfPoly {
    /// Build from a coefficient list, highest degree first. Leading zeros
    /// are stripped; an empty list is rejected.
    pub fn new(coefficients: Vec<u8>) -> Result<Self, DecodeError> {
        if coefficients.is_empty() {
            return Err(DecodeError::InvalidArgument("empty coefficient list"));
        }
        Ok(Self::strip(coefficients))
    }

    /// The constant zero polynomial.
    pub fn zero() -> Self {
        Self {
            coefficients: vec![0],
        }
    }

    /// `coefficient * x^degree`.
    pub fn monomial(degree: usize, coefficient: u8) -> Self {
        if coefficient == 0 {
            return Self::zero();
        }
        let mut coefficients = vec![0u8; degree + 1];
        coefficients[0] = coefficient;
        Self { coefficients }
    }

    fn strip(coefficients: Vec<u8>) -> Self {
        match coefficients.iter().position(|&c| c != 0) {
            None => Self::zero(),
            Some(0) => Self { coefficients },
            Some(i) => Self {
                coefficients: coefficients[i..].to_vec(),
            },
        }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients[0] == 0
    }

    /// Coefficient of the `x^degree` term (0 beyond the leading term).
    pub fn coefficient(&self, degree: usize) -> u8 {
        if degree > self.degree() {
            return 0;
        }
        self.coefficients[self.coefficients.len() - 1 - degree]
    }

    /// Horner evaluation at `a`.
    pub fn evaluate_at(&self, a: u8) -> u8 {
        if a == 0 {
            return self.coefficient(0);
        }
        if a == 1 {
            return self
                .coefficients
                .iter()
                .fold(0, |acc, &c| Gf256::add(acc, c));
        }
        let mut result = self.coefficients[0];
        for &c in &self.coefficients[1..] {
            result = Gf256::add(Gf256::multiply(a, result), c);
        }
        result
    }

    /// Sum (identical to difference) of two polynomials.
    pub fn add_or_subtract(&self, other: &Self) -> Self {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let (smaller, larger) = if self.coefficients.len() <= other.coefficients.len() {
            (&self.coefficients, &other.coefficients)
        } else {
            (&other.coefficients, &self.coefficients)
        };
        let diff = larger.len() - smaller.len();
        let mut sum = vec![0u8; larger.len()];
        sum[..diff].copy_from_slice(&larger[..diff]);
        for i in diff..larger.len() {
            sum[i] = Gf256::add(smaller[i - diff], larger[i]);
        }
        Self::strip(sum)
    }

    /// Polynomial product.
    pub fn multiply(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        let a = &self.coefficients;
        let b = &other.coefficients;
        let mut product = vec![0u8; a.len() + b.len() - 1];
        for (i, &ac) in a.iter().enumerate() {
            for (j, &bc) in b.iter().enumerate() {
                product[i + j] = Gf256::add(product[i + j], Gf256::multiply(ac, bc));
            }
        }
        Self::strip(product)
    }

    /// Product with a scalar.
    pub fn multiply_scalar(&self, scalar: u8) -> Self {
        match scalar {
            0 => Self::zero(),
            1 => self.clone(),
            _ => Self::strip(
                self.coefficients
                    .iter()
                    .map(|&c| Gf256::multiply(c, scalar))
                    .collect(),
            ),
        }
    }

    /// Product with `coefficient * x^degree`.
    pub fn multiply_by_monomial(&self, degree: usize, coefficient: u8) -> Self {
        if coefficient == 0 {
            return Self::zero();
        }
        let mut product = vec![0u8; self.coefficients.len() + degree];
        for (i, &c) in self.coefficients.iter().enumerate() {
            product[i] = Gf256::multiply(c, coefficient);
        }
        Self::strip(product)
    }

    /// Long division, returning (quotient, remainder). Dividing by the zero
    /// polynomial is rejected.
    pub fn divide(&self, other: &Self) -> Result<(Self, Self), DecodeError> {
        if other.is_zero() {
            return Err(DecodeError::InvalidArgument("divide by zero polynomial"));
        }
        let inverse_denominator = Gf256::inverse(other.coefficient(other.degree()))?;

        let mut quotient = Self::zero();
        let mut remainder = self.clone();
        while remainder.degree() >= other.degree() && !remainder.is_zero() {
            let degree_difference = remainder.degree() - other.degree();
            let scale = Gf256::multiply(
                remainder.coefficient(remainder.degree()),
                inverse_denominator,
            );
            quotient = quotient.add_or_subtract(&Self::monomial(degree_difference, scale));
            remainder = remainder.add_or_subtract(&other.multiply_by_monomial(degree_difference, scale));
        }
        Ok((quotient, remainder))
    }
}
