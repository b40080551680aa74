//! Reed-Solomon decoder over GF(256).
//!
//! Syndrome computation, the extended Euclidean algorithm for the error
//! locator/evaluator pair, Chien search for the error positions and the
//! Forney formula for the magnitudes. Corrects up to `two_s / 2` byte
//! errors per block.

use crate::error::DecodeError;

use super::gf256::Gf256;
use super::gf_poly::GfPoly;

/// Decoder for one interleaved block carrying `two_s` ECC codewords.
pub struct ReedSolomonDecoder {
    two_s: usize,
}

impl ReedSolomonDecoder {
    pub fn new(two_s: usize) -> Self {
        Self { two_s }
    }

    /// Correct the block in place, consuming and returning it. Errors with
    /// `ReedSolomon` when the corruption exceeds the correction capacity.
    pub fn decode(&self, mut received: Vec<u8>) -> Result<Vec<u8>, DecodeError> {
        let poly = GfPoly::new(received.clone())?;

        let mut syndrome_coefficients = vec![0u8; self.two_s];
        let mut no_error = true;
        for i in 0..self.two_s {
            let eval = poly.evaluate_at(Gf256::exp(i));
            syndrome_coefficients[self.two_s - 1 - i] = eval;
            if eval != 0 {
                no_error = false;
            }
        }
        if no_error {
            return Ok(received);
        }

        let syndrome = GfPoly::new(syndrome_coefficients)?;
        let (sigma, omega) =
            self.run_euclidean_algorithm(GfPoly::monomial(self.two_s, 1), syndrome)?;
        let error_locations = find_error_locations(&sigma)?;
        let error_magnitudes = find_error_magnitudes(&omega, &error_locations)?;

        for (&location, &magnitude) in error_locations.iter().zip(error_magnitudes.iter()) {
            let log = Gf256::log(location)?;
            if log >= received.len() {
                return Err(DecodeError::ReedSolomon("bad error location"));
            }
            let position = received.len() - 1 - log;
            received[position] = Gf256::add(received[position], magnitude);
        }
        Ok(received)
    }

    /// Run extended Euclid on x^two_s and the syndrome polynomial until the
    /// remainder degree drops below two_s / 2, tracking the co-sequence.
    fn run_euclidean_algorithm(
        &self,
        a: GfPoly,
        b: GfPoly,
    ) -> Result<(GfPoly, GfPoly), DecodeError> {
        let (a, b) = if a.degree() < b.degree() { (b, a) } else { (a, b) };

        let mut r_last = a;
        let mut r = b;
        let mut t_last = GfPoly::zero();
        let mut t = GfPoly::monomial(0, 1);

        while r.degree() >= self.two_s / 2 {
            let r_last_last = r_last;
            let t_last_last = t_last;
            r_last = r;
            t_last = t;

            if r_last.is_zero() {
                // Euclid's algorithm already terminated; the syndromes are
                // inconsistent with any correctable error pattern.
                return Err(DecodeError::ReedSolomon("divisor polynomial vanished"));
            }

            r = r_last_last;
            let mut q = GfPoly::zero();
            let dlt_inverse = Gf256::inverse(r_last.coefficient(r_last.degree()))?;
            while r.degree() >= r_last.degree() && !r.is_zero() {
                let degree_diff = r.degree() - r_last.degree();
                let scale = Gf256::multiply(r.coefficient(r.degree()), dlt_inverse);
                q = q.add_or_subtract(&GfPoly::monomial(degree_diff, scale));
                r = r.add_or_subtract(&r_last.multiply_by_monomial(degree_diff, scale));
            }
            t = q.multiply(&t_last).add_or_subtract(&t_last_last);

            if r.degree() >= r_last.degree() {
                return Err(DecodeError::ReedSolomon("division failed to reduce remainder"));
            }
        }

        let sigma_tilde_at_zero = t.coefficient(0);
        if sigma_tilde_at_zero == 0 {
            return Err(DecodeError::ReedSolomon("sigma tilde(0) was zero"));
        }
        let inverse = Gf256::inverse(sigma_tilde_at_zero)?;
        Ok((t.multiply_scalar(inverse), r.multiply_scalar(inverse)))
    }
}

/// Chien search: the error locators are the inverses of the locator
/// polynomial's roots.
fn find_error_locations(sigma: &GfPoly) -> Result<Vec<u8>, DecodeError> {
    let num_errors = sigma.degree();
    if num_errors == 1 {
        return Ok(vec![sigma.coefficient(1)]);
    }
    let mut result = Vec::with_capacity(num_errors);
    for i in 1..=255u32 {
        if result.len() >= num_errors {
            break;
        }
        if sigma.evaluate_at(i as u8) == 0 {
            result.push(Gf256::inverse(i as u8)?);
        }
    }
    if result.len() != num_errors {
        return Err(DecodeError::ReedSolomon("error locator degree mismatch"));
    }
    Ok(result)
}

/// Forney formula for the error magnitudes.
fn find_error_magnitudes(omega: &GfPoly, error_locations: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let s = error_locations.len();
    let mut result = Vec::with_capacity(s);
    for i in 0..s {
        let xi_inverse = Gf256::inverse(error_locations[i])?;
        let mut denominator = 1u8;
        for j in 0..s {
            if i == j {
                continue;
            }
            // 1 + X_j * X_i^-1; in this field "+1" is toggling the low bit.
            let term = Gf256::multiply(error_locations[j], xi_inverse);
            let term_plus_one = if term & 1 == 0 { term | 1 } else { term & !1 };
            denominator = Gf256::multiply(denominator, term_plus_one);
        }
        result.push(Gf256::multiply(
            omega.evaluate_at(xi_inverse),
            Gf256::inverse(denominator)?,
        ));
    }
    Ok(result)
}
