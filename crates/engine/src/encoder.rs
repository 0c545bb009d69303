//! Wire encoding of aggregated results.
//!
//! Decimals are not representable on-chain, so numeric results are shifted
//! by the feed's decimal factor and rounded to the nearest integer before
//! being encoded as a 32-byte big-endian word. String results are raw UTF-8
//! bytes. The response-byte ceiling is checked once, here at the boundary.

use oraclet_types::{AdapterError, EncodedResult};

use crate::aggregate::Candidate;
use crate::config::ReturnType;

const WORD_BYTES: usize = 32;

/// Encoder stage: applies the decimal shift and renders wire bytes.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    decimals: u32,
    max_response_bytes: usize,
}

impl Encoder {
    pub fn new(decimals: u32, max_response_bytes: usize) -> Self {
        Self {
            decimals,
            max_response_bytes,
        }
    }

    /// Encode an aggregated candidate, enforcing the response-byte ceiling.
    pub fn encode(&self, candidate: &Candidate, result_type: ReturnType) -> Result<EncodedResult, AdapterError> {
        let bytes = match (candidate, result_type) {
            (Candidate::Number(value), ReturnType::Uint256) => {
                let shifted = shift_decimal(*value, self.decimals);
                if shifted < 0 {
                    return Err(AdapterError::type_mismatch("result", "a non-negative number", shifted.to_string()));
                }
                encode_uint256(shifted as u128).to_vec()
            }
            (Candidate::Number(value), ReturnType::Int256) => encode_int256(shift_decimal(*value, self.decimals)).to_vec(),
            (Candidate::Text(text), ReturnType::String) => encode_string(text),
            (Candidate::Number(_), ReturnType::String) => {
                return Err(AdapterError::type_mismatch("result", "a string", "a number"));
            }
            (Candidate::Text(_), ReturnType::Uint256 | ReturnType::Int256) => {
                return Err(AdapterError::type_mismatch("result", "a number", "a string"));
            }
        };

        let result = EncodedResult::from_bytes(bytes);
        if result.len() > self.max_response_bytes {
            return Err(AdapterError::ResponseTooLarge {
                limit: self.max_response_bytes,
                actual: result.len(),
            });
        }
        Ok(result)
    }
}

/// Shift a value by `decimals` places and round half away from zero.
pub fn shift_decimal(value: f64, decimals: u32) -> i128 {
    (value * 10f64.powi(decimals as i32)).round() as i128
}

/// 32-byte big-endian unsigned encoding. Zero is a word of zero bytes, a
/// value distinct from the empty sentinel.
pub fn encode_uint256(value: u128) -> [u8; WORD_BYTES] {
    let mut word = [0u8; WORD_BYTES];
    word[WORD_BYTES - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// 32-byte big-endian two's-complement encoding.
pub fn encode_int256(value: i128) -> [u8; WORD_BYTES] {
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut word = [fill; WORD_BYTES];
    word[WORD_BYTES - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Raw UTF-8 framing for string results.
pub fn encode_string(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}
