//! De-interleaving of the raw codeword stream into per-block codewords.

use crate::error::DecodeError;
use crate::models::ECLevel;

use super::version::Version;

/// One error-correction block: data codewords followed by ECC codewords.
#[derive(Debug)]
pub struct DataBlock {
    pub num_data_codewords: usize,
    pub codewords: Vec<u8>,
}

/// Split the interleaved codeword stream into its blocks.
///
/// All blocks share `data_total / num_blocks` data codewords; the final
/// `data_total % num_blocks` blocks carry one more. ECC codewords follow,
/// interleaved across all blocks.
pub fn build_data_blocks(
    raw_codewords: &[u8],
    version: Version,
    ec_level: ECLevel,
) -> Result<Vec<DataBlock>, DecodeError> {
    let total = version.total_codewords();
    if raw_codewords.len() != total {
        return Err(DecodeError::InvalidArgument("raw codeword count mismatch"));
    }

    let ec = version.ec_block_info(ec_level);
    let ec_total = ec.ec_codewords_per_block * ec.num_blocks;
    if ec_total >= total {
        return Err(DecodeError::InvalidArgument("no room for data codewords"));
    }
    let data_total = total - ec_total;
    let short_data_len = data_total / ec.num_blocks;
    let num_long_blocks = data_total % ec.num_blocks;
    let num_short_blocks = ec.num_blocks - num_long_blocks;

    let mut blocks: Vec<DataBlock> = (0..ec.num_blocks)
        .map(|b| {
            let data_len = if b < num_short_blocks {
                short_data_len
            } else {
                short_data_len + 1
            };
            DataBlock {
                num_data_codewords: data_len,
                codewords: vec![0u8; data_len + ec.ec_codewords_per_block],
            }
        })
        .collect();

    let mut offset = 0;
    for i in 0..short_data_len {
        for block in blocks.iter_mut() {
            block.codewords[i] = raw_codewords[offset];
            offset += 1;
        }
    }
    for block in blocks.iter_mut().skip(num_short_blocks) {
        block.codewords[short_data_len] = raw_codewords[offset];
        offset += 1;
    }
    for i in 0..ec.ec_codewords_per_block {
        for (b, block) in blocks.iter_mut().enumerate() {
            let index = if b < num_short_blocks {
                short_data_len + i
            } else {
                short_data_len + 1 + i
            };
            block.codewords[index] = raw_codewords[offset];
            offset += 1;
        }
    }
    debug_assert_eq!(offset, total);
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Interleave per-block codewords the way an encoder writes them.
    fn interleave(blocks: &[DataBlock]) -> Vec<u8> {
        let mut out = Vec::new();
        let max_data = blocks
            .iter()
            .map(|b| b.num_data_codewords)
            .max()
            .unwrap();
        for i in 0..max_data {
            for block in blocks {
                if i < block.num_data_codewords {
                    out.push(block.codewords[i]);
                }
            }
        }
        let ec_len = blocks[0].codewords.len() - blocks[0].num_data_codewords;
        for i in 0..ec_len {
            for block in blocks {
                out.push(block.codewords[block.num_data_codewords + i]);
            }
        }
        out
    }

    #[test]
    fn test_single_block_version() {
        let version = Version::new(1).unwrap();
        let raw: Vec<u8> = (0..26).collect();
        let blocks = build_data_blocks(&raw, version, ECLevel::L).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].num_data_codewords, 19);
        assert_eq!(blocks[0].codewords, raw);
    }

    #[test]
    fn test_uneven_blocks_round_trip() {
        // Version 5-Q: 4 blocks of (15, 15, 16, 16) data + 18 ECC each.
        let version = Version::new(5).unwrap();
        let expected_data_lens = [15usize, 15, 16, 16];
        let mut reference: Vec<DataBlock> = expected_data_lens
            .iter()
            .map(|&len| DataBlock {
                num_data_codewords: len,
                codewords: vec![0u8; len + 18],
            })
            .collect();
        let mut value = 1u8;
        for block in reference.iter_mut() {
            for codeword in block.codewords.iter_mut() {
                *codeword = value;
                value = value.wrapping_add(7);
            }
        }

        let raw = interleave(&reference);
        assert_eq!(raw.len(), version.total_codewords());
        let blocks = build_data_blocks(&raw, version, ECLevel::Q).unwrap();
        assert_eq!(blocks.len(), 4);
        for (block, reference) in blocks.iter().zip(reference.iter()) {
            assert_eq!(block.num_data_codewords, reference.num_data_codewords);
            assert_eq!(block.codewords, reference.codewords);
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        let version = Version::new(1).unwrap();
        assert!(build_data_blocks(&[0u8; 25], version, ECLevel::L).is_err());
    }
}
