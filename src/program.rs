//! Program decoder: turns a program blob into code, jump-target bitmask,
//! jump table, and (for the preimage/"Y function" layout) read-only/read-write
//! data segments and stack/heap sizing.

use crate::codec::primitive::{concat_bytes, decode_natural, encode_natural, read_le};

/// Service code extracted from a preimage: an opaque metadata blob plus the code region.
#[derive(Clone, Debug)]
pub struct ServiceCodeResult {
    pub metadata: Vec<u8>,
    pub code_blob: Vec<u8>,
}

/// Decoded program blob (deblob format): code, bitmask, jump table.
#[derive(Clone, Debug)]
pub struct DecodedBlob {
    pub code: Vec<u8>,
    pub bitmask: Vec<u8>,
    pub jump_table: Vec<u32>,
    pub element_size: i32,
    pub header_size: i32,
}

/// Decoded program (Y function format): ro/rw data, code, sizes.
#[derive(Clone, Debug, Default)]
pub struct DecodedProgram {
    pub metadata: Vec<u8>,
    pub ro_data_length: u32,
    pub rw_data_length: u32,
    pub heap_zero_padding_size: u32,
    pub stack_size: u32,
    pub ro_data: Vec<u8>,
    pub rw_data: Vec<u8>,
    pub code_size: u32,
    pub code: Vec<u8>,
}

/// Decode a deblob-format PVM program: natural(len(jump_table)) ‖ element_size[1] ‖
/// natural(len(code)) ‖ jump_table ‖ code ‖ bitmask. The bitmask is packed 8 bits/byte
/// and has `ceil(code_length / 8)` bytes; this unpacks it to one byte per bit.
#[must_use]
pub fn decode_blob(program_blob: &[u8]) -> Option<DecodedBlob> {
    let mut offset: i32 = 0;

    let jump_table_length_result = decode_natural(program_blob.get(offset as usize..)?)?;
    let jump_table_length = jump_table_length_result.value as i32;
    offset += jump_table_length_result.consumed;

    if offset as usize >= program_blob.len() {
        return None;
    }
    let element_size = i32::from(program_blob[offset as usize]);
    offset += 1;

    let code_length_result = decode_natural(program_blob.get(offset as usize..)?)?;
    let code_length = code_length_result.value as i32;
    offset += code_length_result.consumed;

    let header_size = offset;

    let jump_table_size = jump_table_length * element_size;
    if offset as usize + jump_table_size as usize > program_blob.len() {
        return None;
    }

    let mut jump_table = Vec::with_capacity(jump_table_length as usize);
    for i in 0..jump_table_length {
        let start = (offset + i * element_size) as usize;
        let end = start + element_size as usize;
        let element_bytes = program_blob.get(start..end)?;
        let mut value: u32 = 0;
        for (j, &b) in element_bytes.iter().enumerate() {
            value |= u32::from(b) << (j * 8);
        }
        jump_table.push(value);
    }
    offset += jump_table_size;

    if offset as usize + code_length as usize > program_blob.len() {
        return None;
    }
    let code = program_blob[offset as usize..offset as usize + code_length as usize].to_vec();
    offset += code_length;

    let remaining = program_blob.len() - offset as usize;
    let mut bitmask = vec![0u8; code_length as usize];
    let mut bit_index: i32 = 0;
    let mut byte_index: usize = 0;

    while bit_index < code_length && byte_index < remaining {
        let packed_byte = *program_blob.get(offset as usize + byte_index)?;
        for i in 0..8 {
            if bit_index >= code_length {
                break;
            }
            bitmask[bit_index as usize] = ((u32::from(packed_byte) >> i) & 1) as u8;
            bit_index += 1;
        }
        byte_index += 1;
    }

    if bit_index < code_length {
        return None;
    }

    Some(DecodedBlob {
        code,
        bitmask,
        jump_table,
        element_size,
        header_size,
    })
}

/// Encode `DecodedBlob` back to a program blob (inverse of [`decode_blob`]).
#[must_use]
pub fn encode_blob(decoded: &DecodedBlob) -> Vec<u8> {
    let code_len = decoded.code.len() as u64;
    let jump_len = decoded.jump_table.len() as u64;

    let len_j = encode_natural(jump_len);
    let z = [decoded.element_size as u8];
    let len_c = encode_natural(code_len);

    let mut jump_bytes = Vec::with_capacity(decoded.jump_table.len() * decoded.element_size as usize);
    for &v in &decoded.jump_table {
        for i in 0..decoded.element_size {
            jump_bytes.push((v >> (i * 8)) as u8);
        }
    }

    let code_len_usize = decoded.code.len();
    let bitmask_packed_len = code_len_usize.div_ceil(8);
    let mut k = vec![0u8; bitmask_packed_len];
    for (bit_index, &bit) in decoded.bitmask.iter().take(code_len_usize).enumerate() {
        if bit != 0 {
            k[bit_index / 8] |= 1 << (bit_index % 8);
        }
    }

    concat_bytes(&[&len_j, &z, &len_c, &jump_bytes, &decoded.code, &k])
}

/// Decode service code from a preimage: natural(len(metadata)) ‖ metadata ‖ code_blob.
#[must_use]
pub fn decode_service_code_from_preimage(preimage_blob: &[u8]) -> Option<ServiceCodeResult> {
    let metadata_length_result = decode_natural(preimage_blob)?;
    let meta_len_bytes = metadata_length_result.value as usize;
    let meta_start = metadata_length_result.consumed as usize;
    let meta_end = meta_start + meta_len_bytes;
    if meta_end > preimage_blob.len() {
        return None;
    }
    Some(ServiceCodeResult {
        metadata: preimage_blob[meta_start..meta_end].to_vec(),
        code_blob: preimage_blob[meta_end..].to_vec(),
    })
}

/// Decode the Y-function format: `E3(|o|) ‖ E3(|w|) ‖ E2(z) ‖ E3(s) ‖ o ‖ w ‖ E4(|c|) ‖ c`.
#[must_use]
pub fn decode_program(program_blob: &[u8]) -> Option<DecodedProgram> {
    let mut offset = 0usize;

    let ro_data_length = read_le(program_blob, offset, 3)?;
    offset += 3;
    let rw_data_length = read_le(program_blob, offset, 3)?;
    offset += 3;
    let heap_zero_padding_size = read_le(program_blob, offset, 2)?;
    offset += 2;
    let stack_size = read_le(program_blob, offset, 3)?;
    offset += 3;

    if offset + ro_data_length as usize > program_blob.len() {
        return None;
    }
    let ro_data = program_blob[offset..offset + ro_data_length as usize].to_vec();
    offset += ro_data_length as usize;

    if offset + rw_data_length as usize > program_blob.len() {
        return None;
    }
    let rw_data = program_blob[offset..offset + rw_data_length as usize].to_vec();
    offset += rw_data_length as usize;

    let code_size = read_le(program_blob, offset, 4)?;
    offset += 4;

    if offset + code_size as usize > program_blob.len() {
        return None;
    }
    let code = program_blob[offset..offset + code_size as usize].to_vec();

    Some(DecodedProgram {
        metadata: vec![],
        ro_data_length,
        rw_data_length,
        heap_zero_padding_size,
        stack_size,
        ro_data,
        rw_data,
        code_size,
        code,
    })
}

/// Decode a program from its preimage: service-code metadata wrapper, then Y-function body.
#[must_use]
pub fn decode_program_from_preimage(preimage_blob: &[u8]) -> Option<DecodedProgram> {
    let preimage_result = decode_service_code_from_preimage(preimage_blob)?;
    let program = decode_program(&preimage_result.code_blob)?;
    Some(DecodedProgram {
        metadata: preimage_result.metadata,
        ..program
    })
}

/// A fully decoded program ready to seed execution state: code, jump bitmask, jump
/// table, and the initial register file (all zero except r1/r2).
#[derive(Clone, Debug)]
pub struct LoadedProgram {
    pub code: Vec<u8>,
    pub bitmask: Vec<u8>,
    pub jump_table: Vec<u32>,
}

impl LoadedProgram {
    #[must_use]
    pub fn from_blob(program_blob: &[u8]) -> Option<Self> {
        let decoded = decode_blob(program_blob)?;
        Some(Self {
            code: decoded.code,
            bitmask: decoded.bitmask,
            jump_table: decoded.jump_table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trips() {
        let decoded = DecodedBlob {
            code: vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
            bitmask: vec![1, 0, 0, 1, 0, 0, 0, 1, 0, 0],
            jump_table: vec![4, 8],
            element_size: 4,
            header_size: 0,
        };
        let encoded = encode_blob(&decoded);
        let redecoded = decode_blob(&encoded).unwrap();
        assert_eq!(redecoded.code, decoded.code);
        assert_eq!(redecoded.bitmask, decoded.bitmask);
        assert_eq!(redecoded.jump_table, decoded.jump_table);
    }

    #[test]
    fn bitmask_length_equals_code_length() {
        let decoded = DecodedBlob {
            code: vec![0; 17],
            bitmask: vec![0; 17],
            jump_table: vec![],
            element_size: 4,
            header_size: 0,
        };
        let encoded = encode_blob(&decoded);
        let redecoded = decode_blob(&encoded).unwrap();
        assert_eq!(redecoded.bitmask.len(), redecoded.code.len());
    }
}
