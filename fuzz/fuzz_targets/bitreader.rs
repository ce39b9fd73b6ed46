#![no_main]

use bitstream::BitBufferReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    // First bytes pick the layout, the rest is the payload.
    let base_bit = usize::from(data[0] % 16);
    let header_bits = usize::from(data[1]);
    let data_bits = usize::from(data[2]);
    let payload = &data[3..];
    let Ok(mut reader) = BitBufferReader::open(payload, base_bit, header_bits, data_bits) else {
        return;
    };

    let mut idx = 0usize;
    while idx < payload.len() && idx < 1024 {
        let op = payload[idx] % 7;
        idx += 1;

        match op {
            0 => {
                let _ = reader.read_header_bit();
            }
            1 => {
                let _ = reader.read_bit();
            }
            2 => {
                let _ = reader.read_bytes(usize::from(payload[idx - 1] % 16));
            }
            3 => {
                let _ = reader.read_u32();
            }
            4 => {
                let _ = reader.read_varint();
            }
            5 => {
                let _ = reader.read_packed_i64(false);
            }
            _ => {
                let _ = reader.read_packed_f64(true);
            }
        }
    }
    let _ = reader.finish();
});
