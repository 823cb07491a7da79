/// CRC-32 (ISO 3309, reflected polynomial 0xEDB88320) as used by PNG chunks.
pub struct CrcCalculator {
    table: [u32; 256],
}

impl CrcCalculator {
    pub const fn new() -> Self {
        let mut table = [0u32; 256];
        let mut n = 0;

        while n < 256 {
            let mut c = n as u32;
            let mut k = 0;

            while k < 8 {
                if c & 1 == 1 {
                    c = 0xedb88320u32 ^ (c >> 1);
                } else {
                    c >>= 1;
                }
                k += 1;
            }

            table[n] = c;
            n += 1;
        }

        Self { table }
    }

    /// Feeds `buf` into a running (pre-inverted) CRC register.
    pub fn update_crc(&self, crc: u32, buf: &[u8]) -> u32 {
        let mut c = crc;
        for &b in buf {
            c = self.table[((c ^ u32::from(b)) & 0xff) as usize] ^ (c >> 8);
        }
        c
    }

    pub fn calculate_crc(&self, data: &[u8]) -> u32 {
        self.update_crc(0xffffffff, data) ^ 0xffffffff
    }
}

impl Default for CrcCalculator {
    fn default() -> Self {
        Self::new()
    }
}

static CALCULATOR: CrcCalculator = CrcCalculator::new();

/// CRC of a chunk: computed over the type tag followed by the payload.
pub fn chunk_crc(chunk_type: &[u8; 4], data: &[u8]) -> u32 {
    let crc = CALCULATOR.update_crc(0xffffffff, chunk_type);
    CALCULATOR.update_crc(crc, data) ^ 0xffffffff
}
