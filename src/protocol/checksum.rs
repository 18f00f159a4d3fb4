/// XOR-fold checksum appended to every frame.
pub trait Checksum {
    fn checksum(&mut self) -> u8;
}

impl <'a>Checksum for std::slice::Iter<'a, u8> {
    fn checksum(&mut self) -> u8 {
        self.fold(0, |acc, byte| acc ^ byte)
    }
}

pub fn compute(bytes: &[u8]) -> u8 {
    bytes.iter().checksum()
}

/// Check a byte sequence whose last byte is the checksum of everything before it.
pub fn verify(bytes: &[u8]) -> bool {
    match bytes {
        [data @ .., checksum] => data.iter().checksum() == *checksum,
        [] => false,
    }
}
