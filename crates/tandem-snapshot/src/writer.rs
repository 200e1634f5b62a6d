use crate::SnapshotVersion;

/// Serializes one device snapshot: a fixed header (device id, version) followed by TLV fields.
///
/// Callers must write fields in ascending tag order so identical state always produces identical
/// bytes.
#[derive(Debug)]
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    pub fn new(device_id: [u8; 4], version: SnapshotVersion) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&device_id);
        buf.extend_from_slice(&version.major.to_le_bytes());
        buf.extend_from_slice(&version.minor.to_le_bytes());
        Self { buf }
    }

    pub fn field_bytes(&mut self, tag: u16, bytes: Vec<u8>) {
        self.buf.extend_from_slice(&tag.to_le_bytes());
        self.buf
            .extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(&bytes);
    }

    pub fn field_u32(&mut self, tag: u16, v: u32) {
        self.field_bytes(tag, v.to_le_bytes().to_vec());
    }

    pub fn field_u64(&mut self, tag: u16, v: u64) {
        self.field_bytes(tag, v.to_le_bytes().to_vec());
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
