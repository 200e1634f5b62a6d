use crate::codec::Decoder;
use crate::{SnapshotError, SnapshotResult, SnapshotVersion};

/// Parses one device snapshot produced by [`crate::SnapshotWriter`].
///
/// Unknown tags are retained but ignored, so a newer writer's additions load cleanly on an older
/// reader within the same major version.
#[derive(Debug)]
pub struct SnapshotReader<'a> {
    version: SnapshotVersion,
    fields: Vec<(u16, &'a [u8])>,
}

impl<'a> SnapshotReader<'a> {
    pub fn parse(bytes: &'a [u8], expected_id: [u8; 4]) -> SnapshotResult<Self> {
        let mut d = Decoder::new(bytes);
        let mut found = [0u8; 4];
        for b in &mut found {
            *b = d.u8()?;
        }
        if found != expected_id {
            return Err(SnapshotError::DeviceIdMismatch {
                expected: expected_id,
                found,
            });
        }
        let version = SnapshotVersion::new(d.u16()?, d.u16()?);

        let mut fields = Vec::new();
        let mut offset = bytes.len() - d.remaining();
        while offset < bytes.len() {
            let mut d = Decoder::new(&bytes[offset..]);
            let tag = d.u16()?;
            let len = d.u32()? as usize;
            let start = offset + 6;
            let end = start.checked_add(len).ok_or(SnapshotError::Truncated)?;
            if end > bytes.len() {
                return Err(SnapshotError::Truncated);
            }
            fields.push((tag, &bytes[start..end]));
            offset = end;
        }

        Ok(Self { version, fields })
    }

    /// Like [`SnapshotReader::parse`], additionally rejecting snapshots from an incompatible
    /// major version.
    pub fn parse_versioned(
        bytes: &'a [u8],
        expected_id: [u8; 4],
        supported: SnapshotVersion,
    ) -> SnapshotResult<Self> {
        let reader = Self::parse(bytes, expected_id)?;
        if reader.version.major != supported.major {
            return Err(SnapshotError::UnsupportedVersion {
                supported: supported.major,
                found: reader.version.major,
            });
        }
        Ok(reader)
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    /// Raw payload of the first field with `tag`, if present.
    pub fn field(&self, tag: u16) -> Option<&'a [u8]> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, bytes)| *bytes)
    }

    pub fn require_field(&self, tag: u16, name: &'static str) -> SnapshotResult<&'a [u8]> {
        self.field(tag).ok_or(SnapshotError::MissingField(name))
    }

    pub fn field_u32(&self, tag: u16, name: &'static str) -> SnapshotResult<u32> {
        let bytes = self.require_field(tag, name)?;
        let arr: [u8; 4] = bytes
            .try_into()
            .map_err(|_| SnapshotError::InvalidFieldEncoding(name))?;
        Ok(u32::from_le_bytes(arr))
    }

    pub fn field_u64(&self, tag: u16, name: &'static str) -> SnapshotResult<u64> {
        let bytes = self.require_field(tag, name)?;
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| SnapshotError::InvalidFieldEncoding(name))?;
        Ok(u64::from_le_bytes(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapshotWriter;
    use pretty_assertions::assert_eq;

    const ID: [u8; 4] = *b"TEST";
    const V1: SnapshotVersion = SnapshotVersion::new(1, 0);

    #[test]
    fn header_and_fields_round_trip() {
        let mut w = SnapshotWriter::new(ID, V1);
        w.field_u32(1, 0xAABB_CCDD);
        w.field_u64(2, 42);
        w.field_bytes(3, vec![9, 9, 9]);
        let bytes = w.finish();

        let r = SnapshotReader::parse(&bytes, ID).unwrap();
        assert_eq!(r.version(), V1);
        assert_eq!(r.field_u32(1, "a").unwrap(), 0xAABB_CCDD);
        assert_eq!(r.field_u64(2, "b").unwrap(), 42);
        assert_eq!(r.field(3).unwrap(), &[9, 9, 9]);
        assert_eq!(r.field(4), None);
    }

    #[test]
    fn wrong_device_id_is_rejected() {
        let w = SnapshotWriter::new(*b"OTHR", V1);
        let err = SnapshotReader::parse(&w.finish(), ID).unwrap_err();
        assert_eq!(
            err,
            SnapshotError::DeviceIdMismatch {
                expected: ID,
                found: *b"OTHR",
            }
        );
    }

    #[test]
    fn major_version_mismatch_is_rejected() {
        let w = SnapshotWriter::new(ID, SnapshotVersion::new(2, 0));
        let err = SnapshotReader::parse_versioned(&w.finish(), ID, V1).unwrap_err();
        assert_eq!(
            err,
            SnapshotError::UnsupportedVersion {
                supported: 1,
                found: 2,
            }
        );
    }

    #[test]
    fn unknown_tags_are_skipped() {
        let mut w = SnapshotWriter::new(ID, V1);
        w.field_u32(1, 7);
        w.field_bytes(0xFFEE, vec![1, 2, 3, 4, 5]);
        let bytes = w.finish();

        let r = SnapshotReader::parse(&bytes, ID).unwrap();
        assert_eq!(r.field_u32(1, "a").unwrap(), 7);
    }

    #[test]
    fn truncated_field_is_an_error() {
        let mut w = SnapshotWriter::new(ID, V1);
        w.field_bytes(1, vec![0; 16]);
        let mut bytes = w.finish();
        bytes.truncate(bytes.len() - 1);
        assert_eq!(
            SnapshotReader::parse(&bytes, ID).unwrap_err(),
            SnapshotError::Truncated
        );
    }

    #[test]
    fn wrong_width_field_is_invalid_encoding() {
        let mut w = SnapshotWriter::new(ID, V1);
        w.field_bytes(1, vec![0; 3]);
        let bytes = w.finish();
        let r = SnapshotReader::parse(&bytes, ID).unwrap();
        assert_eq!(
            r.field_u32(1, "narrow").unwrap_err(),
            SnapshotError::InvalidFieldEncoding("narrow")
        );
    }
}
