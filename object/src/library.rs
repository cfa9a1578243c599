//! The static-library archive: a trivial concatenation of BELF objects (spec.md §4.5).

use crate::{ObjectError, ObjectFile};
use byteio::{ByteReader, ByteWriter};

/// `n_objects:8` followed by `{size:8, bytes}` per member.
#[derive(Debug, Clone, Default)]
pub struct StaticLibrary {
    pub objects: Vec<ObjectFile>,
}

impl StaticLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self { objects: Vec::new() }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ObjectError> {
        let mut w = ByteWriter::new();
        w.write_u64(u64::try_from(self.objects.len()).map_err(|_| ObjectError::TooManySections)?);
        for obj in &self.objects {
            let bytes = obj.to_bytes()?;
            w.write_u64(u64::try_from(bytes.len()).map_err(|_| ObjectError::TooManySections)?);
            w.write_bytes(&bytes);
        }
        Ok(w.into_bytes())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ObjectError> {
        let mut r = ByteReader::new(data);
        let n = r.read_u64()? as usize;
        let mut objects = Vec::with_capacity(n);
        for _ in 0..n {
            let size = r.read_u64()? as usize;
            let bytes = r.read_bytes(size)?;
            objects.push(ObjectFile::from_bytes(bytes)?);
        }
        Ok(Self { objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileType;

    #[test]
    fn round_trips_a_library_of_objects() {
        let mut lib = StaticLibrary::new();
        lib.objects.push(ObjectFile::new(FileType::Relocatable, 1, 0));
        let mut second = ObjectFile::new(FileType::Relocatable, 1, 0);
        second.text_section = vec![0xDEAD_BEEF];
        lib.objects.push(second);

        let bytes = lib.to_bytes().unwrap();
        let back = StaticLibrary::from_bytes(&bytes).unwrap();
        assert_eq!(back.objects.len(), 2);
        assert_eq!(back.objects[1].text_section, vec![0xDEAD_BEEF]);
    }

    #[test]
    fn empty_library_round_trips() {
        let lib = StaticLibrary::new();
        let bytes = lib.to_bytes().unwrap();
        let back = StaticLibrary::from_bytes(&bytes).unwrap();
        assert!(back.objects.is_empty());
    }
}
