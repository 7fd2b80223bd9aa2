//! On-disk replay container: magic, version, frame count, then
//! length-prefixed snapshots. `zstd_support` wraps each snapshot's encoded
//! bytes in a streaming compressor transparently to the reader.

use std::io::{Read, Write};

use cfg_if::cfg_if;

use super::snapshot::FrameSnapshot;
use super::ReplayError;

const MAGIC: &[u8; 7] = b"FDP_REC";
const VERSION: u32 = 1;

fn encode_snapshot(snapshot: &FrameSnapshot) -> Result<Vec<u8>, ReplayError> {
    let bytes = bincode::serialize(snapshot)?;
    cfg_if! {
        if #[cfg(feature = "zstd_support")] {
            Ok(zstd::stream::encode_all(&bytes[..], 0)?)
        } else {
            Ok(bytes)
        }
    }
}

fn decode_snapshot(bytes: &[u8]) -> Result<FrameSnapshot, ReplayError> {
    cfg_if! {
        if #[cfg(feature = "zstd_support")] {
            let bytes = zstd::stream::decode_all(bytes)?;
            Ok(bincode::deserialize(&bytes)?)
        } else {
            Ok(bincode::deserialize(bytes)?)
        }
    }
}

pub fn write_container<W: Write>(writer: &mut W, snapshots: &[FrameSnapshot]) -> Result<(), ReplayError> {
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&(snapshots.len() as u32).to_le_bytes())?;
    for snapshot in snapshots {
        let encoded = encode_snapshot(snapshot)?;
        writer.write_all(&(encoded.len() as u32).to_le_bytes())?;
        writer.write_all(&encoded)?;
    }
    Ok(())
}

pub fn read_container<R: Read>(reader: &mut R) -> Result<Vec<FrameSnapshot>, ReplayError> {
    let mut magic = [0u8; 7];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ReplayError::BadMagic);
    }

    let mut version_bytes = [0u8; 4];
    reader.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(ReplayError::UnsupportedVersion(version));
    }

    let mut count_bytes = [0u8; 4];
    reader.read_exact(&mut count_bytes)?;
    let count = u32::from_le_bytes(count_bytes);

    let mut snapshots = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        snapshots.push(decode_snapshot(&buf)?);
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_roundtrips_snapshots() {
        let snapshots = vec![
            FrameSnapshot::empty(1, 0.0166, 42),
            FrameSnapshot::empty(2, 0.0333, 42),
        ];
        let mut buf = Vec::new();
        write_container(&mut buf, &snapshots).unwrap();

        let decoded = read_container(&mut &buf[..]).unwrap();
        assert_eq!(decoded, snapshots);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = b"NOTAREC\x01\x00\x00\x00\x00\x00\x00\x00".to_vec();
        let err = read_container(&mut &buf[..]).unwrap_err();
        assert!(matches!(err, ReplayError::BadMagic));
    }
}
