//! Fixed-width codecs for the compound values shared by the binary formats.
//!
//! Each compound type has exactly one writer and one reader so the field
//! order cannot drift between the two directions.

use byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use sfm_core::nalgebra::{Isometry3, Matrix3, Quaternion, Translation3, UnitQuaternion, Vector3};
use std::io::{self, Read, Write};

/// Element count preallocated for a length prefix before the data has been seen.
const MAX_PREALLOCATION: usize = 1 << 16;

/// Row-major 3x3 matrix.
pub(crate) fn write_matrix3<B: ByteOrder>(
    writer: &mut impl Write,
    matrix: &Matrix3<f64>,
) -> io::Result<()> {
    for row in 0..3 {
        for col in 0..3 {
            writer.write_f64::<B>(matrix[(row, col)])?;
        }
    }
    Ok(())
}

pub(crate) fn read_matrix3<B: ByteOrder>(reader: &mut impl Read) -> io::Result<Matrix3<f64>> {
    let mut values = [0.0; 9];
    reader.read_f64_into::<B>(&mut values)?;
    Ok(Matrix3::from_row_slice(&values))
}

/// Rotation quaternion as `w, x, y, z` followed by the translation.
pub(crate) fn write_rigid3<B: ByteOrder>(
    writer: &mut impl Write,
    pose: &Isometry3<f64>,
) -> io::Result<()> {
    let q = pose.rotation.quaternion();
    for value in [q.w, q.i, q.j, q.k] {
        writer.write_f64::<B>(value)?;
    }
    write_vector3::<B>(writer, &pose.translation.vector)
}

pub(crate) fn read_rigid3<B: ByteOrder>(reader: &mut impl Read) -> io::Result<Isometry3<f64>> {
    let mut q = [0.0; 4];
    reader.read_f64_into::<B>(&mut q)?;
    let translation = read_vector3::<B>(reader)?;
    // Stored normalized.
    let rotation = UnitQuaternion::new_unchecked(Quaternion::new(q[0], q[1], q[2], q[3]));
    Ok(Isometry3::from_parts(Translation3::from(translation), rotation))
}

pub(crate) fn write_vector3<B: ByteOrder>(
    writer: &mut impl Write,
    vector: &Vector3<f64>,
) -> io::Result<()> {
    for value in vector.iter() {
        writer.write_f64::<B>(*value)?;
    }
    Ok(())
}

pub(crate) fn read_vector3<B: ByteOrder>(reader: &mut impl Read) -> io::Result<Vector3<f64>> {
    let mut values = [0.0; 3];
    reader.read_f64_into::<B>(&mut values)?;
    Ok(Vector3::from(values))
}

/// `u64` count followed by the flattened pairs, the payload omitted when empty.
pub(crate) fn write_index_pairs<B: ByteOrder>(
    writer: &mut impl Write,
    pairs: &[[i32; 2]],
) -> io::Result<()> {
    writer.write_u64::<B>(pairs.len() as u64)?;
    for &[a, b] in pairs {
        writer.write_i32::<B>(a)?;
        writer.write_i32::<B>(b)?;
    }
    Ok(())
}

pub(crate) fn read_index_pairs<B: ByteOrder>(
    reader: &mut impl Read,
) -> Result<Vec<[i32; 2]>, LengthError> {
    let len = read_len::<B>(reader)?;
    let mut pairs = Vec::with_capacity(len.min(MAX_PREALLOCATION));
    for _ in 0..len {
        let a = reader.read_i32::<B>()?;
        let b = reader.read_i32::<B>()?;
        pairs.push([a, b]);
    }
    Ok(pairs)
}

/// `u64` count followed by the indices, the payload omitted when empty.
pub(crate) fn write_indices<B: ByteOrder>(
    writer: &mut impl Write,
    indices: &[i32],
) -> io::Result<()> {
    writer.write_u64::<B>(indices.len() as u64)?;
    for &index in indices {
        writer.write_i32::<B>(index)?;
    }
    Ok(())
}

pub(crate) fn read_indices<B: ByteOrder>(reader: &mut impl Read) -> Result<Vec<i32>, LengthError> {
    let len = read_len::<B>(reader)?;
    let mut indices = Vec::with_capacity(len.min(MAX_PREALLOCATION));
    for _ in 0..len {
        indices.push(reader.read_i32::<B>()?);
    }
    Ok(indices)
}

/// Presence byte followed by the vector when present.
pub(crate) fn write_optional_vector3<B: ByteOrder>(
    writer: &mut impl Write,
    vector: Option<&Vector3<f64>>,
) -> io::Result<()> {
    match vector {
        Some(vector) => {
            writer.write_u8(1)?;
            write_vector3::<B>(writer, vector)
        }
        None => writer.write_u8(0),
    }
}

pub(crate) fn read_len<B: ByteOrder>(reader: &mut impl Read) -> Result<usize, LengthError> {
    let len = reader.read_u64::<B>()?;
    usize::try_from(len).map_err(|_| LengthError::Overflow(len))
}

/// Reads a flag byte that must be `0` or `1`.
pub(crate) fn read_bool(reader: &mut impl Read) -> Result<bool, FlagError> {
    match reader.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(FlagError::Invalid(value)),
    }
}

/// Reads a `u64` unless the stream ends before its first byte.
///
/// A stream that ends partway through the value is an error.
pub(crate) fn read_u64_or_eof<B: ByteOrder>(reader: &mut impl Read) -> io::Result<Option<u64>> {
    let mut buf = [0u8; 8];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    match filled {
        0 => Ok(None),
        8 => Ok(Some(B::read_u64(&buf))),
        _ => Err(io::ErrorKind::UnexpectedEof.into()),
    }
}

/// Discards exactly `len` bytes.
pub(crate) fn skip_bytes(reader: &mut impl Read, len: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped == len {
        Ok(())
    } else {
        Err(io::ErrorKind::UnexpectedEof.into())
    }
}

#[derive(Debug)]
pub(crate) enum LengthError {
    Io(io::Error),
    Overflow(u64),
}

impl From<io::Error> for LengthError {
    fn from(e: io::Error) -> Self {
        LengthError::Io(e)
    }
}

#[derive(Debug)]
pub(crate) enum FlagError {
    Io(io::Error),
    Invalid(u8),
}

impl From<io::Error> for FlagError {
    fn from(e: io::Error) -> Self {
        FlagError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::NativeEndian;
    use sfm_core::nalgebra::Vector3 as V3;

    #[test]
    fn rigid3_is_bit_exact() {
        let pose = Isometry3::from_parts(
            Translation3::new(0.1, -2.5, 7.0),
            UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1),
        );
        let mut buf = vec![];
        write_rigid3::<NativeEndian>(&mut buf, &pose).unwrap();
        assert_eq!(buf.len(), 7 * 8);
        let back = read_rigid3::<NativeEndian>(&mut buf.as_slice()).unwrap();
        assert_eq!(back, pose);
    }

    #[test]
    fn empty_lists_have_no_payload() {
        let mut buf = vec![];
        write_index_pairs::<NativeEndian>(&mut buf, &[]).unwrap();
        write_indices::<NativeEndian>(&mut buf, &[]).unwrap();
        assert_eq!(buf.len(), 16);
    }

    #[test]
    fn eof_before_count_is_distinguished_from_partial_count() {
        let mut empty: &[u8] = &[];
        assert!(read_u64_or_eof::<NativeEndian>(&mut empty).unwrap().is_none());
        let mut partial: &[u8] = &[1, 2, 3];
        let err = read_u64_or_eof::<NativeEndian>(&mut partial).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        let bytes = 42u64.to_ne_bytes();
        assert_eq!(
            read_u64_or_eof::<NativeEndian>(&mut &bytes[..]).unwrap(),
            Some(42)
        );
    }

    #[test]
    fn optional_vector_flag() {
        let mut buf = vec![];
        write_optional_vector3::<NativeEndian>(&mut buf, Some(&V3::new(0.0, 0.0, -1.0))).unwrap();
        write_optional_vector3::<NativeEndian>(&mut buf, None).unwrap();
        assert_eq!(buf.len(), 1 + 24 + 1);
        let mut reader = buf.as_slice();
        assert!(read_bool(&mut reader).unwrap());
        assert_eq!(read_vector3::<NativeEndian>(&mut reader).unwrap(), V3::new(0.0, 0.0, -1.0));
        assert!(!read_bool(&mut reader).unwrap());
    }
}
