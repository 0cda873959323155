//! Binary histogram format produced by the analyzer.
//!
//! ```text
//! u8      version (always 1)
//! u8      type tag (see HistogramKind)
//! u8      dimensions D
//! u8 x D  abscissa (edge) element size per axis, 4 or 8
//! u8      ordinate (bin content) element size, 4 or 8
//! pad 4   u32 x D bin counts, excluding under/overflow
//! per axis: pad to abscissa size, low edge, high edge
//! pad 8   u64 entries
//! pad to ordinate size, prod(bins + 2) content elements
//! ```
//!
//! All numbers are little endian. Padding is computed from the current offset, so the
//! position of every field depends on what came before it.
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, ErrorKind};

use super::constants::HISTOGRAM_FORMAT_VERSION;
use super::error::DecodeError;
use super::histogram::{total_bins, Axis, BinContent, ElementType, HistogramKind, HistogramSnapshot};

/// Round `offset` up to the next multiple of `alignment`
fn align_to(offset: u64, alignment: u64) -> u64 {
    let remainder = offset % alignment;
    if remainder == 0 {
        offset
    } else {
        offset + (alignment - remainder)
    }
}

fn skip_padding(cursor: &mut Cursor<&[u8]>, alignment: u8) {
    let aligned = align_to(cursor.position(), alignment as u64);
    cursor.set_position(aligned);
}

fn read_float(cursor: &mut Cursor<&[u8]>, size: u8) -> Result<f64, DecodeError> {
    match size {
        4 => Ok(cursor.read_f32::<LittleEndian>()? as f64),
        8 => Ok(cursor.read_f64::<LittleEndian>()?),
        _ => Err(DecodeError::UnknownAbscissaSize(size)),
    }
}

fn check_element_size(size: u8) -> bool {
    size == 4 || size == 8
}

/// Decode one histogram payload (transport header already removed).
///
/// Either the whole buffer decodes or an error is returned; there are no partial results.
pub fn decode_histogram(buffer: &[u8]) -> Result<HistogramSnapshot, DecodeError> {
    let mut cursor = Cursor::new(buffer);

    let version = cursor.read_u8()?;
    if version != HISTOGRAM_FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let kind = HistogramKind::try_from(cursor.read_u8()?)?;
    let dimensions = cursor.read_u8()?;
    if dimensions as usize != kind.dimensions() {
        return Err(DecodeError::DimensionMismatch {
            kind: kind.name(),
            expected: kind.dimensions(),
            found: dimensions,
        });
    }

    let mut abscissa_sizes: Vec<u8> = Vec::with_capacity(dimensions as usize);
    for _ in 0..dimensions {
        let size = cursor.read_u8()?;
        if !check_element_size(size) {
            return Err(DecodeError::UnknownAbscissaSize(size));
        }
        abscissa_sizes.push(size);
    }

    let ordinate_size = cursor.read_u8()?;
    if !check_element_size(ordinate_size) {
        return Err(DecodeError::UnknownOrdinateSize(ordinate_size));
    }
    if ordinate_size as usize != kind.element().size() {
        return Err(DecodeError::OrdinateSizeMismatch {
            kind: kind.name(),
            expected: kind.element().size(),
            found: ordinate_size,
        });
    }

    skip_padding(&mut cursor, 4);
    let mut bin_counts: Vec<u32> = Vec::with_capacity(dimensions as usize);
    for _ in 0..dimensions {
        bin_counts.push(cursor.read_u32::<LittleEndian>()?);
    }

    let mut axes: Vec<Axis> = Vec::with_capacity(dimensions as usize);
    for (bins, size) in bin_counts.iter().zip(abscissa_sizes.iter()) {
        skip_padding(&mut cursor, *size);
        let low_edge = read_float(&mut cursor, *size)?;
        let high_edge = read_float(&mut cursor, *size)?;
        axes.push(Axis::new(*bins, low_edge, high_edge));
    }

    skip_padding(&mut cursor, 8);
    let entries = cursor.read_u64::<LittleEndian>()?;

    skip_padding(&mut cursor, ordinate_size);
    let n_bins = total_bins(&axes).ok_or(DecodeError::TooManyBins)?;
    // Refuse to allocate for content that can't be in the buffer
    let remaining = (buffer.len() as u64).saturating_sub(cursor.position());
    let fits = matches!(
        (n_bins as u64).checked_mul(ordinate_size as u64),
        Some(required) if required <= remaining
    );
    if !fits {
        return Err(DecodeError::IOError(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!(
                "histogram content needs {n_bins} bins of {ordinate_size} bytes but only {remaining} bytes remain"
            ),
        )));
    }

    let content = match kind.element() {
        ElementType::F32 => {
            let mut values = vec![0.0f32; n_bins];
            cursor.read_f32_into::<LittleEndian>(&mut values)?;
            BinContent::F32(values)
        }
        ElementType::F64 => {
            let mut values = vec![0.0f64; n_bins];
            cursor.read_f64_into::<LittleEndian>(&mut values)?;
            BinContent::F64(values)
        }
        ElementType::U32 => {
            let mut values = vec![0u32; n_bins];
            cursor.read_u32_into::<LittleEndian>(&mut values)?;
            BinContent::U32(values)
        }
    };

    HistogramSnapshot::new(kind, axes, entries, content)
}

fn write_padding(buffer: &mut Vec<u8>, alignment: u8) {
    let aligned = align_to(buffer.len() as u64, alignment as u64) as usize;
    buffer.resize(aligned, 0);
}

/// Serialize a snapshot in the analyzer's layout.
///
/// Edges are written as 4 byte floats for 32 bit float histograms and as 8 byte floats
/// otherwise.
pub fn encode_histogram(histogram: &HistogramSnapshot) -> Result<Vec<u8>, std::io::Error> {
    let kind = histogram.kind();
    let abscissa_size: u8 = if kind.element() == ElementType::F32 {
        4
    } else {
        8
    };
    let ordinate_size = kind.element().size() as u8;

    let mut buffer: Vec<u8> = Vec::new();
    buffer.write_u8(HISTOGRAM_FORMAT_VERSION)?;
    buffer.write_u8(kind.tag())?;
    buffer.write_u8(histogram.dimensions() as u8)?;
    for _ in histogram.axes() {
        buffer.write_u8(abscissa_size)?;
    }
    buffer.write_u8(ordinate_size)?;

    write_padding(&mut buffer, 4);
    for axis in histogram.axes() {
        buffer.write_u32::<LittleEndian>(axis.bins)?;
    }

    for axis in histogram.axes() {
        write_padding(&mut buffer, abscissa_size);
        if abscissa_size == 4 {
            buffer.write_f32::<LittleEndian>(axis.low_edge as f32)?;
            buffer.write_f32::<LittleEndian>(axis.high_edge as f32)?;
        } else {
            buffer.write_f64::<LittleEndian>(axis.low_edge)?;
            buffer.write_f64::<LittleEndian>(axis.high_edge)?;
        }
    }

    write_padding(&mut buffer, 8);
    buffer.write_u64::<LittleEndian>(histogram.entries())?;

    write_padding(&mut buffer, ordinate_size);
    match histogram.content() {
        BinContent::F32(values) => {
            for value in values {
                buffer.write_f32::<LittleEndian>(*value)?;
            }
        }
        BinContent::F64(values) => {
            for value in values {
                buffer.write_f64::<LittleEndian>(*value)?;
            }
        }
        BinContent::U32(values) => {
            for value in values {
                buffer.write_u32::<LittleEndian>(*value)?;
            }
        }
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_for(kind: HistogramKind, n: usize) -> BinContent {
        match kind.element() {
            ElementType::F32 => BinContent::F32((0..n).map(|i| i as f32 * 0.5).collect()),
            ElementType::F64 => BinContent::F64((0..n).map(|i| i as f64 * 0.25).collect()),
            ElementType::U32 => BinContent::U32((0..n).map(|i| i as u32 * 3).collect()),
        }
    }

    fn axes_for(kind: HistogramKind) -> Vec<Axis> {
        if kind.dimensions() == 1 {
            vec![Axis::new(10, -5.0, 5.0)]
        } else {
            vec![Axis::new(4, 0.0, 8.0), Axis::new(3, -1.5, 1.5)]
        }
    }

    #[test]
    fn test_roundtrip_1d_float32() {
        let bins = 37;
        let content: Vec<f32> = (0..bins + 2).map(|i| (i as f32).sqrt() * 1.75).collect();
        let hist = HistogramSnapshot::new(
            HistogramKind::Histogram1DF,
            vec![Axis::new(bins as u32, -12.5, 117.25)],
            123_456_789_012,
            BinContent::F32(content.clone()),
        )
        .unwrap();

        let decoded = decode_histogram(&encode_histogram(&hist).unwrap()).unwrap();
        assert_eq!(decoded.kind(), HistogramKind::Histogram1DF);
        assert_eq!(decoded.axes()[0].bins, bins as u32);
        assert!((decoded.axes()[0].low_edge - -12.5).abs() < 1e-6);
        assert!((decoded.axes()[0].high_edge - 117.25).abs() < 1e-4);
        assert_eq!(decoded.entries(), 123_456_789_012);
        assert_eq!(decoded.content(), &BinContent::F32(content));
    }

    #[test]
    fn test_every_kind_decodes_to_its_element_type() {
        for tag in 0..7u8 {
            let kind = HistogramKind::try_from(tag).unwrap();
            let axes = axes_for(kind);
            let n = total_bins(&axes).unwrap();
            let hist = HistogramSnapshot::new(kind, axes, 42, content_for(kind, n)).unwrap();

            let decoded = decode_histogram(&encode_histogram(&hist).unwrap()).unwrap();
            assert_eq!(decoded.kind(), kind);
            assert_eq!(decoded.content().element(), kind.element());
            assert_eq!(decoded.content().len(), decoded.total_bins());
            let expected: usize = decoded.axes().iter().map(|a| a.bins as usize + 2).product();
            assert_eq!(decoded.content().len(), expected);
        }
    }

    /// 1-D histogram with 8 byte edges: the edges have to skip from offset 12 to 16
    #[test]
    fn test_padding_before_wide_edges() {
        let mut buffer: Vec<u8> = vec![1, 1, 1, 8, 8]; // version, 1DD, 1 dim, f64 edges, f64 bins
        buffer.resize(8, 0xAA); // garbage in the padding must be ignored
        buffer.extend_from_slice(&2u32.to_le_bytes()); // 8..12
        buffer.resize(16, 0xAA);
        buffer.extend_from_slice(&(-1.0f64).to_le_bytes()); // 16..24
        buffer.extend_from_slice(&3.0f64.to_le_bytes()); // 24..32
        buffer.extend_from_slice(&7u64.to_le_bytes()); // 32..40
        for value in [0.5f64, 1.5, 2.5, 3.5] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }

        let hist = decode_histogram(&buffer).unwrap();
        assert_eq!(hist.axes(), &[Axis::new(2, -1.0, 3.0)]);
        assert_eq!(hist.entries(), 7);
        assert_eq!(hist.content(), &BinContent::F64(vec![0.5, 1.5, 2.5, 3.5]));
    }

    /// 1-D histogram with 4 byte edges: the entry counter has to skip from 20 to 24
    #[test]
    fn test_padding_before_entries() {
        let mut buffer: Vec<u8> = vec![1, 3, 1, 4, 4]; // version, 1DI, 1 dim, f32 edges, u32 bins
        buffer.resize(8, 0);
        buffer.extend_from_slice(&1u32.to_le_bytes()); // 8..12
        buffer.extend_from_slice(&0.0f32.to_le_bytes()); // 12..16
        buffer.extend_from_slice(&10.0f32.to_le_bytes()); // 16..20
        buffer.resize(24, 0xFF);
        buffer.extend_from_slice(&99u64.to_le_bytes()); // 24..32
        for value in [4u32, 5, 6] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }

        let hist = decode_histogram(&buffer).unwrap();
        assert_eq!(hist.axes(), &[Axis::new(1, 0.0, 10.0)]);
        assert_eq!(hist.entries(), 99);
        assert_eq!(hist.content(), &BinContent::U32(vec![4, 5, 6]));
    }

    #[test]
    fn test_bad_version() {
        let hist = HistogramSnapshot::new(
            HistogramKind::Histogram1DF,
            axes_for(HistogramKind::Histogram1DF),
            0,
            content_for(HistogramKind::Histogram1DF, 12),
        )
        .unwrap();
        let mut buffer = encode_histogram(&hist).unwrap();
        buffer[0] = 2;
        assert!(matches!(
            decode_histogram(&buffer),
            Err(DecodeError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_bad_header_fields() {
        assert!(matches!(
            decode_histogram(&[1, 9, 1, 4, 4]),
            Err(DecodeError::UnknownHistogramKind(9))
        ));
        assert!(matches!(
            decode_histogram(&[1, 0, 2, 4, 4, 4]),
            Err(DecodeError::DimensionMismatch { found: 2, .. })
        ));
        assert!(matches!(
            decode_histogram(&[1, 0, 1, 2, 4]),
            Err(DecodeError::UnknownAbscissaSize(2))
        ));
        assert!(matches!(
            decode_histogram(&[1, 0, 1, 4, 3]),
            Err(DecodeError::UnknownOrdinateSize(3))
        ));
        assert!(matches!(
            decode_histogram(&[1, 0, 1, 4, 8]),
            Err(DecodeError::OrdinateSizeMismatch { found: 8, .. })
        ));
    }

    #[test]
    fn test_huge_bin_counts_are_rejected() {
        let mut buffer: Vec<u8> = vec![1, 4, 2, 4, 4, 4, 0, 0];
        buffer.write_u32::<LittleEndian>(u32::MAX).unwrap();
        buffer.write_u32::<LittleEndian>(u32::MAX).unwrap();
        for edge in [0.0f32, 1.0, 0.0, 1.0] {
            buffer.write_f32::<LittleEndian>(edge).unwrap();
        }
        buffer.write_u64::<LittleEndian>(7).unwrap();
        buffer.extend_from_slice(&[0; 16]);
        assert!(matches!(
            decode_histogram(&buffer),
            Err(DecodeError::TooManyBins)
        ));
    }

    #[test]
    fn test_truncated_content_fails() {
        let kind = HistogramKind::Histogram2DI;
        let axes = axes_for(kind);
        let n = total_bins(&axes).unwrap();
        let hist = HistogramSnapshot::new(kind, axes, 1, content_for(kind, n)).unwrap();
        let buffer = encode_histogram(&hist).unwrap();
        let result = decode_histogram(&buffer[..buffer.len() - 4]);
        assert!(matches!(result, Err(DecodeError::IOError(_))));
        assert!(matches!(decode_histogram(&[]), Err(DecodeError::IOError(_))));
    }
}
