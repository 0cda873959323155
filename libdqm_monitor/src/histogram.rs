use ndarray::Array2;

use super::error::DecodeError;

/// The element type of the bin content array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    F32,
    F64,
    U32,
}

impl ElementType {
    /// Size of one element in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::F32 | Self::U32 => 4,
            Self::F64 => 8,
        }
    }
}

/// The histogram flavours the analyzer can serialize, keyed by their type tag.
///
/// The tag is the index into the analyzer's plot collection variant. The wire format
/// carries the dimensions and element sizes redundantly, but the tag is the only place
/// that says whether the bin content is integer or floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramKind {
    Histogram1DF,
    Histogram1DD,
    Histogram2DF,
    Histogram1DI,
    Histogram2DI,
    /// Identical to Histogram2DF by the time it is serialized
    RollingHistogram2DF,
    Histogram2DD,
}

impl TryFrom<u8> for HistogramKind {
    type Error = DecodeError;
    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Histogram1DF),
            1 => Ok(Self::Histogram1DD),
            2 => Ok(Self::Histogram2DF),
            3 => Ok(Self::Histogram1DI),
            4 => Ok(Self::Histogram2DI),
            5 => Ok(Self::RollingHistogram2DF),
            6 => Ok(Self::Histogram2DD),
            _ => Err(DecodeError::UnknownHistogramKind(tag)),
        }
    }
}

impl HistogramKind {
    pub fn tag(&self) -> u8 {
        match self {
            Self::Histogram1DF => 0,
            Self::Histogram1DD => 1,
            Self::Histogram2DF => 2,
            Self::Histogram1DI => 3,
            Self::Histogram2DI => 4,
            Self::RollingHistogram2DF => 5,
            Self::Histogram2DD => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Histogram1DF => "Histogram1DF",
            Self::Histogram1DD => "Histogram1DD",
            Self::Histogram2DF => "Histogram2DF",
            Self::Histogram1DI => "Histogram1DI",
            Self::Histogram2DI => "Histogram2DI",
            Self::RollingHistogram2DF => "RollingHistogram2DF",
            Self::Histogram2DD => "Histogram2DD",
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Self::Histogram1DF | Self::Histogram1DD | Self::Histogram1DI => 1,
            Self::Histogram2DF
            | Self::Histogram2DI
            | Self::RollingHistogram2DF
            | Self::Histogram2DD => 2,
        }
    }

    pub fn element(&self) -> ElementType {
        match self {
            Self::Histogram1DF | Self::Histogram2DF | Self::RollingHistogram2DF => {
                ElementType::F32
            }
            Self::Histogram1DD | Self::Histogram2DD => ElementType::F64,
            Self::Histogram1DI | Self::Histogram2DI => ElementType::U32,
        }
    }
}

/// Binning of one axis. The bin count excludes the under and overflow bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    pub bins: u32,
    pub low_edge: f64,
    pub high_edge: f64,
}

impl Axis {
    pub fn new(bins: u32, low_edge: f64, high_edge: f64) -> Self {
        Self {
            bins,
            low_edge,
            high_edge,
        }
    }

    /// Number of cells along this axis including underflow and overflow
    pub fn cells(&self) -> usize {
        (self.bins as usize).saturating_add(2)
    }

    pub fn bin_width(&self) -> f64 {
        if self.bins == 0 {
            0.0
        } else {
            (self.high_edge - self.low_edge) / self.bins as f64
        }
    }
}

/// Bin content, typed by the histogram kind
#[derive(Debug, Clone, PartialEq)]
pub enum BinContent {
    F32(Vec<f32>),
    F64(Vec<f64>),
    U32(Vec<u32>),
}

impl BinContent {
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self) -> ElementType {
        match self {
            Self::F32(_) => ElementType::F32,
            Self::F64(_) => ElementType::F64,
            Self::U32(_) => ElementType::U32,
        }
    }

    /// Widen every bin to f64, which is what plotting wants anyway
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::F32(v) => v.iter().map(|x| *x as f64).collect(),
            Self::F64(v) => v.clone(),
            Self::U32(v) => v.iter().map(|x| *x as f64).collect(),
        }
    }

    pub fn sum(&self) -> f64 {
        match self {
            Self::F32(v) => v.iter().map(|x| *x as f64).sum(),
            Self::F64(v) => v.iter().sum(),
            Self::U32(v) => v.iter().map(|x| *x as f64).sum(),
        }
    }
}

/// A point-in-time copy of one histogram retrieved from the analyzer.
///
/// The content holds `prod(bins + 2)` values: every axis carries one underflow and one
/// overflow bin. For 2-D histograms the x axis runs fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    kind: HistogramKind,
    axes: Vec<Axis>,
    entries: u64,
    content: BinContent,
}

impl HistogramSnapshot {
    /// Assemble a snapshot, checking the axes and content against the kind
    pub fn new(
        kind: HistogramKind,
        axes: Vec<Axis>,
        entries: u64,
        content: BinContent,
    ) -> Result<Self, DecodeError> {
        if axes.len() != kind.dimensions() {
            return Err(DecodeError::DimensionMismatch {
                kind: kind.name(),
                expected: kind.dimensions(),
                found: axes.len() as u8,
            });
        }
        if content.element() != kind.element() {
            return Err(DecodeError::OrdinateSizeMismatch {
                kind: kind.name(),
                expected: kind.element().size(),
                found: content.element().size() as u8,
            });
        }
        let expected = total_bins(&axes).ok_or(DecodeError::TooManyBins)?;
        if content.len() != expected {
            return Err(DecodeError::BadContentLength {
                expected,
                found: content.len(),
            });
        }
        Ok(Self {
            kind,
            axes,
            entries,
            content,
        })
    }

    pub fn kind(&self) -> HistogramKind {
        self.kind
    }

    pub fn dimensions(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn content(&self) -> &BinContent {
        &self.content
    }

    /// Checked against the axes on construction
    pub fn total_bins(&self) -> usize {
        self.content.len()
    }

    /// The content of a 2-D histogram as a (y, x) grid, under/overflow included.
    ///
    /// Returns None for 1-D histograms.
    pub fn grid(&self) -> Option<Array2<f64>> {
        if self.dimensions() != 2 {
            return None;
        }
        let shape = (self.axes[1].cells(), self.axes[0].cells());
        Array2::from_shape_vec(shape, self.content.to_f64()).ok()
    }
}

/// Total number of cells for a set of axes, under/overflow included.
///
/// None if the count doesn't fit in a usize.
pub fn total_bins(axes: &[Axis]) -> Option<usize> {
    axes.iter()
        .try_fold(1usize, |acc, axis| acc.checked_mul(axis.cells()))
}
