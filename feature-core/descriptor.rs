use crate::keypoint::Keypoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Element type and width of one descriptor row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DescriptorLayout {
    /// Packed bit string compared with the Hamming distance
    Binary { bytes: usize },
    /// Real-valued vector compared with the L2 distance
    Float { len: usize },
}

impl DescriptorLayout {
    /// Number of elements per row (bytes or floats)
    pub fn width(&self) -> usize {
        match *self {
            DescriptorLayout::Binary { bytes } => bytes,
            DescriptorLayout::Float { len } => len,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, DescriptorLayout::Binary { .. })
    }
}

impl std::fmt::Display for DescriptorLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorLayout::Binary { bytes } => write!(f, "binary[{} bytes]", bytes),
            DescriptorLayout::Float { len } => write!(f, "float[{}]", len),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Storage {
    Binary(Vec<u8>),
    Float(Vec<f32>),
}

/// Row-major descriptor matrix, row `i` describing keypoint `i`
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorMatrix {
    layout: DescriptorLayout,
    storage: Storage,
    rows: usize,
}

impl DescriptorMatrix {
    /// Zero-row matrix that still remembers its layout
    pub fn empty(layout: DescriptorLayout) -> Self {
        let storage = match layout {
            DescriptorLayout::Binary { .. } => Storage::Binary(Vec::new()),
            DescriptorLayout::Float { .. } => Storage::Float(Vec::new()),
        };
        Self {
            layout,
            storage,
            rows: 0,
        }
    }

    /// Builds a binary matrix from fixed-width rows
    ///
    /// # Panics
    ///
    /// Panics if any row is not `bytes` long. Providers emit fixed widths,
    /// so a mismatch is a bug in the provider.
    pub fn from_binary_rows<R: AsRef<[u8]>>(bytes: usize, rows: impl IntoIterator<Item = R>) -> Self {
        let mut data = Vec::new();
        let mut count = 0;
        for row in rows {
            let row = row.as_ref();
            assert_eq!(row.len(), bytes, "binary descriptor row width mismatch");
            data.extend_from_slice(row);
            count += 1;
        }
        Self {
            layout: DescriptorLayout::Binary { bytes },
            storage: Storage::Binary(data),
            rows: count,
        }
    }

    /// Builds a float matrix from fixed-width rows
    ///
    /// # Panics
    ///
    /// Panics if any row is not `len` long.
    pub fn from_float_rows<R: AsRef<[f32]>>(len: usize, rows: impl IntoIterator<Item = R>) -> Self {
        let mut data = Vec::new();
        let mut count = 0;
        for row in rows {
            let row = row.as_ref();
            assert_eq!(row.len(), len, "float descriptor row width mismatch");
            data.extend_from_slice(row);
            count += 1;
        }
        Self {
            layout: DescriptorLayout::Float { len },
            storage: Storage::Float(data),
            rows: count,
        }
    }

    pub fn layout(&self) -> DescriptorLayout {
        self.layout
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Total number of stored elements
    pub fn size(&self) -> usize {
        self.rows * self.layout.width()
    }

    pub fn binary_row(&self, i: usize) -> Option<&[u8]> {
        match &self.storage {
            Storage::Binary(data) if i < self.rows => {
                let w = self.layout.width();
                Some(&data[i * w..(i + 1) * w])
            }
            _ => None,
        }
    }

    pub fn float_row(&self, i: usize) -> Option<&[f32]> {
        match &self.storage {
            Storage::Float(data) if i < self.rows => {
                let w = self.layout.width();
                Some(&data[i * w..(i + 1) * w])
            }
            _ => None,
        }
    }

    /// Iterator over binary rows; empty for float matrices
    pub fn binary_rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.rows).filter_map(move |i| self.binary_row(i))
    }
}

/// Descriptor provider output: the keypoints it actually described and their rows
#[derive(Debug, Clone, PartialEq)]
pub struct Described {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: DescriptorMatrix,
}

impl Described {
    pub fn empty(layout: DescriptorLayout) -> Self {
        Self {
            keypoints: Vec::new(),
            descriptors: DescriptorMatrix::empty(layout),
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.keypoints.len() == self.descriptors.rows()
    }
}
