//! Masked scalar fields.
//!
//! A [`ScalarField`] is a row-major 2-D array of `f64` with a parallel mask.
//! A `true` mask entry means "no data": the value must not reach the colour
//! mapper or the contour extractor. Non-finite values are always masked.

use crate::{TileError, TileResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub width: usize,
    pub height: usize,
    values: Vec<f64>,
    mask: Vec<bool>,
    /// Physical unit label, e.g. "Kelvin", "m/s"
    pub unit: String,
    /// Multiplicative factor registered for the variable
    pub scale_factor: f64,
}

impl ScalarField {
    /// Create a field from raw values; NaN and infinities become masked.
    pub fn from_values(width: usize, height: usize, values: Vec<f64>) -> TileResult<Self> {
        if values.len() != width * height {
            return Err(TileError::ShapeMismatch {
                expected: (height, width),
                actual: (values.len() / width.max(1), width),
            });
        }
        let mask = values.iter().map(|v| !v.is_finite()).collect();
        Ok(Self {
            width,
            height,
            values,
            mask,
            unit: String::new(),
            scale_factor: 1.0,
        })
    }

    /// Create a field with an explicit mask (combined with non-finite detection).
    pub fn with_mask(
        width: usize,
        height: usize,
        values: Vec<f64>,
        mask: Vec<bool>,
    ) -> TileResult<Self> {
        if mask.len() != width * height {
            return Err(TileError::ShapeMismatch {
                expected: (height, width),
                actual: (mask.len() / width.max(1), width),
            });
        }
        let mut field = Self::from_values(width, height, values)?;
        for (m, extra) in field.mask.iter_mut().zip(mask) {
            *m |= extra;
        }
        Ok(field)
    }

    /// A field with the same value everywhere.
    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Self {
            width,
            height,
            values: vec![value; width * height],
            mask: vec![!value.is_finite(); width * height],
            unit: String::new(),
            scale_factor: 1.0,
        }
    }

    /// A field with no valid cells.
    pub fn fully_masked(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![f64::NAN; width * height],
            mask: vec![true; width * height],
            unit: String::new(),
            scale_factor: 1.0,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_scale_factor(mut self, factor: f64) -> Self {
        self.scale_factor = factor;
        self
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `(row, col)`, or `None` when masked.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let idx = row * self.width + col;
        if self.mask[idx] {
            None
        } else {
            Some(self.values[idx])
        }
    }

    /// Value at a flat index, or `None` when masked.
    pub fn value(&self, idx: usize) -> Option<f64> {
        if self.mask[idx] {
            None
        } else {
            Some(self.values[idx])
        }
    }

    pub fn is_masked(&self, idx: usize) -> bool {
        self.mask[idx]
    }

    /// Raw values including whatever sits under masked cells.
    pub fn raw_values(&self) -> &[f64] {
        &self.values
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    /// Apply `f` to every valid cell. Results that are not finite become masked.
    pub fn map_valid<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for (v, m) in self.values.iter_mut().zip(self.mask.iter_mut()) {
            if *m {
                continue;
            }
            *v = f(*v);
            if !v.is_finite() {
                *m = true;
            }
        }
    }

    /// Combine two same-shaped fields cell by cell. The result mask is the
    /// union of both masks plus any non-finite result.
    pub fn zip_with<F>(&self, other: &ScalarField, f: F) -> TileResult<ScalarField>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.shape() != other.shape() {
            return Err(TileError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        let mut values = Vec::with_capacity(self.len());
        let mut mask = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            if self.mask[i] || other.mask[i] {
                values.push(f64::NAN);
                mask.push(true);
                continue;
            }
            let v = f(self.values[i], other.values[i]);
            mask.push(!v.is_finite());
            values.push(v);
        }
        Ok(ScalarField {
            width: self.width,
            height: self.height,
            values,
            mask,
            unit: self.unit.clone(),
            scale_factor: self.scale_factor,
        })
    }

    /// Mask every cell for which `predicate(idx)` is true.
    pub fn mask_where<P>(&mut self, predicate: P)
    where
        P: Fn(usize) -> bool,
    {
        for (idx, m) in self.mask.iter_mut().enumerate() {
            if predicate(idx) {
                *m = true;
            }
        }
    }

    /// Copy of the values with masked cells replaced by `fill`.
    pub fn filled_with(&self, fill: f64) -> Vec<f64> {
        self.values
            .iter()
            .zip(&self.mask)
            .map(|(&v, &m)| if m { fill } else { v })
            .collect()
    }
}
