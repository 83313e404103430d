//! Owned multi-component grid tensor.
//!
//! A [`Field`] stores `components` planes of `width * height` cells back to
//! back. Rules copy channel contents into fields, transform them, and hand
//! them back to the registry for commit.

use crate::error::{Result, SimError};
use eincasm_data::Shape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    shape: Shape,
    components: usize,
    data: Vec<f32>,
}

impl Field {
    #[must_use]
    pub fn zeros(shape: Shape, components: usize) -> Self {
        Self::filled(shape, components, 0.0)
    }

    #[must_use]
    pub fn filled(shape: Shape, components: usize, value: f32) -> Self {
        Self {
            shape,
            components,
            data: vec![value; shape.cells() * components],
        }
    }

    pub fn from_vec(shape: Shape, components: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != shape.cells() * components {
            return Err(SimError::configuration(format!(
                "field data has {} values, expected {} ({}x{}x{})",
                data.len(),
                shape.cells() * components,
                shape.width,
                shape.height,
                components
            )));
        }
        Ok(Self {
            shape,
            components,
            data,
        })
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.components
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    #[must_use]
    pub fn plane(&self, c: usize) -> &[f32] {
        let n = self.shape.cells();
        &self.data[c * n..(c + 1) * n]
    }

    pub fn plane_mut(&mut self, c: usize) -> &mut [f32] {
        let n = self.shape.cells();
        &mut self.data[c * n..(c + 1) * n]
    }

    /// Iterator over component planes.
    pub fn planes(&self) -> std::slice::Chunks<'_, f32> {
        self.data.chunks(self.shape.cells().max(1))
    }

    pub fn planes_mut(&mut self) -> std::slice::ChunksMut<'_, f32> {
        let n = self.shape.cells().max(1);
        self.data.chunks_mut(n)
    }

    #[inline(always)]
    #[must_use]
    pub fn get(&self, c: usize, x: usize, y: usize) -> f32 {
        self.data[c * self.shape.cells() + self.shape.index(x, y)]
    }

    #[inline(always)]
    pub fn set(&mut self, c: usize, x: usize, y: usize, v: f32) {
        let idx = c * self.shape.cells() + self.shape.index(x, y);
        self.data[idx] = v;
    }

    /// Single-component field holding a copy of plane `c`.
    #[must_use]
    pub fn component(&self, c: usize) -> Field {
        Field {
            shape: self.shape,
            components: 1,
            data: self.plane(c).to_vec(),
        }
    }

    /// Splits off consecutive sub-fields of the given component counts.
    pub fn split(&self, counts: &[usize]) -> Result<Vec<Field>> {
        let total: usize = counts.iter().sum();
        if total != self.components {
            return Err(SimError::configuration(format!(
                "cannot split {} components into {:?}",
                self.components, counts
            )));
        }
        let n = self.shape.cells();
        let mut start = 0;
        Ok(counts
            .iter()
            .map(|&k| {
                let data = self.data[start * n..(start + k) * n].to_vec();
                start += k;
                Field {
                    shape: self.shape,
                    components: k,
                    data,
                }
            })
            .collect())
    }

    /// Sum in f64 to keep conservation checks stable on large grids.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    #[must_use]
    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    #[must_use]
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_checks_length() {
        let shape = Shape::new(2, 2);
        assert!(Field::from_vec(shape, 2, vec![0.0; 8]).is_ok());
        assert!(Field::from_vec(shape, 2, vec![0.0; 7]).is_err());
    }

    #[test]
    fn test_planes_are_component_major() {
        let shape = Shape::new(2, 1);
        let field = Field::from_vec(shape, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(field.plane(1), &[3.0, 4.0]);
        assert_eq!(field.get(1, 1, 0), 4.0);
        assert_eq!(field.sum(), 10.0);
    }

    #[test]
    fn test_split() {
        let shape = Shape::new(1, 1);
        let field = Field::from_vec(shape, 3, vec![1.0, 2.0, 3.0]).unwrap();
        let parts = field.split(&[1, 2]).unwrap();
        assert_eq!(parts[0].as_slice(), &[1.0]);
        assert_eq!(parts[1].as_slice(), &[2.0, 3.0]);
        assert!(field.split(&[1, 1]).is_err());
    }
}
