use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected neighbor-offset kernels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("kernel must have the origin (0, 0) at index 0")]
    MissingOrigin,
    #[error("kernel must have an odd number of offsets (origin + symmetric pairs), got {0}")]
    EvenLength(usize),
    #[error("kernel offset {index} {offset:?} is not the antipode of {antipode:?}")]
    Asymmetric {
        index: usize,
        offset: (i32, i32),
        antipode: (i32, i32),
    },
}

/// Fixed neighbor offsets used for toroidal exchange.
///
/// Index 0 is the origin. Neighbors `1..n` are ordered so that direction
/// `i` and `i + (n - 1) / 2` (cyclically, over the neighbor slots) point in
/// opposite directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(i32, i32)>", into = "Vec<(i32, i32)>")]
pub struct Kernel {
    offsets: Vec<(i32, i32)>,
}

impl Kernel {
    pub fn new(offsets: Vec<(i32, i32)>) -> Result<Self, KernelError> {
        if offsets.first() != Some(&(0, 0)) {
            return Err(KernelError::MissingOrigin);
        }
        if offsets.len() % 2 == 0 {
            return Err(KernelError::EvenLength(offsets.len()));
        }
        let kernel = Self { offsets };
        for i in 1..kernel.len() {
            let (dx, dy) = kernel.offsets[i];
            let anti = kernel.offsets[kernel.antipode(i)];
            if anti != (-dx, -dy) {
                return Err(KernelError::Asymmetric {
                    index: i,
                    offset: (dx, dy),
                    antipode: anti,
                });
            }
        }
        Ok(kernel)
    }

    /// Origin, up, right, down, left.
    #[must_use]
    pub fn von_neumann() -> Self {
        Self {
            offsets: vec![(0, 0), (0, -1), (1, 0), (0, 1), (-1, 0)],
        }
    }

    /// Origin plus the eight surrounding cells, clockwise from up.
    #[must_use]
    pub fn moore() -> Self {
        Self {
            offsets: vec![
                (0, 0),
                (0, -1),
                (1, -1),
                (1, 0),
                (1, 1),
                (0, 1),
                (-1, 1),
                (-1, 0),
                (-1, -1),
            ],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[must_use]
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    #[must_use]
    pub fn offset(&self, i: usize) -> (i32, i32) {
        self.offsets[i]
    }

    /// Index of the direction opposite to neighbor `i`. The origin is its own antipode.
    #[must_use]
    pub fn antipode(&self, i: usize) -> usize {
        if i == 0 {
            return 0;
        }
        let n = self.offsets.len() - 1;
        1 + (i - 1 + n / 2) % n
    }
}

impl TryFrom<Vec<(i32, i32)>> for Kernel {
    type Error = KernelError;

    fn try_from(offsets: Vec<(i32, i32)>) -> Result<Self, Self::Error> {
        Self::new(offsets)
    }
}

impl From<Kernel> for Vec<(i32, i32)> {
    fn from(kernel: Kernel) -> Self {
        kernel.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kernels_are_symmetric() {
        assert!(Kernel::new(Kernel::von_neumann().offsets().to_vec()).is_ok());
        assert!(Kernel::new(Kernel::moore().offsets().to_vec()).is_ok());
    }

    #[test]
    fn test_antipode_pairs() {
        let k = Kernel::von_neumann();
        assert_eq!(k.antipode(0), 0);
        assert_eq!(k.antipode(1), 3);
        assert_eq!(k.antipode(2), 4);
        assert_eq!(k.antipode(3), 1);
        assert_eq!(k.antipode(4), 2);
    }

    #[test]
    fn test_rejects_bad_kernels() {
        assert_eq!(
            Kernel::new(vec![(1, 0), (0, 0), (-1, 0)]),
            Err(KernelError::MissingOrigin)
        );
        assert_eq!(
            Kernel::new(vec![(0, 0), (1, 0)]),
            Err(KernelError::EvenLength(2))
        );
        assert!(matches!(
            Kernel::new(vec![(0, 0), (1, 0), (0, 1)]),
            Err(KernelError::Asymmetric { index: 1, .. })
        ));
    }

    #[test]
    fn test_serde_validates() {
        let json = serde_json::to_string(&Kernel::von_neumann()).unwrap();
        let back: Kernel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Kernel::von_neumann());
        assert!(serde_json::from_str::<Kernel>("[[0,0],[1,0],[0,1]]").is_err());
    }
}
