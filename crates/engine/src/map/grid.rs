use thiserror::Error;

/// Rectangular grid of tile symbols, stored row-major.
///
/// Symbol `0` is an empty cell; any other value is a 1-based index into a tileset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid has no cells")]
    Empty,
    #[error("row {row} has {actual} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error(
        "grid is {actual_width}x{actual_height} tiles, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

impl Grid {
    pub fn from_rows<R: AsRef<[u32]>>(rows: &[R]) -> Result<Self, GridError> {
        let Some(first) = rows.first() else {
            return Err(GridError::Empty);
        };
        let expected = first.as_ref().len();
        if expected == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(expected * rows.len());
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != expected {
                return Err(GridError::Ragged {
                    row,
                    expected,
                    actual: values.len(),
                });
            }
            cells.extend_from_slice(values);
        }

        Ok(Self {
            width: expected as u32,
            height: rows.len() as u32,
            cells,
        })
    }

    pub fn from_flat(width: u32, height: u32, cells: Vec<u32>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty);
        }
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(GridError::TileCountMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, col: u32, row: u32) -> Option<u32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.cells
            .get(row as usize * self.width as usize + col as usize)
            .copied()
    }

    /// Iterates `(col, row, symbol)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, symbol)| {
                let index = index as u32;
                (index % width, index / width, *symbol)
            })
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|symbol| *symbol == 0)
    }

    pub fn ensure_dimensions(&self, width: u32, height: u32) -> Result<(), GridError> {
        if self.width == width && self.height == height {
            return Ok(());
        }
        Err(GridError::DimensionMismatch {
            expected_width: width,
            expected_height: height,
            actual_width: self.width,
            actual_height: self.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_build_row_major_grid() {
        let grid = Grid::from_rows(&[vec![1u32, 2, 3], vec![4, 5, 6]]).expect("grid");

        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(0, 1), Some(4));
        assert_eq!(grid.get(2, 0), Some(3));
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let error = Grid::from_rows(&[vec![0u32, 0, 0], vec![0, 0]]).expect_err("ragged");
        assert_eq!(
            error,
            GridError::Ragged {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        let no_rows: [Vec<u32>; 0] = [];
        assert_eq!(Grid::from_rows(&no_rows), Err(GridError::Empty));
        assert_eq!(Grid::from_rows(&[Vec::<u32>::new()]), Err(GridError::Empty));
        assert_eq!(Grid::from_flat(0, 3, Vec::new()), Err(GridError::Empty));
    }

    #[test]
    fn flat_grid_checks_tile_count() {
        assert_eq!(
            Grid::from_flat(2, 2, vec![0; 3]),
            Err(GridError::TileCountMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn cells_iterate_with_coordinates() {
        let grid = Grid::from_rows(&[[0u32, 7], [9, 0]]).expect("grid");
        let non_zero = grid
            .cells()
            .filter(|(_, _, symbol)| *symbol != 0)
            .collect::<Vec<_>>();

        assert_eq!(non_zero, vec![(1, 0, 7), (0, 1, 9)]);
        assert!(!grid.is_blank());
    }

    #[test]
    fn dimension_check_reports_both_sizes() {
        let grid = Grid::from_flat(4, 2, vec![0; 8]).expect("grid");
        assert!(grid.ensure_dimensions(4, 2).is_ok());
        assert_eq!(
            grid.ensure_dimensions(4, 3),
            Err(GridError::DimensionMismatch {
                expected_width: 4,
                expected_height: 3,
                actual_width: 4,
                actual_height: 2,
            })
        );
    }
}
