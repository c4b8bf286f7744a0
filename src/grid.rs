//! Sizing and cell addressing for the shared multi-panel figure.

/// Returns the smallest non-negative `i` with `i * i >= n`.
///
/// `n = 0` yields `0`, i.e. an empty grid.
///
/// # Examples
///
/// ```rust
/// use infer_viz::grid::smallest_square_bigger_than;
///
/// assert_eq!(smallest_square_bigger_than(5), 3);
/// assert_eq!(smallest_square_bigger_than(9), 3);
/// ```
pub fn smallest_square_bigger_than(n: usize) -> usize {
    let mut i = (n as f64).sqrt() as usize;
    // The float estimate may be off by one in either direction for large n.
    while i > 0 && (i - 1) * (i - 1) >= n {
        i -= 1;
    }
    while i * i < n {
        i += 1;
    }
    i
}

/// A square grid of `side × side` cells filled in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    side: usize,
}

impl GridLayout {
    /// The smallest square layout that holds `n_items` panels.
    pub fn for_items(n_items: usize) -> Self {
        Self {
            side: smallest_square_bigger_than(n_items),
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn n_cells(&self) -> usize {
        self.side * self.side
    }

    pub fn is_empty(&self) -> bool {
        self.side == 0
    }

    /// `(row, column)` of the `index`-th panel, or `None` if it does not fit.
    pub fn cell(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.n_cells() {
            return None;
        }
        Some((index / self.side, index % self.side))
    }
}
