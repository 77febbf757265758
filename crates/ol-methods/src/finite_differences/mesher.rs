//! Log-spot grids.

use ol_core::{ensure, errors::Result, Real};

/// Uniform grid in `x = ln S`.
///
/// The spot always lies on a node so that no interpolation is needed at the
/// valuation point. A barrier, when given, is the first or last node.
#[derive(Debug, Clone, PartialEq)]
pub struct LogGrid {
    log_spots: Vec<Real>,
    spots: Vec<Real>,
    dx: Real,
    spot_index: usize,
}

impl LogGrid {
    /// Grid of about `nodes` points covering `ln S0 ± half_width`.
    pub fn centered(spot: Real, half_width: Real, nodes: usize) -> Result<Self> {
        ensure!(nodes >= 3, "a grid needs at least 3 nodes, got {nodes}");
        ensure!(
            half_width > 0.0 && half_width.is_finite(),
            "grid half-width must be positive, got {half_width}"
        );
        let x0 = spot.ln();
        let dx = 2.0 * half_width / (nodes - 1) as Real;
        let spot_index = ((half_width / dx).round() as usize).clamp(1, nodes - 2);
        Ok(Self::from_nodes(x0, dx, spot_index, nodes))
    }

    /// Grid with `barrier` as the boundary node on its side of the spot and
    /// the far boundary at least `half_width` away from the spot.
    pub fn with_barrier(spot: Real, barrier: Real, half_width: Real, nodes: usize) -> Result<Self> {
        ensure!(nodes >= 3, "a grid needs at least 3 nodes, got {nodes}");
        ensure!(
            barrier > 0.0 && barrier != spot,
            "barrier {barrier} must be positive and differ from the spot {spot}"
        );
        let x0 = spot.ln();
        let distance = (spot / barrier).ln().abs();
        let nominal = (distance + half_width) / (nodes - 1) as Real;
        let inner = ((distance / nominal).round() as usize).max(1);
        let dx = distance / inner as Real;
        let outer = ((half_width / dx).ceil() as usize).max(1);
        let total = inner + outer + 1;
        let spot_index = if barrier < spot { inner } else { outer };
        Ok(Self::from_nodes(x0, dx, spot_index, total))
    }

    fn from_nodes(x0: Real, dx: Real, spot_index: usize, nodes: usize) -> Self {
        let log_spots: Vec<Real> = (0..nodes)
            .map(|i| x0 + (i as Real - spot_index as Real) * dx)
            .collect();
        let spots = log_spots.iter().map(|x| x.exp()).collect();
        Self {
            log_spots,
            spots,
            dx,
            spot_index,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.spots.len()
    }

    /// Whether the grid has no nodes.
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// Log-spot spacing.
    pub fn dx(&self) -> Real {
        self.dx
    }

    /// Index of the spot node.
    pub fn spot_index(&self) -> usize {
        self.spot_index
    }

    /// Spot levels.
    pub fn spots(&self) -> &[Real] {
        &self.spots
    }

    /// Log-spot levels.
    pub fn log_spots(&self) -> &[Real] {
        &self.log_spots
    }

    /// Lowest spot on the grid.
    pub fn lower_bound(&self) -> Real {
        self.spots[0]
    }

    /// Highest spot on the grid.
    pub fn upper_bound(&self) -> Real {
        self.spots[self.spots.len() - 1]
    }

    /// `payoff` averaged over each node's cell `[x − dx/2, x + dx/2]`.
    ///
    /// Averaging removes the O(dx) error a kink or jump between nodes would
    /// otherwise leave in the price.
    pub fn cell_average(&self, payoff: &dyn Fn(Real) -> Real) -> Vec<Real> {
        const POINTS: usize = 8;
        let h = self.dx / POINTS as Real;
        self.log_spots
            .iter()
            .map(|&x| {
                let start = x - 0.5 * self.dx;
                (0..POINTS)
                    .map(|k| payoff((start + (k as Real + 0.5) * h).exp()))
                    .sum::<Real>()
                    / POINTS as Real
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spot_is_a_node() {
        let grid = LogGrid::centered(100.0, 1.0, 201).unwrap();
        assert_eq!(grid.len(), 201);
        assert_eq!(grid.spot_index(), 100);
        assert_relative_eq!(grid.spots()[100], 100.0, max_relative = 1e-14);
        assert_relative_eq!(grid.dx(), 0.01, max_relative = 1e-12);
    }

    #[test]
    fn lower_barrier_is_first_node() {
        let grid = LogGrid::with_barrier(100.0, 90.0, 1.25, 201).unwrap();
        assert_relative_eq!(grid.lower_bound(), 90.0, max_relative = 1e-12);
        assert_relative_eq!(grid.spots()[grid.spot_index()], 100.0, max_relative = 1e-12);
        assert!(grid.upper_bound() >= 100.0 * 1.25_f64.exp() * (1.0 - 1e-12));
    }

    #[test]
    fn upper_barrier_is_last_node() {
        let grid = LogGrid::with_barrier(100.0, 120.0, 1.25, 201).unwrap();
        assert_relative_eq!(grid.upper_bound(), 120.0, max_relative = 1e-12);
        assert_relative_eq!(grid.spots()[grid.spot_index()], 100.0, max_relative = 1e-12);
        assert!(grid.lower_bound() <= 100.0 * (-1.25_f64).exp() * (1.0 + 1e-12));
    }

    #[test]
    fn cell_average_of_linear_payoff_is_exact_away_from_kink() {
        let grid = LogGrid::centered(100.0, 0.5, 51).unwrap();
        let averaged = grid.cell_average(&|s| s);
        let i = grid.len() - 1;
        // Mean of e^x over the cell is e^x · sinh(dx/2)/(dx/2).
        let h = 0.5 * grid.dx();
        let exact = grid.spots()[i] * h.sinh() / h;
        assert_relative_eq!(averaged[i], exact, max_relative = 1e-4);
    }

    #[test]
    fn rejects_tiny_grids() {
        assert!(LogGrid::centered(100.0, 1.0, 2).is_err());
        assert!(LogGrid::with_barrier(100.0, 100.0, 1.0, 101).is_err());
    }
}
