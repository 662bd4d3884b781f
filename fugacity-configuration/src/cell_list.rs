use serde::{Deserialize, Serialize};

use fugacity_numerical::Vec3;

use crate::{ConfigurationError, Domain};

/// A regular grid over the box with at least `min_edge`-sized cubical cells.
///
/// Each cell stores the (particle, site) pairs currently inside it; each site
/// mirrors its cell index (see [`Site::cell`](crate::Site::cell)), so moves
/// update both sides in lockstep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellList {
    min_edge: f64,
    num: [usize; 3],
    cells: Vec<Vec<(usize, usize)>>,
    neighbors: Vec<Vec<usize>>,
    /// group the list serves; pairs outside it are not hashed
    group_index: usize,
}

impl CellList {
    /// Builds the grid for a given domain.
    ///
    /// Fails unless every dimension admits at least three cells, which the
    /// pair loop requires on periodic axes so a cell never neighbors itself
    /// twice. Non-periodic axes get no wraparound adjacency: their end-cap
    /// cells simply have fewer neighbors.
    pub fn build(domain: &Domain, min_edge: f64, group_index: usize) -> Result<CellList, ConfigurationError> {
        let mut num = [1usize; 3];
        for dim in 0..domain.dimension() {
            let side = domain.side_length(dim);
            let cells = (side / min_edge).floor() as usize;
            if cells < 3 {
                return Err(ConfigurationError::TooFewCells { side, min_edge, cells });
            }
            num[dim] = cells;
        }
        let total = num[0] * num[1] * num[2];
        let mut list = CellList {
            min_edge,
            num,
            cells: vec![Vec::new(); total],
            neighbors: Vec::with_capacity(total),
            group_index,
        };
        let periodic = [domain.is_periodic(0), domain.is_periodic(1), domain.is_periodic(2)];
        list.build_neighbors(domain.dimension(), periodic);
        Ok(list)
    }

    /// Wraps a neighbor index along one axis, or rejects it when the axis is
    /// non-periodic and the index falls off the grid.
    fn neighbor_index(i: i64, d: i64, n: i64, periodic: bool) -> Option<i64> {
        let j = i + d;
        if periodic {
            return Some(j.rem_euclid(n));
        }
        if j < 0 || j >= n {
            None
        } else {
            Some(j)
        }
    }

    fn build_neighbors(&mut self, dimension: usize, periodic: [bool; 3]) {
        let (nx, ny, nz) = (self.num[0] as i64, self.num[1] as i64, self.num[2] as i64);
        let z_range: Vec<i64> = if dimension == 3 { vec![-1, 0, 1] } else { vec![0] };
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    let mut neigh = Vec::with_capacity(if dimension == 3 { 27 } else { 9 });
                    for dz in &z_range {
                        let jz = match Self::neighbor_index(iz, *dz, nz, periodic[2]) {
                            Some(j) => j,
                            None => continue,
                        };
                        for dy in [-1i64, 0, 1] {
                            let jy = match Self::neighbor_index(iy, dy, ny, periodic[1]) {
                                Some(j) => j,
                                None => continue,
                            };
                            for dx in [-1i64, 0, 1] {
                                let jx = match Self::neighbor_index(ix, dx, nx, periodic[0]) {
                                    Some(j) => j,
                                    None => continue,
                                };
                                let id = ((jz * ny + jy) * nx + jx) as usize;
                                if !neigh.contains(&id) {
                                    neigh.push(id);
                                }
                            }
                        }
                    }
                    self.neighbors.push(neigh);
                }
            }
        }
    }

    pub fn min_edge(&self) -> f64 {
        self.min_edge
    }

    pub fn group_index(&self) -> usize {
        self.group_index
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// The cell containing a (wrapped) position
    pub fn locate(&self, domain: &Domain, position: &Vec3) -> usize {
        let mut wrapped = *position;
        domain.wrap(&mut wrapped);
        let mut idx = [0usize; 3];
        for dim in 0..domain.dimension() {
            let side = domain.side_length(dim);
            let frac = wrapped[dim] / side + 0.5;
            let mut i = (frac * self.num[dim] as f64).floor() as i64;
            // guard against frac == 1.0 from the upper wrap boundary
            if i >= self.num[dim] as i64 {
                i = self.num[dim] as i64 - 1;
            }
            if i < 0 {
                i = 0;
            }
            idx[dim] = i as usize;
        }
        (idx[2] * self.num[1] + idx[1]) * self.num[0] + idx[0]
    }

    pub fn neighbors_of(&self, cell: usize) -> &Vec<usize> {
        &self.neighbors[cell]
    }

    pub fn members(&self, cell: usize) -> &Vec<(usize, usize)> {
        &self.cells[cell]
    }

    pub fn add(&mut self, cell: usize, particle: usize, site: usize) {
        self.cells[cell].push((particle, site));
    }

    pub fn remove(&mut self, cell: usize, particle: usize, site: usize) {
        let members = &mut self.cells[cell];
        match members.iter().position(|&(p, s)| p == particle && s == site) {
            Some(at) => {
                members.swap_remove(at);
            }
            None => panic!(
                "CellList::remove: site ({}, {}) is not a member of cell {}",
                particle, site, cell
            ),
        }
    }

    /// Moves one site between cells; a no-op when the cells coincide
    pub fn update(&mut self, old_cell: usize, new_cell: usize, particle: usize, site: usize) {
        if old_cell == new_cell {
            return;
        }
        self.remove(old_cell, particle, site);
        self.add(new_cell, particle, site);
    }

    pub fn clear(&mut self) {
        for c in self.cells.iter_mut() {
            c.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CellList;
    use crate::Domain;
    use fugacity_numerical::Vec3;

    #[test]
    fn too_small_a_box_is_rejected() {
        let domain = Domain::cubic(5.0);
        assert!(CellList::build(&domain, 2.0, 0).is_err());
        assert!(CellList::build(&domain, 1.0, 0).is_ok());
    }

    #[test]
    fn three_dimensional_cells_have_27_neighbors() {
        let domain = Domain::cubic(12.0);
        let list = CellList::build(&domain, 3.0, 0).unwrap();
        assert_eq!(list.num_cells(), 64);
        for cell in 0..list.num_cells() {
            assert_eq!(list.neighbors_of(cell).len(), 27);
        }
    }

    #[test]
    fn two_dimensional_cells_have_9_neighbors() {
        let domain = Domain::square(12.0);
        let list = CellList::build(&domain, 3.0, 0).unwrap();
        assert_eq!(list.num_cells(), 16);
        for cell in 0..list.num_cells() {
            assert_eq!(list.neighbors_of(cell).len(), 9);
        }
    }

    #[test]
    fn non_periodic_axis_has_no_wraparound_neighbors() {
        let mut domain = Domain::cubic(12.0);
        domain.set_periodic(2, false);
        let list = CellList::build(&domain, 3.0, 0).unwrap();
        let (nx, ny, nz) = (4usize, 4usize, 4usize);
        assert_eq!(list.num_cells(), nx * ny * nz);
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    let cell = (iz * ny + iy) * nx + ix;
                    let expected = if iz == 0 || iz == nz - 1 { 18 } else { 27 };
                    assert_eq!(list.neighbors_of(cell).len(), expected, "cell ({}, {}, {})", ix, iy, iz);
                    // the two end caps must never touch each other
                    for &n in list.neighbors_of(cell) {
                        let n_iz = n / (nx * ny);
                        assert!(
                            (n_iz as i64 - iz as i64).abs() <= 1,
                            "cell at z-layer {} wired to layer {}",
                            iz,
                            n_iz
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn locate_is_stable_under_wrap() {
        let domain = Domain::cubic(9.0);
        let list = CellList::build(&domain, 3.0, 0).unwrap();
        let inside = Vec3::new(1.0, -1.0, 4.0);
        let image = Vec3::new(1.0 + 9.0, -1.0 - 9.0, 4.0 - 9.0);
        assert_eq!(list.locate(&domain, &inside), list.locate(&domain, &image));
    }
}
