use serde::{Deserialize, Serialize};

use fugacity_numerical::{Euler, Vec3};

/// A single interaction site.
///
/// Sites removed by a delayed-commit trial stay in storage with
/// `is_physical == false` and are skipped by every visitor until revived.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Site {
    position: Vec3,
    site_type: usize,
    /// orientation for anisotropic models; `None` for point sites
    euler: Option<Euler>,
    is_physical: bool,
    /// one cell index per active cell list
    cells: Vec<usize>,
}

impl Site {
    pub fn new(site_type: usize, position: Vec3) -> Site {
        Site { position, site_type, euler: None, is_physical: true, cells: Vec::new() }
    }

    #[inline(always)]
    pub fn position(&self) -> &Vec3 {
        &self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn displace(&mut self, shift: &Vec3) {
        self.position += *shift;
    }

    #[inline(always)]
    pub fn site_type(&self) -> usize {
        self.site_type
    }

    pub fn set_site_type(&mut self, site_type: usize) {
        self.site_type = site_type;
    }

    pub fn euler(&self) -> Option<&Euler> {
        self.euler.as_ref()
    }

    pub fn set_euler(&mut self, euler: Option<Euler>) {
        self.euler = euler;
    }

    #[inline(always)]
    pub fn is_physical(&self) -> bool {
        self.is_physical
    }

    pub fn set_physical(&mut self, physical: bool) {
        self.is_physical = physical;
    }

    /// The stored cell of this site in cell list `list`
    pub fn cell(&self, list: usize) -> usize {
        self.cells[list]
    }

    pub fn set_cell(&mut self, list: usize, cell: usize) {
        if self.cells.len() <= list {
            self.cells.resize(list + 1, usize::MAX);
        }
        self.cells[list] = cell;
    }

    pub fn num_cell_lists(&self) -> usize {
        self.cells.len()
    }
}
