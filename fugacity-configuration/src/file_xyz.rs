use std::io::{BufRead, Write};

use fugacity_io::{open_file, out_writer, parse_field, ParsingError};
use fugacity_numerical::{Euler, Vec3};

use crate::{Configuration, ConfigurationError};

/// Reader/writer for the engine's XYZ trajectory variant.
///
/// Line 1 is the number of sites. Line 2 reads
/// `id lx ly lz xy xz yz`, where `id` is a placeholder and the tilts default
/// to zero. Each following line is `type x y z` (z is written as 0 in 2-D).
pub struct FileXyz {
    pub group_index: usize,
    pub append: bool,
}

impl Default for FileXyz {
    fn default() -> Self {
        FileXyz { group_index: 0, append: false }
    }
}

impl FileXyz {
    pub fn new() -> FileXyz {
        FileXyz::default()
    }

    /// Writes the configuration; one frame per call when appending
    pub fn write(&self, fname: &str, config: &Configuration) {
        let mut out = out_writer(fname, self.append);
        self.write_to(&mut out, config);
    }

    pub fn write_to(&self, out: &mut dyn Write, config: &Configuration) {
        let group = config.group(self.group_index).clone();
        let sites: Vec<(usize, usize)> = config
            .physical_particles()
            .flat_map(|(pi, p)| (0..p.num_sites()).map(move |s| (pi, s)))
            .filter(|(pi, s)| group.matches(config.particle(*pi), *s))
            .collect();
        let side = config.domain().side();
        let (xy, xz, yz) = config.domain().tilts();
        writeln!(out, "{}", sites.len()).ok();
        writeln!(out, "-1 {} {} {} {} {} {}", side.x, side.y, side.z, xy, xz, yz).ok();
        for (pi, s) in sites {
            let site = config.particle(pi).site(s);
            let p = site.position();
            writeln!(out, "{} {:.8} {:.8} {:.8}", site.site_type(), p.x, p.y, p.z).ok();
        }
    }

    /// Loads positions from an XYZ file.
    ///
    /// Tilts and site types are not read; when the configuration holds no
    /// particles, particles of type 0 are appended until the site count is
    /// reached, so particle types must have been added in the file's order.
    pub fn load(&self, fname: &str, config: &mut Configuration) -> Result<(), ConfigurationError> {
        let reader = open_file(fname)?;
        let mut lines = reader.lines();
        let mut next_line = |lineno: usize| -> Result<String, ParsingError> {
            lines
                .next()
                .ok_or(ParsingError::TooFewFields {
                    fname: fname.to_string(),
                    line: lineno,
                    expected: 1,
                    found: 0,
                })?
                .map_err(ParsingError::Io)
        };

        let first = next_line(1)?;
        let num_sites: usize = first.trim().parse().map_err(|_| ParsingError::BadNumber {
            fname: fname.to_string(),
            line: 1,
            field: first.trim().to_string(),
        })?;

        let box_line = next_line(2)?;
        let fields: Vec<&str> = box_line.split_whitespace().collect();
        let lx: f64 = parse_field(&fields, 1, fname, 2)?;
        let ly: f64 = parse_field(&fields, 2, fname, 2)?;
        let lz: f64 = parse_field(&fields, 3, fname, 2)?;
        *config.domain_mut() = crate::Domain::new(Vec3::new(lx, ly, lz))?;

        if config.num_particles() == 0 {
            let sites_per_particle = config.particle_type(0).num_sites();
            if num_sites % sites_per_particle != 0 {
                return Err(ConfigurationError::Input(format!(
                    "{}: {} sites do not fill particles of {} sites",
                    fname, num_sites, sites_per_particle
                )));
            }
            for _ in 0..num_sites / sites_per_particle {
                config.add_particle_of_type(0);
            }
        } else if config.num_sites() != num_sites {
            return Err(ConfigurationError::Input(format!(
                "{}: holds {} sites but the configuration has {}",
                fname,
                num_sites,
                config.num_sites()
            )));
        }

        let particles: Vec<(usize, usize)> = config
            .physical_particles()
            .flat_map(|(pi, p)| (0..p.num_sites()).map(move |s| (pi, s)))
            .collect();
        for (k, (pi, s)) in particles.into_iter().enumerate() {
            let line = next_line(3 + k)?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let x: f64 = parse_field(&fields, 1, fname, 3 + k)?;
            let y: f64 = parse_field(&fields, 2, fname, 3 + k)?;
            let z: f64 = parse_field(&fields, 3, fname, 3 + k)?;
            let mut select = crate::Select::new();
            select.add_site(pi, s);
            select.load_positions(|_, _| (Vec3::new(x, y, z), None));
            config.update_positions(&select);
        }
        Ok(())
    }
}

/// Writer for XYZ trajectories extended with Euler angles.
///
/// Identical to [`FileXyz`] except each atom line is
/// `type x y z phi theta psi`. Euler trajectories are write-only.
pub struct FileXyzEuler {
    pub group_index: usize,
    pub append: bool,
}

impl Default for FileXyzEuler {
    fn default() -> Self {
        FileXyzEuler { group_index: 0, append: false }
    }
}

impl FileXyzEuler {
    pub fn new() -> FileXyzEuler {
        FileXyzEuler::default()
    }

    pub fn write(&self, fname: &str, config: &Configuration) {
        let mut out = out_writer(fname, self.append);
        self.write_to(&mut out, config);
    }

    pub fn write_to(&self, out: &mut dyn Write, config: &Configuration) {
        let group = config.group(self.group_index).clone();
        let sites: Vec<(usize, usize)> = config
            .physical_particles()
            .flat_map(|(pi, p)| (0..p.num_sites()).map(move |s| (pi, s)))
            .filter(|(pi, s)| group.matches(config.particle(*pi), *s))
            .collect();
        let side = config.domain().side();
        let (xy, xz, yz) = config.domain().tilts();
        writeln!(out, "{}", sites.len()).ok();
        writeln!(out, "-1 {} {} {} {} {} {}", side.x, side.y, side.z, xy, xz, yz).ok();
        for (pi, s) in sites {
            let site = config.particle(pi).site(s);
            let p = site.position();
            let e = site.euler().copied().unwrap_or(Euler::default());
            writeln!(
                out,
                "{} {:.8} {:.8} {:.8} {:.8} {:.8} {:.8}",
                site.site_type(),
                p.x,
                p.y,
                p.z,
                e.phi,
                e.theta,
                e.psi
            )
            .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Domain, ParticleType, SiteTemplate};

    fn monomer() -> ParticleType {
        ParticleType {
            name: "lj".to_string(),
            sites: vec![SiteTemplate {
                site_type: 0,
                position: Vec3::zero(),
                epsilon: 1.0,
                sigma: 1.0,
                cutoff: 3.0,
                charge: 0.0,
            }],
            bonds: vec![],
            angles: vec![],
            dihedrals: vec![],
            bond_types: vec![],
            angle_types: vec![],
            dihedral_types: vec![],
        }
    }

    #[test]
    fn write_then_load_preserves_positions() {
        let mut config = Configuration::new(Domain::cubic(8.0));
        config.add_particle_type(monomer());
        for i in 0..4 {
            let p = config.add_particle_of_type(0);
            config.displace_particle(p, &Vec3::new(i as f64 * 0.7, -(i as f64) * 0.3, 1.0));
        }
        let fname = std::env::temp_dir().join("fugacity_roundtrip.xyz");
        let fname = fname.to_string_lossy().to_string();
        FileXyz::new().write(&fname, &config);

        let mut restored = Configuration::new(Domain::cubic(1.0));
        restored.add_particle_type(monomer());
        FileXyz::new().load(&fname, &mut restored).unwrap();
        assert_eq!(restored.num_particles(), 4);
        assert_eq!(restored.domain().side_length(0), 8.0);
        for i in 0..4 {
            let a = config.particle(i).site(0).position();
            let b = restored.particle(i).site(0).position();
            assert!(a.distance(b) < 1e-7, "{} vs {}", a, b);
        }
        std::fs::remove_file(fname).ok();
    }
}
