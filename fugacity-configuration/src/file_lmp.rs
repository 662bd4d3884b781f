use std::collections::HashMap;

use log::debug;

use fugacity_io::{open_file, parse_field, ParsingError};
use fugacity_numerical::Vec3;

use crate::{Angle, Bond, BondedType, ConfigurationError, Dihedral, ParticleType, SiteTemplate};

/// Reader for LAMMPS-style particle-type data files.
///
/// The header counts entries (`3 atoms`, `2 bonds`, `2 atom types`, ...);
/// recognized sections are `Masses`, `Pair Coeffs`, `Bond Coeffs`,
/// `Angle Coeffs`, `Dihedral Coeffs`, `Atoms`, `Bonds`, `Angles` and
/// `Dihedrals`. All ids are 1-indexed in the file.
///
/// * `Pair Coeffs` rows read `id epsilon sigma cutoff [charge]`.
/// * `Bond/Angle/Dihedral Coeffs` rows read `id model p1 p2 ...`, where the
///   model name picks the parameter meaning (e.g. `harmonic k length` for a
///   bond, `harmonic k degrees` for an angle, `trappe c0 c1 c2 c3`).
/// * `Atoms` rows read `id type x y z`; `Bonds` rows read `id type a b`, and
///   angles/dihedrals follow with three and four site ids.
///
/// `Masses` entries are accepted for compatibility and ignored: masses do
/// not enter Monte Carlo acceptance.
///
/// The same schema is accepted in JSON form via [`FileLmp::load_json`],
/// where the document deserializes directly into a [`ParticleType`]
/// (0-indexed sites).
pub struct FileLmp;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Masses,
    PairCoeffs,
    BondCoeffs,
    AngleCoeffs,
    DihedralCoeffs,
    Atoms,
    Bonds,
    Angles,
    Dihedrals,
}

struct Counts {
    atoms: usize,
    bonds: usize,
    angles: usize,
    dihedrals: usize,
    atom_types: usize,
    bond_types: usize,
    angle_types: usize,
    dihedral_types: usize,
}

impl FileLmp {
    pub fn load(fname: &str) -> Result<ParticleType, ConfigurationError> {
        let reader = open_file(fname)?;
        let mut counts = Counts {
            atoms: 0,
            bonds: 0,
            angles: 0,
            dihedrals: 0,
            atom_types: 0,
            bond_types: 0,
            angle_types: 0,
            dihedral_types: 0,
        };
        let mut section = Section::Header;
        let mut sites: Vec<SiteTemplate> = Vec::new();
        let mut pair_coeffs: HashMap<usize, (f64, f64, f64, f64)> = HashMap::new();
        let mut bonds: Vec<Bond> = Vec::new();
        let mut angles: Vec<Angle> = Vec::new();
        let mut dihedrals: Vec<Dihedral> = Vec::new();
        let mut bond_types: Vec<BondedType> = Vec::new();
        let mut angle_types: Vec<BondedType> = Vec::new();
        let mut dihedral_types: Vec<BondedType> = Vec::new();

        for (lineno, line) in std::io::BufRead::lines(reader).enumerate() {
            let line = line.map_err(ParsingError::Io)?;
            let lineno = lineno + 1;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            if lineno == 1 && section == Section::Header {
                // first line is a free-format comment in LAMMPS data files
                continue;
            }
            match Self::section_of(content) {
                Some(next) => {
                    section = next;
                    continue;
                }
                None => {}
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            match section {
                Section::Header => Self::parse_header_line(&fields, &mut counts),
                Section::Masses => {
                    debug!("ignoring mass entry: {}", content);
                }
                Section::PairCoeffs => {
                    let id: usize = parse_field(&fields, 0, fname, lineno)?;
                    let epsilon: f64 = parse_field(&fields, 1, fname, lineno)?;
                    let sigma: f64 = parse_field(&fields, 2, fname, lineno)?;
                    let cutoff: f64 = parse_field(&fields, 3, fname, lineno)?;
                    let charge: f64 = if fields.len() > 4 { parse_field(&fields, 4, fname, lineno)? } else { 0.0 };
                    pair_coeffs.insert(id - 1, (epsilon, sigma, cutoff, charge));
                }
                Section::BondCoeffs => {
                    bond_types.push(Self::parse_bonded_type(&fields, fname, lineno, "bond")?);
                }
                Section::AngleCoeffs => {
                    angle_types.push(Self::parse_bonded_type(&fields, fname, lineno, "angle")?);
                }
                Section::DihedralCoeffs => {
                    dihedral_types.push(Self::parse_bonded_type(&fields, fname, lineno, "dihedral")?);
                }
                Section::Atoms => {
                    let _id: usize = parse_field(&fields, 0, fname, lineno)?;
                    let site_type: usize = parse_field(&fields, 1, fname, lineno)?;
                    let x: f64 = parse_field(&fields, 2, fname, lineno)?;
                    let y: f64 = parse_field(&fields, 3, fname, lineno)?;
                    let z: f64 = parse_field(&fields, 4, fname, lineno)?;
                    let (epsilon, sigma, cutoff, charge) =
                        *pair_coeffs.get(&(site_type - 1)).unwrap_or(&(0.0, 0.0, 0.0, 0.0));
                    sites.push(SiteTemplate {
                        site_type: site_type - 1,
                        position: Vec3::new(x, y, z),
                        epsilon,
                        sigma,
                        cutoff,
                        charge,
                    });
                }
                Section::Bonds => {
                    let bond_type: usize = parse_field(&fields, 1, fname, lineno)?;
                    let a: usize = parse_field(&fields, 2, fname, lineno)?;
                    let b: usize = parse_field(&fields, 3, fname, lineno)?;
                    bonds.push(Bond { sites: [a - 1, b - 1], bond_type: bond_type - 1 });
                }
                Section::Angles => {
                    let angle_type: usize = parse_field(&fields, 1, fname, lineno)?;
                    let a: usize = parse_field(&fields, 2, fname, lineno)?;
                    let b: usize = parse_field(&fields, 3, fname, lineno)?;
                    let c: usize = parse_field(&fields, 4, fname, lineno)?;
                    angles.push(Angle { sites: [a - 1, b - 1, c - 1], angle_type: angle_type - 1 });
                }
                Section::Dihedrals => {
                    let dihedral_type: usize = parse_field(&fields, 1, fname, lineno)?;
                    let a: usize = parse_field(&fields, 2, fname, lineno)?;
                    let b: usize = parse_field(&fields, 3, fname, lineno)?;
                    let c: usize = parse_field(&fields, 4, fname, lineno)?;
                    let d: usize = parse_field(&fields, 5, fname, lineno)?;
                    dihedrals.push(Dihedral {
                        sites: [a - 1, b - 1, c - 1, d - 1],
                        dihedral_type: dihedral_type - 1,
                    });
                }
            }
        }

        Self::check_count(fname, "atoms", counts.atoms, sites.len())?;
        Self::check_count(fname, "bonds", counts.bonds, bonds.len())?;
        Self::check_count(fname, "angles", counts.angles, angles.len())?;
        Self::check_count(fname, "dihedrals", counts.dihedrals, dihedrals.len())?;
        Self::check_count(fname, "bond types", counts.bond_types, bond_types.len())?;
        Self::check_count(fname, "angle types", counts.angle_types, angle_types.len())?;
        Self::check_count(fname, "dihedral types", counts.dihedral_types, dihedral_types.len())?;
        let distinct = {
            let mut t: Vec<usize> = sites.iter().map(|s| s.site_type).collect();
            t.sort_unstable();
            t.dedup();
            t.len()
        };
        Self::check_count(fname, "atom types", counts.atom_types, distinct)?;

        let name = std::path::Path::new(fname)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| fname.to_string());
        Ok(ParticleType { name, sites, bonds, angles, dihedrals, bond_types, angle_types, dihedral_types })
    }

    /// JSON form: the document is a serialized [`ParticleType`]
    pub fn load_json(fname: &str) -> Result<ParticleType, ConfigurationError> {
        let reader = open_file(fname)?;
        serde_json::from_reader(reader)
            .map_err(|e| ConfigurationError::Input(format!("{}: {}", fname, e)))
    }

    fn section_of(line: &str) -> Option<Section> {
        match line {
            "Masses" => Some(Section::Masses),
            "Pair Coeffs" => Some(Section::PairCoeffs),
            "Bond Coeffs" => Some(Section::BondCoeffs),
            "Angle Coeffs" => Some(Section::AngleCoeffs),
            "Dihedral Coeffs" => Some(Section::DihedralCoeffs),
            "Atoms" => Some(Section::Atoms),
            "Bonds" => Some(Section::Bonds),
            "Angles" => Some(Section::Angles),
            "Dihedrals" => Some(Section::Dihedrals),
            _ => None,
        }
    }

    fn parse_header_line(fields: &[&str], counts: &mut Counts) {
        if fields.len() < 2 {
            return;
        }
        let value: usize = match fields[0].parse() {
            Ok(v) => v,
            Err(_) => return,
        };
        match (fields[1], fields.get(2).copied()) {
            ("atoms", None) => counts.atoms = value,
            ("bonds", None) => counts.bonds = value,
            ("angles", None) => counts.angles = value,
            ("dihedrals", None) => counts.dihedrals = value,
            ("atom", Some("types")) => counts.atom_types = value,
            ("bond", Some("types")) => counts.bond_types = value,
            ("angle", Some("types")) => counts.angle_types = value,
            ("dihedral", Some("types")) => counts.dihedral_types = value,
            _ => {}
        }
    }

    /// Rows read `id model p1 p2 ...`; the model name fixes the meaning of
    /// the parameters that follow.
    fn parse_bonded_type(
        fields: &[&str],
        fname: &str,
        lineno: usize,
        kind: &str,
    ) -> Result<BondedType, ConfigurationError> {
        let _id: usize = parse_field(fields, 0, fname, lineno)?;
        let model: String = parse_field(fields, 1, fname, lineno)?;
        let mut out = BondedType::new(&model);
        let names: &[&str] = match (kind, model.as_str()) {
            ("bond", "harmonic") => &["k", "length"],
            ("bond", "rigid") => &["length", "delta"],
            ("angle", "harmonic") => &["k", "degrees"],
            ("angle", "rigid") => &["degrees", "delta"],
            (_, "square_well") => &["minimum", "maximum"],
            ("dihedral", "trappe") | ("dihedral", "cosine_series") => &["c0", "c1", "c2", "c3"],
            (_, other) => {
                return Err(ConfigurationError::Input(format!(
                    "{}:{}: unknown {} model `{}`",
                    fname, lineno, kind, other
                )))
            }
        };
        for (k, pname) in names.iter().enumerate() {
            let value: f64 = parse_field(fields, 2 + k, fname, lineno)?;
            out.properties.insert(pname.to_string(), value);
        }
        Ok(out)
    }

    fn check_count(fname: &str, section: &str, expected: usize, found: usize) -> Result<(), ConfigurationError> {
        if expected != found {
            return Err(ConfigurationError::SectionCount {
                fname: fname.to_string(),
                section: section.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> String {
        let path = std::env::temp_dir().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn dimer_data_file_parses() {
        let text = "dimer force field\n\n\
                    2 atoms\n1 bonds\n2 atom types\n1 bond types\n\n\
                    Pair Coeffs\n\n\
                    1 1.0 1.0 3.0\n2 0.5 1.2 3.0 -0.5\n\n\
                    Bond Coeffs\n\n\
                    1 harmonic 600.0 1.0\n\n\
                    Atoms\n\n\
                    1 1 0.0 0.0 0.0\n2 2 1.0 0.0 0.0\n\n\
                    Bonds\n\n\
                    1 1 1 2\n";
        let fname = write_temp("fugacity_dimer.lmp", text);
        let ptype = FileLmp::load(&fname).unwrap();
        assert_eq!(ptype.num_sites(), 2);
        assert_eq!(ptype.sites[1].site_type, 1);
        assert_eq!(ptype.sites[1].charge, -0.5);
        assert_eq!(ptype.bonds.len(), 1);
        assert_eq!(ptype.bonds[0].sites, [0, 1]);
        assert_eq!(ptype.bond_types[0].model, "harmonic");
        assert_eq!(ptype.bond_types[0].property("length"), 1.0);
        std::fs::remove_file(fname).ok();
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let text = "bad file\n\n2 atoms\n1 atom types\n\nPair Coeffs\n\n1 1.0 1.0 3.0\n\nAtoms\n\n1 1 0.0 0.0 0.0\n";
        let fname = write_temp("fugacity_bad.lmp", text);
        assert!(FileLmp::load(&fname).is_err());
        std::fs::remove_file(fname).ok();
    }
}
