use crate::{Error, Species};

/// A minimal atomic structure, containing the species and Cartesian positions
/// of a set of atoms, without periodic boundary conditions.
#[derive(Clone, Debug, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimpleSystem {
    species: Vec<Species>,
    positions: Vec<[f64; 3]>,
}

impl SimpleSystem {
    /// Create a new empty system
    pub fn new() -> SimpleSystem {
        SimpleSystem::default()
    }

    /// Create a system from the species and positions of all atoms
    pub fn from_atoms(species: Vec<Species>, positions: Vec<[f64; 3]>) -> Result<SimpleSystem, Error> {
        if species.len() != positions.len() {
            return Err(Error::InvalidParameter(format!(
                "got {} species but {} positions for this system",
                species.len(), positions.len()
            )));
        }

        Ok(SimpleSystem { species, positions })
    }

    /// Add an atom with the given species and position to this system
    pub fn add_atom(&mut self, species: Species, position: [f64; 3]) {
        self.species.push(species);
        self.positions.push(position);
    }

    /// Number of atoms in this system
    pub fn size(&self) -> usize {
        self.species.len()
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// Distance vector going from atom `i` to atom `j`
    pub fn vector(&self, i: usize, j: usize) -> [f64; 3] {
        let first = self.positions[i];
        let second = self.positions[j];
        [second[0] - first[0], second[1] - first[1], second[2] - first[2]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_atoms() {
        let mut system = SimpleSystem::new();
        system.add_atom(3, [2.0, 3.0, 4.0]);
        system.add_atom(1, [1.0, 3.0, 4.0]);
        system.add_atom(3, [5.0, 3.0, 4.0]);

        assert_eq!(system.size(), 3);
        assert_eq!(system.species(), &[3, 1, 3]);
        assert_eq!(system.positions(), &[[2.0, 3.0, 4.0], [1.0, 3.0, 4.0], [5.0, 3.0, 4.0]]);
        assert_eq!(system.vector(0, 2), [3.0, 0.0, 0.0]);
    }

    #[test]
    fn from_atoms() {
        let system = SimpleSystem::from_atoms(vec![1, 8], vec![[0.0; 3], [1.0; 3]]).unwrap();
        assert_eq!(system.size(), 2);

        let error = SimpleSystem::from_atoms(vec![1, 8], vec![[0.0; 3]]).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: got 2 species but 1 positions for this system");
    }
}
