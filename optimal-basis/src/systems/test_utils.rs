use super::SimpleSystem;

/// Species present in the systems created by [`test_systems`]
pub const TEST_SPECIES: [i32; 3] = [1, 6, 8];

/// Get a list of `count` different small molecules, cycling between water,
/// methane and CO2 with deterministic distortions.
pub fn test_systems(count: usize) -> Vec<SimpleSystem> {
    const NAMES: [&str; 3] = ["water", "methane", "CO2"];

    return (0..count)
        .map(|i| distorted(test_system(NAMES[i % NAMES.len()]), i))
        .collect();
}

pub fn test_system(name: &str) -> SimpleSystem {
    match name {
        "methane" => get_methane(),
        "water" => get_water(),
        "CO2" => get_co2(),
        _ => panic!("unknown test system {}", name)
    }
}

fn distorted(mut system: SimpleSystem, seed: usize) -> SimpleSystem {
    let seed = seed as f64;
    let positions = system.positions()
        .iter()
        .enumerate()
        .map(|(atom, position)| {
            let atom = atom as f64;
            [
                position[0] + 0.1 * f64::sin(1.7 * seed + 0.9 * atom),
                position[1] + 0.1 * f64::sin(2.3 * seed + 1.1 * atom + 1.0),
                position[2] + 0.1 * f64::sin(0.7 * seed + 1.3 * atom + 2.0),
            ]
        })
        .collect::<Vec<_>>();

    let species = system.species().to_vec();
    system = SimpleSystem::new();
    for (species, position) in species.into_iter().zip(positions) {
        system.add_atom(species, position);
    }
    return system;
}

fn get_methane() -> SimpleSystem {
    let mut system = SimpleSystem::new();
    system.add_atom(6, [5.0000, 5.0000, 5.0000]);
    system.add_atom(1, [5.5288, 5.1610, 5.9359]);
    system.add_atom(1, [5.2051, 5.8240, 4.3214]);
    system.add_atom(1, [5.3345, 4.0686, 4.5504]);
    system.add_atom(1, [3.9315, 4.9463, 5.1921]);
    return system;
}

fn get_water() -> SimpleSystem {
    let mut system = SimpleSystem::new();
    system.add_atom(8, [0.0, 0.0, 0.0]);
    system.add_atom(1, [0.0, 0.75545, -0.58895]);
    system.add_atom(1, [0.0, -0.75545, -0.58895]);
    return system;
}

fn get_co2() -> SimpleSystem {
    let mut system = SimpleSystem::new();
    system.add_atom(6, [0.0, 0.0, 0.0]);
    system.add_atom(8, [0.0, 0.0, 1.16]);
    system.add_atom(8, [0.0, 0.0, -1.16]);
    return system;
}
