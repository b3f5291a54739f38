// Synthetic, well-separated TCO measurements for tests.
//
//   class │ wavelength │ absorbance │ transmission │ optical density
//   AZO   │ 350 ± 20   │ 0.10 ± .03 │ 60 ± 5       │   50 ± 10
//   FTO   │ 650 ± 20   │ 0.60 ± .05 │ 40 ± 5       │ 2000 ± 200
//   ITO   │ 500 ± 20   │ 0.30 ± .03 │ 80 ± 3       │  120 ± 20

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::Dataset;
use crate::domain::measurement::{Measurement, MeasurementTable};

pub const CLASSES: [&str; 3] = ["AZO", "FTO", "ITO"];

const CENTRES: [[f64; 4]; 3] = [
    [350.0, 0.10, 60.0, 50.0],
    [650.0, 0.60, 40.0, 2000.0],
    [500.0, 0.30, 80.0, 120.0],
];

const SPREADS: [[f64; 4]; 3] = [
    [20.0, 0.03, 5.0, 10.0],
    [20.0, 0.05, 5.0, 200.0],
    [20.0, 0.03, 3.0, 20.0],
];

fn sample(class: usize, rng: &mut StdRng) -> [f64; 4] {
    let mut row = [0.0; 4];
    for f in 0..4 {
        row[f] = CENTRES[class][f] + rng.gen_range(-1.0..1.0) * SPREADS[class][f];
    }
    row
}

/// Encoded dataset with the given member count per class (AZO, FTO, ITO).
pub fn imbalanced_tco(n_azo: usize, n_fto: usize, n_ito: usize, seed: u64) -> Dataset {
    let mut rng      = StdRng::seed_from_u64(seed);
    let mut features = Vec::new();
    let mut targets  = Vec::new();
    for (class, &n) in [n_azo, n_fto, n_ito].iter().enumerate() {
        for _ in 0..n {
            features.push(sample(class, &mut rng).to_vec());
            targets.push(class);
        }
    }
    Dataset::new(features, targets, 3)
}

/// Labelled table with `n_per_class` rows of each material, interleaved.
pub fn tco_table(n_per_class: usize, seed: u64) -> MeasurementTable {
    let mut rng  = StdRng::seed_from_u64(seed);
    let mut rows = Vec::new();
    for _ in 0..n_per_class {
        for (class, name) in CLASSES.iter().enumerate() {
            rows.push(Measurement::new(*name, sample(class, &mut rng)));
        }
    }
    MeasurementTable::new(rows)
}

/// The same table rendered as dataset CSV text.
pub fn tco_csv(n_per_class: usize, seed: u64) -> String {
    let mut out = String::from("Material,Wavelength,AbsorptionRate,Transmission,OpticalDensity\n");
    for row in tco_table(n_per_class, seed).rows {
        let f = row.features;
        out.push_str(&format!("{},{},{},{},{}\n", row.material, f[0], f[1], f[2], f[3]));
    }
    out
}
