//! Random drone fleets and medication manifests.

use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal, NormalError};
use serde::Serialize;
use uuid::Uuid;

use drone_domain::{DroneModel, MAXIMUM_BATTERY_CAPACITY, MAXIMUM_WEIGHT_LIMIT, NewMedicationItem};

/// Lowest battery level a simulated drone is registered with.
pub const MIN_INITIAL_BATTERY: u8 = 10;

const MEDICATIONS: [&str; 8] = [
    "Paracetamol",
    "Ibuprofen",
    "Amoxicillin",
    "Insulin",
    "Morphine",
    "Epinephrine",
    "Salbutamol",
    "Naloxone",
];

/// 1x1 transparent PNG
const PLACEHOLDER_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Body of `POST /drones`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneRegistration {
    pub serial_number: String,
    pub model: DroneModel,
    pub battery_level: u8,
}

impl DroneRegistration {
    /// Random model, battery between 10 and 100.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let model = DroneModel::ALL
            .choose(&mut rng)
            .copied()
            .unwrap_or(DroneModel::Lightweight);

        Self {
            serial_number: format!("SIM-{}", Uuid::new_v4().simple()),
            model,
            battery_level: rng.gen_range(MIN_INITIAL_BATTERY..=MAXIMUM_BATTERY_CAPACITY),
        }
    }
}

/// Generates manifests of valid medication items with normally distributed
/// weights. Codes never repeat within one generator.
pub struct ManifestGenerator {
    weight: Normal<f64>,
    max_items: usize,
    issued: u64,
}

impl ManifestGenerator {
    pub fn new(mean_weight: f64, weight_std_dev: f64, max_items: usize) -> Result<Self, NormalError> {
        Ok(Self {
            weight: Normal::new(mean_weight, weight_std_dev)?,
            max_items: max_items.max(1),
            issued: 0,
        })
    }

    /// Between one and `max_items` items.
    pub fn next_manifest(&mut self) -> Vec<NewMedicationItem> {
        let mut rng = rand::thread_rng();
        let count = rng.gen_range(1..=self.max_items);
        (0..count).map(|_| self.next_item(&mut rng)).collect()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_item(&mut self, rng: &mut impl Rng) -> NewMedicationItem {
        self.issued += 1;
        let name = MEDICATIONS.choose(&mut *rng).copied().unwrap_or("Paracetamol");
        let weight = self
            .weight
            .sample(&mut *rng)
            .round()
            .clamp(1.0, f64::from(MAXIMUM_WEIGHT_LIMIT)) as i64;

        NewMedicationItem {
            code: format!("{}_{}", name.to_uppercase(), self.issued),
            name: name.to_string(),
            weight,
            image_base64: PLACEHOLDER_IMAGE.to_string(),
        }
    }
}
