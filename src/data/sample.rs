//! Synthetic plate generation from the growth model library.
//!
//! Each (strain, plate, well) gets one growth profile; every replicate of that
//! well evaluates the profile on a shared time grid and adds Gaussian read
//! noise. The control well always gets a weak "no growth" profile.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{GrowthModel, GrowthModelParams, PlateDataset, TimeSeries, WellId, WellKey};
use crate::error::AppError;
use crate::models::evaluate;

const PLATE_ROWS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
const PLATE_COLUMNS: usize = 12;

/// Parameters of a synthetic run.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
    pub strains: Vec<String>,
    pub plates: Vec<String>,
    /// Number of wells per plate, filled row-major from A1 (max 96).
    pub wells: usize,
    pub replicates: u32,
    pub model: GrowthModel,
    /// Last read time (hours).
    pub duration: f64,
    /// Read interval (hours).
    pub interval: f64,
    /// Standard deviation of the additive OD noise.
    pub noise_sd: f64,
    /// Probability that a non-control well grows.
    pub growth_fraction: f64,
    pub control_well: WellId,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            strains: vec!["WT".to_string(), "mutant".to_string()],
            plates: vec!["PM1".to_string()],
            wells: 24,
            replicates: 3,
            model: GrowthModel::Logistic,
            duration: 24.0,
            interval: 0.5,
            noise_sd: 0.01,
            growth_fraction: 0.4,
            control_well: WellId::new("A1"),
            seed: 42,
        }
    }
}

/// Well id at row-major position `index` of a 96-well plate.
pub fn well_at(index: usize) -> WellId {
    let row = PLATE_ROWS[(index / PLATE_COLUMNS) % PLATE_ROWS.len()];
    WellId::new(format!("{row}{}", index % PLATE_COLUMNS + 1))
}

/// Build a synthetic dataset.
pub fn generate_plate(spec: &SampleSpec) -> Result<PlateDataset, AppError> {
    validate(spec)?;
    let noise = Normal::new(0.0, spec.noise_sd)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;

    let times = time_grid(spec.duration, spec.interval);
    let mut dataset = PlateDataset::new();

    for strain in &spec.strains {
        for plate in &spec.plates {
            for index in 0..spec.wells {
                let well = well_at(index);
                let key = WellKey::new(strain.as_str(), plate.as_str(), well.as_str());
                let mut rng = StdRng::seed_from_u64(well_seed(spec.seed, &key));

                let is_control = well == spec.control_well;
                let profile = if is_control {
                    no_growth_profile(spec.model, &mut rng)
                } else if rng.gen_bool(spec.growth_fraction) {
                    growth_profile(spec.model, &mut rng)
                } else {
                    no_growth_profile(spec.model, &mut rng)
                };
                if is_control {
                    dataset.set_metabolite(plate.as_str(), well.clone(), "Negative Control");
                }

                for replicate in 1..=spec.replicates {
                    let series = replicate_series(&profile, &times, &noise, &mut rng)?;
                    dataset.insert(key.clone(), replicate, series);
                }
            }
        }
    }

    Ok(dataset)
}

fn validate(spec: &SampleSpec) -> Result<(), AppError> {
    if spec.strains.is_empty() || spec.plates.is_empty() {
        return Err(AppError::new(2, "At least one strain and one plate are required."));
    }
    if spec.wells == 0 || spec.wells > PLATE_ROWS.len() * PLATE_COLUMNS {
        return Err(AppError::new(2, "Well count must be between 1 and 96."));
    }
    if spec.replicates == 0 {
        return Err(AppError::new(2, "Replicate count must be > 0."));
    }
    if !(spec.interval.is_finite() && spec.interval > 0.0 && spec.duration.is_finite() && spec.duration > spec.interval) {
        return Err(AppError::new(2, "Invalid time grid (need 0 < interval < duration)."));
    }
    if !(0.0..=1.0).contains(&spec.growth_fraction) {
        return Err(AppError::new(2, "Growth fraction must be in [0, 1]."));
    }
    if !(spec.noise_sd.is_finite() && spec.noise_sd >= 0.0) {
        return Err(AppError::new(2, "Noise standard deviation must be finite and >= 0."));
    }
    Ok(())
}

fn time_grid(duration: f64, interval: f64) -> Vec<f64> {
    let steps = (duration / interval).floor() as usize;
    (0..=steps).map(|i| i as f64 * interval).collect()
}

fn well_seed(seed: u64, key: &WellKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

fn growth_profile(model: GrowthModel, rng: &mut StdRng) -> GrowthModelParams {
    GrowthModelParams::new(
        model,
        [
            rng.gen_range(0.8..1.8),
            rng.gen_range(0.08..0.35),
            rng.gen_range(2.0..8.0),
        ],
    )
}

fn no_growth_profile(model: GrowthModel, rng: &mut StdRng) -> GrowthModelParams {
    GrowthModelParams::new(
        model,
        [
            rng.gen_range(0.08..0.2),
            rng.gen_range(0.005..0.02),
            rng.gen_range(4.0..12.0),
        ],
    )
}

fn replicate_series(
    profile: &GrowthModelParams,
    times: &[f64],
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Result<TimeSeries, AppError> {
    let od = times
        .iter()
        .map(|&t| (evaluate(profile, t) + noise.sample(rng)).max(0.0))
        .collect();
    TimeSeries::new(times.to_vec(), od).map_err(|e| AppError::new(4, format!("Synthetic series rejected: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wells_fill_row_major() {
        assert_eq!(well_at(0).as_str(), "A1");
        assert_eq!(well_at(11).as_str(), "A12");
        assert_eq!(well_at(12).as_str(), "B1");
        assert_eq!(well_at(95).as_str(), "H12");
    }

    #[test]
    fn generates_every_key_and_replicate() {
        let spec = SampleSpec::default();
        let dataset = generate_plate(&spec).unwrap();
        assert_eq!(dataset.wells.len(), 2 * 24);
        assert_eq!(dataset.n_series(), 2 * 24 * 3);

        let control = WellKey::new("WT", "PM1", "A1");
        assert_eq!(dataset.metabolite(&control), Some("Negative Control"));
        let reps = &dataset.wells[&control];
        assert_eq!(reps[0].series.len(), 49);
        assert!(reps.iter().all(|r| r.series.od().iter().all(|v| *v >= 0.0)));
    }

    #[test]
    fn same_seed_same_plate() {
        let spec = SampleSpec {
            wells: 6,
            ..SampleSpec::default()
        };
        assert_eq!(generate_plate(&spec).unwrap(), generate_plate(&spec).unwrap());

        let other = SampleSpec { seed: 7, ..spec.clone() };
        assert_ne!(generate_plate(&spec).unwrap(), generate_plate(&other).unwrap());
    }

    #[test]
    fn rejects_bad_specs() {
        for spec in [
            SampleSpec { wells: 0, ..SampleSpec::default() },
            SampleSpec { wells: 97, ..SampleSpec::default() },
            SampleSpec { replicates: 0, ..SampleSpec::default() },
            SampleSpec { interval: 0.0, ..SampleSpec::default() },
            SampleSpec { noise_sd: -1.0, ..SampleSpec::default() },
            SampleSpec { strains: Vec::new(), ..SampleSpec::default() },
        ] {
            assert_eq!(generate_plate(&spec).unwrap_err().exit_code(), 2);
        }
    }
}
