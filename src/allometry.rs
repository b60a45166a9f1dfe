//! Allometric estimates derived from tree height and DBH.
//!
//! Biomass uses the relation `0.0509 * D^2.54 * H^0.57`
//! (D in cm, H in m). Carbon is taken as half the dry biomass and converted to
//! CO2 by the molar mass ratio 44/12.
//!
//! [`AccuracyReport`] scores a measurement against field readings taken with a
//! tape and clinometer.

use serde::Serialize;
use std::f64::consts::PI;

use crate::measure::MeasurementResult;

const BIOMASS_COEFFICIENT: f64 = 0.0509;
const BIOMASS_DIAMETER_EXPONENT: f64 = 2.54;
const BIOMASS_HEIGHT_EXPONENT: f64 = 0.57;
const CARBON_FRACTION: f64 = 0.5;
const CO2_PER_CARBON: f64 = 3.67;

const CAR_CO2_KG_PER_DAY: f64 = 12.6;
const PHONE_CHARGE_CO2_G: f64 = 8.22;
const PLASTIC_BOTTLE_CO2_G: f64 = 82.8;

/// Diameter from a tape-measured circumference (same unit in and out).
pub fn diameter_from_circumference(circumference: f64) -> f64 {
    circumference / PI
}

/// Above-ground dry biomass in kilograms.
pub fn biomass_kg(diameter_cm: f64, height_m: f64) -> f64 {
    BIOMASS_COEFFICIENT
        * diameter_cm.powf(BIOMASS_DIAMETER_EXPONENT)
        * height_m.powf(BIOMASS_HEIGHT_EXPONENT)
}

pub fn co2_absorbed_kg(biomass_kg: f64) -> f64 {
    biomass_kg * CARBON_FRACTION * CO2_PER_CARBON
}

/// Agreement between a measurement and a reference value, in `[0, 100]`.
///
/// `0` when the reference is zero.
pub fn accuracy_percent(measured: f64, actual: f64) -> f64 {
    if actual == 0.0 {
        return 0.0;
    }
    let error_percent = ((measured - actual) / actual).abs() * 100.0;
    (100.0 - error_percent).clamp(0.0, 100.0)
}

/// Everyday equivalents of an amount of CO2.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Co2Equivalents {
    /// Days of average car emissions, one decimal.
    pub car_days: f64,
    pub phone_charges: u64,
    pub plastic_bottles: u64,
}

pub fn co2_equivalents(co2_kg: f64) -> Co2Equivalents {
    let co2_g = co2_kg.max(0.0) * 1000.0;
    Co2Equivalents {
        car_days: round_to(co2_kg / CAR_CO2_KG_PER_DAY, 1),
        phone_charges: (co2_g / PHONE_CHARGE_CO2_G).round() as u64,
        plastic_bottles: (co2_g / PLASTIC_BOTTLE_CO2_G).round() as u64,
    }
}

/// Carbon estimate for a measured tree.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CarbonEstimate {
    pub biomass_kg: f64,
    pub co2_absorbed_kg: f64,
    pub equivalents: Co2Equivalents,
}

impl CarbonEstimate {
    pub fn new(diameter_cm: f64, height_m: f64) -> Self {
        let biomass = biomass_kg(diameter_cm, height_m);
        let co2 = co2_absorbed_kg(biomass);
        Self {
            biomass_kg: biomass,
            co2_absorbed_kg: co2,
            equivalents: co2_equivalents(co2),
        }
    }

    /// `None` unless both height and DBH were measured.
    pub fn from_measurement(result: &MeasurementResult) -> Option<Self> {
        if result.tree_height_m <= 0.0 || result.dbh_cm <= 0.0 {
            return None;
        }
        Some(Self::new(result.dbh_cm, result.tree_height_m))
    }
}

/// Agreement of a measurement with field readings of the same tree, in
/// percent with one decimal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub height_percent: f64,
    pub diameter_percent: f64,
    pub overall_percent: f64,
}

impl AccuracyReport {
    /// Compare against a measured height and a tape circumference at breast
    /// height. The circumference is converted to a diameter first.
    pub fn compare(
        result: &MeasurementResult,
        actual_height_m: f64,
        actual_circumference_cm: f64,
    ) -> Self {
        let actual_diameter_cm = diameter_from_circumference(actual_circumference_cm);
        let height = accuracy_percent(result.tree_height_m, actual_height_m);
        let diameter = accuracy_percent(result.dbh_cm, actual_diameter_cm);
        Self {
            height_percent: round_to(height, 1),
            diameter_percent: round_to(diameter, 1),
            overall_percent: round_to((height + diameter) / 2.0, 1),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
