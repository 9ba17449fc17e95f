//! Upstream field name -> canonical field lookup tables
//!
//! One declarative table per source, shared by every code path that maps
//! upstream payloads. Names absent from a table are dropped.

use crate::types::VehicleField;

/// NHTSA vPIC `Variable` names
pub const NHTSA_FIELDS: &[(&str, VehicleField)] = &[
    // Basic
    ("Make", VehicleField::Make),
    ("Model", VehicleField::Model),
    ("Model Year", VehicleField::Year),
    ("Trim", VehicleField::Trim),
    ("Series", VehicleField::Series),
    // Body
    ("Body Class", VehicleField::BodyClass),
    ("Vehicle Type", VehicleField::VehicleType),
    ("Vehicle Descriptor", VehicleField::Descriptor),
    ("Number of Doors", VehicleField::Doors),
    ("Number of Seats", VehicleField::Seats),
    ("Number of Seat Rows", VehicleField::SeatRows),
    // Engine
    ("Engine Number of Cylinders", VehicleField::Cylinders),
    ("Displacement (L)", VehicleField::Displacement),
    ("Displacement (CI)", VehicleField::DisplacementCi),
    ("Engine Model", VehicleField::EngineModel),
    ("Engine HP", VehicleField::Horsepower),
    ("Engine HP (to)", VehicleField::HorsepowerTo),
    ("Engine Configuration", VehicleField::EngineConfig),
    // Fuel
    ("Fuel Type - Primary", VehicleField::FuelType),
    ("Fuel Type - Secondary", VehicleField::FuelTypeSecondary),
    ("Fuel Delivery / Fuel Injection Type", VehicleField::FuelInjection),
    ("Turbo", VehicleField::Turbo),
    ("Supercharger", VehicleField::Supercharger),
    // Drivetrain
    ("Transmission Style", VehicleField::Transmission),
    ("Transmission Speeds", VehicleField::TransmissionSpeeds),
    ("Drive Type", VehicleField::DriveType),
    ("Axles", VehicleField::Axles),
    ("Axle Configuration", VehicleField::AxleConfig),
    // Dimensions & weight
    ("Gross Vehicle Weight Rating From", VehicleField::GvwrFrom),
    ("Gross Vehicle Weight Rating To", VehicleField::GvwrTo),
    ("Curb Weight (pounds)", VehicleField::CurbWeight),
    ("Wheelbase (inches)", VehicleField::Wheelbase),
    ("Track Width (inches)", VehicleField::TrackWidth),
    // Safety
    ("Air Bag Localization", VehicleField::Airbags),
    ("Anti-lock Braking System (ABS)", VehicleField::Abs),
    ("Electronic Stability Control (ESC)", VehicleField::Esc),
    ("Traction Control System (TCS)", VehicleField::Tcs),
    // Manufacturing
    ("Manufacturer Name", VehicleField::Manufacturer),
    ("Plant City", VehicleField::PlantCity),
    ("Plant State", VehicleField::PlantState),
    ("Plant Country", VehicleField::PlantCountry),
    ("Plant Company Name", VehicleField::PlantCompany),
];

/// VinDecoder.eu keys inside `decode[0]`
pub const VINDECODER_FIELDS: &[(&str, VehicleField)] = &[
    ("msrp", VehicleField::Msrp),
    ("category", VehicleField::Category),
    ("price", VehicleField::Price),
    ("engine", VehicleField::EngineInfo),
];

/// Look up an upstream name in a table
pub fn lookup(table: &[(&str, VehicleField)], upstream: &str) -> Option<VehicleField> {
    table
        .iter()
        .find(|(name, _)| *name == upstream)
        .map(|(_, field)| *field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_names_map() {
        assert_eq!(lookup(NHTSA_FIELDS, "Model Year"), Some(VehicleField::Year));
        assert_eq!(lookup(NHTSA_FIELDS, "Engine HP"), Some(VehicleField::Horsepower));
        assert_eq!(lookup(VINDECODER_FIELDS, "engine"), Some(VehicleField::EngineInfo));
    }

    #[test]
    fn test_unknown_names_dropped() {
        assert_eq!(lookup(NHTSA_FIELDS, "Error Code"), None);
        assert_eq!(lookup(NHTSA_FIELDS, "model year"), None);
        assert_eq!(lookup(VINDECODER_FIELDS, "Make"), None);
    }

    #[test]
    fn test_no_duplicate_targets() {
        for table in [NHTSA_FIELDS, VINDECODER_FIELDS] {
            let targets: HashSet<_> = table.iter().map(|(_, f)| *f).collect();
            assert_eq!(targets.len(), table.len());
        }
    }

    #[test]
    fn test_tables_cover_every_field() {
        let covered: HashSet<_> = NHTSA_FIELDS
            .iter()
            .chain(VINDECODER_FIELDS.iter())
            .map(|(_, f)| *f)
            .collect();

        for field in VehicleField::ALL {
            assert!(covered.contains(&field), "{} has no upstream source", field);
        }
    }
}
