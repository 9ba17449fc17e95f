//! Plain-text rendering of a decoded vehicle, for e-mail bodies and the CLI
//!
//! Output is a list of sections separated by a blank line, each headed
//! `=== TITLE ===`. Only populated fields are listed and empty sections are
//! left out.

use crate::types::{VehicleField, VehicleRecord};

/// One output line
enum Line {
    /// `Label: value{suffix}`
    Field(&'static str, VehicleField, &'static str),
    /// City, state and country joined on one line
    PlantLocation,
}

const PLANT_LOCATION_FIELDS: [VehicleField; 3] = [
    VehicleField::PlantCity,
    VehicleField::PlantState,
    VehicleField::PlantCountry,
];

use Line::{Field, PlantLocation};

const SECTIONS: &[(&str, &[Line])] = &[
    (
        "BASIC INFORMATION",
        &[
            Field("Year", VehicleField::Year, ""),
            Field("Make", VehicleField::Make, ""),
            Field("Model", VehicleField::Model, ""),
            Field("Trim", VehicleField::Trim, ""),
            Field("Series", VehicleField::Series, ""),
        ],
    ),
    (
        "BODY & CONFIGURATION",
        &[
            Field("Body Class", VehicleField::BodyClass, ""),
            Field("Vehicle Type", VehicleField::VehicleType, ""),
            Field("Descriptor", VehicleField::Descriptor, ""),
            Field("Doors", VehicleField::Doors, ""),
            Field("Seats", VehicleField::Seats, ""),
            Field("Seat Rows", VehicleField::SeatRows, ""),
        ],
    ),
    (
        "ENGINE SPECIFICATIONS",
        &[
            Field("Cylinders", VehicleField::Cylinders, ""),
            Field("Engine Size", VehicleField::Displacement, "L"),
            Field("Engine Size (CI)", VehicleField::DisplacementCi, " ci"),
            Field("Engine Model", VehicleField::EngineModel, ""),
            Field("Engine Configuration", VehicleField::EngineConfig, ""),
            Field("Horsepower", VehicleField::Horsepower, ""),
            Field("Horsepower (max)", VehicleField::HorsepowerTo, ""),
        ],
    ),
    (
        "FUEL SYSTEM",
        &[
            Field("Fuel Type", VehicleField::FuelType, ""),
            Field("Secondary Fuel Type", VehicleField::FuelTypeSecondary, ""),
            Field("Fuel Injection", VehicleField::FuelInjection, ""),
            Field("Turbo", VehicleField::Turbo, ""),
            Field("Supercharger", VehicleField::Supercharger, ""),
        ],
    ),
    (
        "DRIVETRAIN",
        &[
            Field("Transmission", VehicleField::Transmission, ""),
            Field("Transmission Speeds", VehicleField::TransmissionSpeeds, ""),
            Field("Drive Type", VehicleField::DriveType, ""),
            Field("Axles", VehicleField::Axles, ""),
            Field("Axle Configuration", VehicleField::AxleConfig, ""),
        ],
    ),
    (
        "DIMENSIONS & WEIGHT",
        &[
            Field("GVWR", VehicleField::GvwrFrom, " lbs"),
            Field("GVWR (max)", VehicleField::GvwrTo, " lbs"),
            Field("Curb Weight", VehicleField::CurbWeight, " lbs"),
            Field("Wheelbase", VehicleField::Wheelbase, " in"),
            Field("Track Width", VehicleField::TrackWidth, " in"),
        ],
    ),
    (
        "SAFETY FEATURES",
        &[
            Field("Airbags", VehicleField::Airbags, ""),
            Field("ABS", VehicleField::Abs, ""),
            Field("ESC", VehicleField::Esc, ""),
            Field("Traction Control", VehicleField::Tcs, ""),
        ],
    ),
    (
        "MANUFACTURING",
        &[
            Field("Manufacturer", VehicleField::Manufacturer, ""),
            Field("Plant Company", VehicleField::PlantCompany, ""),
            PlantLocation,
        ],
    ),
    (
        "ADDITIONAL INFO",
        &[
            Field("MSRP", VehicleField::Msrp, ""),
            Field("Category", VehicleField::Category, ""),
            Field("Price", VehicleField::Price, ""),
            Field("Engine", VehicleField::EngineInfo, ""),
        ],
    ),
];

fn render_line(record: &VehicleRecord, line: &Line) -> Option<String> {
    match line {
        Field(label, field, suffix) => record
            .get(*field)
            .map(|value| format!("{}: {}{}", label, value, suffix)),
        PlantLocation => {
            let parts: Vec<&str> = PLANT_LOCATION_FIELDS
                .into_iter()
                .filter_map(|field| record.get(field))
                .collect();

            (!parts.is_empty()).then(|| format!("Plant Location: {}", parts.join(", ")))
        }
    }
}

/// Render a record as sectioned text (empty string for an empty record)
pub fn format_record(record: &VehicleRecord) -> String {
    SECTIONS
        .iter()
        .filter_map(|(title, lines)| {
            let rendered: Vec<String> = lines
                .iter()
                .filter_map(|line| render_line(record, line))
                .collect();

            (!rendered.is_empty())
                .then(|| format!("=== {} ===\n{}", title, rendered.join("\n")))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
