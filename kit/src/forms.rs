//! Form specs for the questionnaire steps.
//!
//! One constructor per step form. The form names key into the dynamic
//! validation-rules document (`rules.json`), which tightens the numeric
//! bounds at flow construction time.

use stepflow_core::{FieldSpec, FormSpec};

pub fn building_type() -> FormSpec {
    FormSpec::new("BuildingTypeForm").field(
        FieldSpec::choice(
            "building_type",
            [
                ("single_family", "Einfamilienhaus"),
                ("apartment_building", "Mehrfamilienhaus"),
            ],
        )
        .label("Um welche Art von Gebäude handelt es sich?"),
    )
}

pub fn building_details() -> FormSpec {
    FormSpec::new("BuildingDetailsForm")
        .field(FieldSpec::integer("construction_year").label("Baujahr des Gebäudes"))
        .field(FieldSpec::integer("living_space").label("Wohnfläche in m²"))
        .field(
            FieldSpec::integer("number_persons")
                .label("Wie viele Personen leben in dem Gebäude?")
                .min(1.0)
                .max(20.0),
        )
}

pub fn monument_protection() -> FormSpec {
    FormSpec::new("BuildingTypeProtectionForm").field(
        FieldSpec::choice("monument_protection", [("yes", "Ja"), ("no", "Nein")])
            .label("Steht das Gebäude unter Denkmalschutz?"),
    )
}

pub fn insulation() -> FormSpec {
    FormSpec::new("InsulationForm").field(
        FieldSpec::multi_choice(
            "insulation",
            [
                ("roof", "Dach"),
                ("facade", "Fassade"),
                ("windows", "Fenster"),
                ("cellar", "Kellerdecke"),
            ],
        )
        .label("Welche Bauteile wurden bereits gedämmt?")
        .optional(),
    )
}

pub fn heating_source() -> FormSpec {
    FormSpec::new("HeatingSourceForm").field(
        FieldSpec::choice(
            "heating_source",
            [
                ("gas", "Erdgas"),
                ("oil", "Heizöl"),
                ("district_heating", "Fernwärme"),
                ("heat_pump", "Wärmepumpe"),
                ("bio_mass", "Biomasse"),
            ],
        )
        .label("Womit wird aktuell geheizt?"),
    )
}

pub fn heating_year() -> FormSpec {
    FormSpec::new("HeatingYearForm")
        .field(FieldSpec::integer("heating_year").label("Baujahr der Heizungsanlage"))
}

pub fn solar_thermal_exists() -> FormSpec {
    FormSpec::new("HeatingSolarExistsForm").field(
        FieldSpec::choice(
            "solar_thermal_exists",
            [("exists", "Vorhanden"), ("doesnt_exist", "Nicht vorhanden")],
        )
        .label("Haben Sie eine Solarthermieanlage?"),
    )
}

pub fn solar_thermal_area() -> FormSpec {
    FormSpec::new("HeatingSolarAreaForm")
        .field(FieldSpec::float("solar_thermal_area").label("Kollektorfläche in m²"))
}

pub fn hotwater_supply() -> FormSpec {
    FormSpec::new("HotwaterSupplyForm").field(
        FieldSpec::choice(
            "hotwater_supply",
            [
                ("central", "Zentral über die Heizung"),
                ("decentral", "Dezentral (Durchlauferhitzer/Boiler)"),
            ],
        )
        .label("Wie wird das Warmwasser bereitet?"),
    )
}

pub fn heating_storage_exists() -> FormSpec {
    FormSpec::new("HeatingStorageExistsForm").field(
        FieldSpec::choice(
            "heating_storage_exists",
            [("exists", "Vorhanden"), ("doesnt_exist", "Nicht vorhanden")],
        )
        .label("Ist ein Pufferspeicher vorhanden?"),
    )
}

pub fn heating_storage_capacity() -> FormSpec {
    FormSpec::new("HeatingStorageCapacityForm")
        .field(FieldSpec::integer("heating_storage_capacity").label("Speichervolumen in Litern"))
}

pub fn roof_type() -> FormSpec {
    FormSpec::new("RoofTypeForm").field(
        FieldSpec::choice(
            "flat_roof",
            [("exists", "Flachdach"), ("doesnt_exist", "Geneigtes Dach")],
        )
        .label("Welche Dachform hat das Gebäude?"),
    )
}

pub fn roof_orientation() -> FormSpec {
    FormSpec::new("RoofOrientationForm").field(
        FieldSpec::choice(
            "roof_orientation",
            [
                ("n", "Nord"),
                ("ne", "Nordost"),
                ("e", "Ost"),
                ("se", "Südost"),
                ("s", "Süd"),
                ("sw", "Südwest"),
                ("w", "West"),
                ("nw", "Nordwest"),
            ],
        )
        .label("In welcher Richtung ist das Dach ausgerichtet?"),
    )
}

pub fn roof_inclination_known() -> FormSpec {
    FormSpec::new("RoofInclinationKnownForm").field(
        FieldSpec::choice(
            "roof_inclination_known",
            [("known", "Bekannt"), ("unknown", "Nicht bekannt")],
        )
        .label("Ist die Dachneigung bekannt?"),
    )
}

pub fn roof_inclination() -> FormSpec {
    FormSpec::new("RoofInclinationForm")
        .field(FieldSpec::integer("roof_inclination").label("Dachneigung in Grad"))
}

pub fn pv_system() -> FormSpec {
    FormSpec::new("PVSystemForm").field(
        FieldSpec::choice(
            "pv_exists",
            [("exists", "Vorhanden"), ("doesnt_exist", "Nicht vorhanden")],
        )
        .label("Haben Sie eine PV-Anlage?"),
    )
}

pub fn pv_capacity() -> FormSpec {
    FormSpec::new("PVSystemCapacityForm")
        .field(FieldSpec::float("pv_capacity").label("Installierte Leistung in kWp"))
}

pub fn battery_exists() -> FormSpec {
    FormSpec::new("PVSystemBatteryExistsForm").field(
        FieldSpec::choice(
            "battery_exists",
            [("exists", "Vorhanden"), ("doesnt_exist", "Nicht vorhanden")],
        )
        .label("Ist eine Batterie vorhanden?"),
    )
}

pub fn battery_capacity_known() -> FormSpec {
    FormSpec::new("PVSystemBatteryCapacityKnownForm").field(
        FieldSpec::choice(
            "battery_capacity_known",
            [("known", "Bekannt"), ("unknown", "Nicht bekannt")],
        )
        .label("Ist die Speicherkapazität bekannt?"),
    )
}

pub fn battery_capacity() -> FormSpec {
    FormSpec::new("PVSystemBatteryCapacityForm")
        .field(FieldSpec::float("battery_capacity").label("Speicherkapazität in kWh"))
}

pub fn renovation_technology() -> FormSpec {
    FormSpec::new("RenovationTechnologyForm").field(
        FieldSpec::choice(
            "primary_heating",
            [
                ("bio_mass", "Biomasseheizung"),
                ("heat_pump", "Wärmepumpe"),
                ("heating_rod", "Heizstab mit PV"),
                ("solar", "Solarthermie"),
            ],
        )
        .label("Welche Heiztechnologie wünschen Sie sich?"),
    )
}

pub fn renovation_biomass() -> FormSpec {
    FormSpec::new("RenovationBioMassForm").field(
        FieldSpec::choice(
            "bio_mass_source",
            [
                ("pellets", "Pellets"),
                ("wood_chips", "Hackschnitzel"),
                ("firewood", "Scheitholz"),
            ],
        )
        .label("Welcher Brennstoff soll eingesetzt werden?"),
    )
}

pub fn renovation_heatpump() -> FormSpec {
    FormSpec::new("RenovationHeatPumpForm").field(
        FieldSpec::choice(
            "heat_pump_type",
            [
                ("air", "Luft-Wasser"),
                ("ground", "Sole-Wasser"),
                ("water", "Wasser-Wasser"),
            ],
        )
        .label("Welche Wärmepumpenart kommt in Frage?"),
    )
}

pub fn renovation_pvsolar() -> FormSpec {
    FormSpec::new("RenovationPVSolarForm")
        .field(FieldSpec::float("pv_size").label("Gewünschte PV-Leistung in kWp"))
        .field(
            FieldSpec::boolean("battery_planned").label("Soll ein Batteriespeicher ergänzt werden?"),
        )
}

pub fn renovation_solar() -> FormSpec {
    FormSpec::new("RenovationSolarForm")
        .field(FieldSpec::float("collector_area").label("Gewünschte Kollektorfläche in m²"))
}

pub fn renovation_details() -> FormSpec {
    FormSpec::new("RenovationRequestForm").field(
        FieldSpec::multi_choice(
            "renovation_details",
            [
                ("roof", "Dachdämmung"),
                ("facade", "Fassadendämmung"),
                ("windows", "Fenstertausch"),
                ("cellar", "Kellerdeckendämmung"),
            ],
        )
        .label("Welche Sanierungsmaßnahmen sollen eingeplant werden?")
        .optional(),
    )
}

pub fn financial_support() -> FormSpec {
    FormSpec::new("FinancialSupportForm").field(
        FieldSpec::multi_choice(
            "financial_support",
            [
                ("kfw", "KfW-Kredit"),
                ("bafa", "BAFA-Zuschuss"),
                ("regional", "Regionale Förderprogramme"),
            ],
        )
        .label("Welche Förderungen möchten Sie berücksichtigen?")
        .optional(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_rules;
    use stepflow_core::FieldKind;

    #[test]
    fn test_rules_tighten_numeric_bounds() {
        let rules = default_rules().expect("rules parse");
        let mut spec = heating_year();
        rules.apply(&mut spec);
        match spec.fields()[0].kind {
            FieldKind::Integer { min, max } => {
                assert_eq!(min, Some(1980));
                assert_eq!(max, Some(2026));
            }
            _ => panic!("heating_year must stay an integer field"),
        }
    }

    #[test]
    fn test_unknown_rule_becomes_attribute() {
        let rules = default_rules().expect("rules parse");
        let mut spec = roof_inclination();
        rules.apply(&mut spec);
        assert_eq!(
            spec.fields()[0].attrs.get("step"),
            Some(&serde_json::json!(5))
        );
    }
}
