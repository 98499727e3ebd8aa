//! TOML library descriptions.
//!
//! A thin on-disk stand-in for the Liberty front-end: the file lists
//! cells with pin names, functions, and physical properties, and maps
//! directly onto the loader records the library model consumes.

use serde::Deserialize;
use silica_library::{CellRecord, InputPinRecord, OutputPinRecord};

#[derive(Deserialize)]
pub struct LibraryFile {
    #[serde(default)]
    pub cells: Vec<CellEntry>,
}

#[derive(Deserialize)]
pub struct CellEntry {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    pub outputs: Vec<OutputEntry>,
    pub area: f32,
    #[serde(default)]
    pub delay: f32,
    #[serde(default)]
    pub leakage: f32,
}

#[derive(Deserialize)]
pub struct OutputEntry {
    pub name: String,
    pub function: String,
}

/// Parses a TOML library description into loader records.
pub fn parse(text: &str) -> Result<Vec<CellRecord>, String> {
    let file: LibraryFile = toml::from_str(text).map_err(|e| e.to_string())?;
    Ok(file
        .cells
        .into_iter()
        .map(|cell| CellRecord {
            name: cell.name,
            input_pins: cell
                .inputs
                .into_iter()
                .map(|name| InputPinRecord {
                    name,
                    capacitance: 1.0,
                })
                .collect(),
            output_pins: cell
                .outputs
                .into_iter()
                .map(|out| OutputPinRecord {
                    name: out.name,
                    function: out.function,
                    delay: None,
                })
                .collect(),
            area: cell.area,
            delay: cell.delay,
            leakage: cell.leakage,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_library() {
        let text = r#"
            [[cells]]
            name = "AND2"
            inputs = ["A", "B"]
            area = 2.0
            delay = 1.0

            [[cells.outputs]]
            name = "Y"
            function = "A & B"
        "#;
        let records = parse(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "AND2");
        assert_eq!(records[0].input_pins.len(), 2);
        assert_eq!(records[0].output_pins[0].function, "A & B");
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(parse("not toml at all [").is_err());
    }
}
