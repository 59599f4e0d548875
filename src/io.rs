use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::Path;

use beamify_field::{ArmorBlock, ArmorCatalog, Axis, Beam, BuiltField, MaterialKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct InputFile {
    #[serde(default)]
    pub cells: Vec<ArmorBlock>,
}

pub fn read_input(path: &Path) -> Result<Vec<ArmorBlock>, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let input: InputFile = toml::from_str(&s)?;
    Ok(input.cells)
}

/// One beam of the result, in world coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BeamRecord {
    pub pos: [i32; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
    pub length: usize,
    pub family: String,
    pub block: String,
    pub color: u32,
}

#[derive(Debug, Serialize)]
pub struct OutputFile {
    pub passes: usize,
    pub beams: Vec<BeamRecord>,
}

/// Maps field-space beams back to world positions and catalog variants.
///
/// Fails on the first beam whose material or length has no catalog variant, so no cell is
/// dropped from the report.
pub fn beam_records(
    built: &BuiltField,
    catalog: &ArmorCatalog,
    beams: &[Beam],
) -> Result<Vec<BeamRecord>, Box<dyn Error>> {
    let mut out = Vec::with_capacity(beams.len());
    for beam in beams {
        let key = MaterialKey::decode(beam.material)
            .ok_or_else(|| format!("beam {} at {} has no material", beam.id, beam.origin))?;
        let (Some(family), Some(block)) = (
            catalog.family(key.family_rank),
            catalog.variant_for(key.family_rank, beam.length),
        ) else {
            return Err(format!(
                "beam {} at {}: no variant of family {} spans {} cells",
                beam.id, beam.origin, key.family_rank, beam.length
            )
            .into());
        };
        out.push(BeamRecord {
            pos: built.to_world(beam.origin),
            axis: beam.axis,
            length: beam.length,
            family: family.name.clone(),
            block: block.to_string(),
            color: key.color,
        });
    }
    Ok(out)
}

pub fn write_output(path: Option<&Path>, report: &OutputFile) -> Result<(), Box<dyn Error>> {
    let text = toml::to_string(report)?;
    match path {
        Some(p) => fs::write(p, text)?,
        None => std::io::stdout().lock().write_all(text.as_bytes())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamify_field::{Coord, FieldBuilder};

    fn catalog() -> ArmorCatalog {
        ArmorCatalog::from_toml_str(
            r#"
            [[families]]
            name = "alloy"
            variants = ["a1", "a2", "a3", "a4"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn parses_cell_lists() {
        let input: InputFile = toml::from_str(
            r#"
            [[cells]]
            pos = [1, -2, 3]
            block = "a1"
            color = 4

            [[cells]]
            pos = [0, 0, 0]
            block = "a2"
            axis = "x"
            "#,
        )
        .unwrap();
        assert_eq!(input.cells.len(), 2);
        assert_eq!(input.cells[0].color, 4);
        assert_eq!(input.cells[1].axis, Some(Axis::X));
    }

    #[test]
    fn records_use_world_positions_and_catalog_variants() {
        let cat = catalog();
        let blocks: Vec<ArmorBlock> = (0..3)
            .map(|x| ArmorBlock {
                pos: [10 + x, 5, -1],
                block: "a1".into(),
                color: 7,
                axis: None,
            })
            .collect();
        let built = FieldBuilder::new(&cat).build(&blocks).unwrap();
        let beam = Beam {
            id: 1,
            origin: Coord::new(0, 0, 0),
            axis: Some(Axis::X),
            length: 3,
            material: built.field.get(Coord::new(0, 0, 0)),
        };
        let recs = beam_records(&built, &cat, &[beam]).unwrap();
        assert_eq!(
            recs,
            vec![BeamRecord {
                pos: [10, 5, -1],
                axis: Some(Axis::X),
                length: 3,
                family: "alloy".into(),
                block: "a3".into(),
                color: 7,
            }]
        );
        let out = toml::to_string(&OutputFile { passes: 1, beams: recs }).unwrap();
        assert!(out.contains("[[beams]]"));
        assert!(out.contains("block = \"a3\""));
    }

    #[test]
    fn unmappable_beams_fail_instead_of_vanishing() {
        let cat = catalog();
        let blocks = vec![ArmorBlock {
            pos: [0, 0, 0],
            block: "a1".into(),
            color: 0,
            axis: None,
        }];
        let built = FieldBuilder::new(&cat).build(&blocks).unwrap();
        let beam = |material, length| Beam {
            id: 1,
            origin: Coord::new(0, 0, 0),
            axis: None,
            length,
            material,
        };
        let material = built.field.get(Coord::new(0, 0, 0));
        assert!(beam_records(&built, &cat, &[beam(material, 5)]).is_err());
        assert!(beam_records(&built, &cat, &[beam(0, 1)]).is_err());
        // rank 3 does not exist in a one-family catalog
        let stray = MaterialKey { family_rank: 3, color: 0 }.encode().unwrap();
        assert!(beam_records(&built, &cat, &[beam(stray, 1)]).is_err());
        assert_eq!(beam_records(&built, &cat, &[beam(material, 1)]).unwrap().len(), 1);
    }
}
