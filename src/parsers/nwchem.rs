use crate::parsers::ParserSpec;

pub const NAME: &str = "nwchem";
pub const SCRIPT: &str = "chem/nwchem.py";
pub const OUTPUT_FILE: &str = "nwchem-output.json";
pub const MOLECULE_IMAGE_FILE: &str = "nwchem-molecule.png";

/// NWChem output parser. Also renders the final geometry as a PNG.
pub fn spec() -> ParserSpec {
    ParserSpec {
        name: NAME.to_string(),
        description: "NWChem output to JSON record, with molecule image".to_string(),
        script: SCRIPT.to_string(),
        output_file: OUTPUT_FILE.to_string(),
        aux_file: Some(MOLECULE_IMAGE_FILE.to_string()),
    }
}
