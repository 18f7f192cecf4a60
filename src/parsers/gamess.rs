use crate::parsers::ParserSpec;

pub const NAME: &str = "gamess";
pub const SCRIPT: &str = "chem/gamess.py";
pub const OUTPUT_FILE: &str = "gamess-output.json";

/// GAMESS log parser. The script writes only the JSON record.
pub fn spec() -> ParserSpec {
    ParserSpec {
        name: NAME.to_string(),
        description: "GAMESS output log to JSON record".to_string(),
        script: SCRIPT.to_string(),
        output_file: OUTPUT_FILE.to_string(),
        aux_file: None,
    }
}
