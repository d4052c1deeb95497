// Generates `$OUT_DIR/generated.rs` from `schema/rich.json`.

use std::error::Error;
use std::path::PathBuf;
use std::{env, fs};

use brine_proto_compiler::{compile_schema, compile_schema_to_rust};

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=schema/rich.json");

    let text = fs::read_to_string("schema/rich.json")?;
    let (schema, codecs) = compile_schema(&text)?;
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    fs::write(out_dir.join("generated.rs"), compile_schema_to_rust(&schema, &codecs))?;
    Ok(())
}
