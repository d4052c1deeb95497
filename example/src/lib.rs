//! Rust types generated from `schema/rich.json` at build time.

#[allow(dead_code, non_camel_case_types, clippy::all)]
pub mod generated {
    include!(concat!(env!("OUT_DIR"), "/generated.rs"));
}
