use crate::codec::CodecSet;
use crate::types::SchemaSet;

/// Renders a validated schema and its codecs as source text for some
/// target language.
pub trait Emitter {
    fn emit(&self, schema: &SchemaSet, codecs: &CodecSet) -> String;
}
