//! Wire messages of the record format, generated from `src/proto/*.proto`.

include!(concat!(env!("OUT_DIR"), "/generated_with_pure/mod.rs"));
