//! Decoders for the entity content stored in the cache: item, NPC and
//! location-object definitions, widget trees, sprite sheets and map
//! regions.
//!
//! Definition records are opcode streams: a tag byte selects a field
//! setter with a statically-known payload, and a zero tag terminates the
//! record. The shared loop lives in [`opcode`]; each entity type supplies
//! its table by implementing [`OpcodeDecode`].

pub mod error;
pub mod item;
pub mod location;
pub mod npc;
pub mod opcode;
pub mod region;
pub mod sprite;
pub mod widget;

pub use error::Error;
pub use opcode::{decode_record, decode_record_into, OpcodeDecode};

/// Result type for decoders.
pub type Result<T> = std::result::Result<T, Error>;

/// Which cache generation a definition was decoded from.
///
/// The original modeled the generations as parallel class hierarchies;
/// here a definition is one struct with a discriminant, and fields that
/// only one generation carries are `Option`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Era {
    /// The early `main_file_cache.dat` generation.
    Early,
    /// The `main_file_cache.dat2` generation.
    #[default]
    Modern,
}
