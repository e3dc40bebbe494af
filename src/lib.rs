#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! ## Modules
//!
//! Leaf first, in the order a record travels through them:
//!
//! - [`cursor`]: seekable, position-tracking input and [`ByteSpan`]
//! - [`leader`]: the 24-byte leader
//! - [`directory`]: the 12-byte directory entries
//! - [`encoding`]: the [`TextPolicy`] applied to field bytes
//! - [`record`]: the in-memory [`Record`]
//! - [`assembler`]: field decoding and whole-record validation
//! - [`reader`]: the resynchronizing [`StreamReader`]
//! - [`writer`]: ISO 2709 serialization
//! - [`extract`], [`split`], [`config`]: what the command-line tool builds on

pub mod assembler;
pub mod config;
pub mod cursor;
pub mod directory;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod leader;
pub mod reader;
pub mod record;
pub mod split;
pub mod writer;

pub use config::{RecordRange, RunConfig};
pub use cursor::{read_span, ByteSpan};
pub use encoding::TextPolicy;
pub use error::{MarcError, ParseError, Result};
pub use extract::{extract_file, RecordInfo};
pub use leader::Leader;
pub use reader::{ReadOutcome, ReadSummary, ReaderOptions, ResyncStrategy, StreamReader};
pub use record::{DataField, Field, FieldBuilder, FieldKind, Record, RecordBuilder, Subfield, Tag, Value};
pub use split::{split_file, SplitReport};
pub use writer::MarcWriter;
