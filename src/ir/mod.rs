//! Compiled instruction-stream IR: byte layout, side-tables, builder,
//! walker, and the text dump backend.

pub mod builder;
pub mod dump;
pub mod error;
pub mod opcode;
pub mod stream;
pub mod varint;
pub mod walker;

pub use builder::{ArgSpec, ArraySpec, StreamBuilder};
pub use dump::{dump_stream, StreamDumper};
pub use error::{IrError, IrErrorKind};
pub use opcode::{FieldKind, PrimitiveType};
pub use stream::{
    ByteOrder, CustomTypeDescriptor, Evaluator, InstructionStream, NamedFieldDescriptor,
};
pub use walker::{walk_stream, EventSink};
