//! IR error contracts.

use std::fmt;

/// Stable IR error categories.
///
/// Every variant is fatal: a failing stream is corrupt or foreign and
/// retrying can never succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrErrorKind {
    /// A varint marker byte outside the produced set.
    InvalidVarint,
    /// The byte stream ended in the middle of an instruction.
    UnexpectedEnd,
    /// The low opcode bits select no known field kind.
    UnknownFieldKind,
    /// An alternate-type bit was set on a kind that has no alternate.
    InvalidAltType,
    /// A side-table pop was requested past the end of the table.
    SideTableExhausted,
    /// A side-table still held entries when the byte stream ended.
    SideTableResidue,
    /// A custom-type index does not address the custom-type table.
    CustomTypeOutOfBounds,
    /// Two named fields share one structural path.
    DuplicateFieldPath,
    /// An instruction that requires a field name carries none.
    MissingFieldName,
    /// A backend or decompiler reported an internal invariant violation.
    InternalInvariant,
}

impl fmt::Display for IrErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidVarint => "invalid varint marker",
            Self::UnexpectedEnd => "unexpected end of instruction stream",
            Self::UnknownFieldKind => "unknown field kind",
            Self::InvalidAltType => "invalid alternate type",
            Self::SideTableExhausted => "side table exhausted early",
            Self::SideTableResidue => "side table not exhausted",
            Self::CustomTypeOutOfBounds => "custom type index out of bounds",
            Self::DuplicateFieldPath => "duplicate field path",
            Self::MissingFieldName => "missing field name",
            Self::InternalInvariant => "internal invariant violation",
        };
        f.write_str(text)
    }
}

/// IR error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrError {
    /// Error category.
    pub kind: IrErrorKind,
    /// Byte offset into the instruction stream, when known.
    pub offset: Option<usize>,
    /// Human-readable error summary.
    pub message: String,
    /// Optional additional detail.
    pub detail: Option<String>,
}

impl IrError {
    /// Creates an IR error.
    pub fn new(
        kind: IrErrorKind,
        offset: Option<usize>,
        message: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            kind,
            offset,
            message: message.into(),
            detail,
        }
    }

    /// Creates an `InvalidVarint` error.
    pub fn invalid_varint(offset: usize, marker: u8) -> Self {
        Self::new(
            IrErrorKind::InvalidVarint,
            Some(offset),
            "invalid varint marker byte",
            Some(format!("marker 0x{marker:02X} at offset {offset}")),
        )
    }

    /// Creates an `UnexpectedEnd` error.
    pub fn unexpected_end(offset: usize, message: impl Into<String>) -> Self {
        Self::new(IrErrorKind::UnexpectedEnd, Some(offset), message, None)
    }

    /// Creates an `UnknownFieldKind` error.
    pub fn unknown_field_kind(offset: usize, code: u16) -> Self {
        Self::new(
            IrErrorKind::UnknownFieldKind,
            Some(offset),
            "unknown field kind in opcode",
            Some(format!("code 0x{code:04X} at offset {offset}")),
        )
    }

    /// Creates an `InvalidAltType` error.
    pub fn invalid_alt_type(offset: usize, detail: impl Into<String>) -> Self {
        Self::new(
            IrErrorKind::InvalidAltType,
            Some(offset),
            "alternate-type bit set on a kind without an alternate",
            Some(detail.into()),
        )
    }

    /// Creates a `SideTableExhausted` error.
    pub fn side_table_exhausted(offset: usize, table: &str) -> Self {
        Self::new(
            IrErrorKind::SideTableExhausted,
            Some(offset),
            format!("{table} table exhausted before end of stream"),
            None,
        )
    }

    /// Creates a `SideTableResidue` error.
    pub fn side_table_residue(table: &str, consumed: usize, len: usize) -> Self {
        Self::new(
            IrErrorKind::SideTableResidue,
            None,
            format!("{table} table not exhausted at end of stream"),
            Some(format!("consumed {consumed} of {len}")),
        )
    }

    /// Creates a `CustomTypeOutOfBounds` error.
    pub fn custom_type_out_of_bounds(offset: usize, index: i32, len: usize) -> Self {
        Self::new(
            IrErrorKind::CustomTypeOutOfBounds,
            Some(offset),
            "custom type index out of bounds",
            Some(format!("index {index}, table length {len}")),
        )
    }

    /// Creates a `DuplicateFieldPath` error.
    pub fn duplicate_field_path(path: &str) -> Self {
        Self::new(
            IrErrorKind::DuplicateFieldPath,
            None,
            "two named fields share one structural path",
            Some(format!("path '{path}'")),
        )
    }

    /// Creates a `MissingFieldName` error.
    pub fn missing_field_name(offset: usize, detail: impl Into<String>) -> Self {
        Self::new(
            IrErrorKind::MissingFieldName,
            Some(offset),
            "instruction requires a field name",
            Some(detail.into()),
        )
    }

    /// Creates an `InternalInvariant` error.
    pub fn internal_invariant(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(
            IrErrorKind::InternalInvariant,
            None,
            message,
            Some(detail.into()),
        )
    }
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl std::error::Error for IrError {}
