//! In-memory VOTable object graph and the builders that produce it.

pub mod builder;
pub mod csv;
pub mod json;
pub mod row;
pub mod stream;
pub mod xml;
pub mod xpath;

use std::fmt;
use std::str::FromStr;

use derive_setters::Setters;

pub use row::{LongestValues, RowBuilder};

/// IVOA primitive datatypes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datatype {
    Boolean,
    Bit,
    UnsignedByte,
    Short,
    Int,
    Long,
    Char,
    UnicodeChar,
    Float,
    Double,
    FloatComplex,
    DoubleComplex,
    Other(String),
}

impl Datatype {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Datatype::UnsignedByte
                | Datatype::Short
                | Datatype::Int
                | Datatype::Long
                | Datatype::Float
                | Datatype::Double
        )
    }

    pub fn is_floating_point_numeric(&self) -> bool {
        matches!(self, Datatype::Float | Datatype::Double)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Datatype::Boolean => "boolean",
            Datatype::Bit => "bit",
            Datatype::UnsignedByte => "unsignedByte",
            Datatype::Short => "short",
            Datatype::Int => "int",
            Datatype::Long => "long",
            Datatype::Char => "char",
            Datatype::UnicodeChar => "unicodeChar",
            Datatype::Float => "float",
            Datatype::Double => "double",
            Datatype::FloatComplex => "floatComplex",
            Datatype::DoubleComplex => "doubleComplex",
            Datatype::Other(name) => name,
        }
    }
}

impl FromStr for Datatype {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "boolean" => Datatype::Boolean,
            "bit" => Datatype::Bit,
            "unsignedByte" => Datatype::UnsignedByte,
            "short" => Datatype::Short,
            "int" => Datatype::Int,
            "long" => Datatype::Long,
            "char" => Datatype::Char,
            "unicodeChar" => Datatype::UnicodeChar,
            "float" => Datatype::Float,
            "double" => Datatype::Double,
            "floatComplex" => Datatype::FloatComplex,
            "doubleComplex" => Datatype::DoubleComplex,
            other => Datatype::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of a table.
#[derive(Debug, Clone, Default, PartialEq, Setters)]
#[setters(prefix = "with_", strip_option, into)]
pub struct Field {
    pub name: String,
    pub id: String,
    pub ucd: Option<String>,
    pub utype: Option<String>,
    pub unit: Option<String>,
    pub xtype: Option<String>,
    pub datatype: Option<Datatype>,
    pub arraysize: Option<String>,
    pub description: String,
    pub label: String,
}

impl Field {
    /// A field whose id is `id` when given and non-empty, its name otherwise.
    pub fn new(name: impl Into<String>, id: Option<&str>) -> Self {
        let name = name.into();
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => name.clone(),
        };
        Self {
            label: name.clone(),
            name,
            id,
            ..Default::default()
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.datatype.as_ref().is_some_and(Datatype::is_numeric)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// A constant value attached to a VOTable, described like a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Param {
    pub field: Field,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub params: Vec<Param>,
    pub infos: Vec<Info>,
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

impl Metadata {
    pub fn with_fields(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_index(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }
}

/// Value of a single cell. Numeric cells that were empty or unparseable
/// hold `Float(NaN)`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl CellValue {
    pub fn nan() -> Self {
        CellValue::Float(f64::NAN)
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, CellValue::Text(_))
    }

    pub fn is_nan(&self) -> bool {
        match self {
            CellValue::Float(f) => f.is_nan(),
            CellValue::Integer(_) => false,
            CellValue::Text(s) => row::parse_float(s).is_nan(),
        }
    }

    /// Numeric view of the value, NaN when it has none.
    pub fn as_f64(&self) -> f64 {
        match self {
            CellValue::Float(f) => *f,
            CellValue::Integer(i) => *i as f64,
            CellValue::Text(s) => row::parse_float(s),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// NaN displays as an empty string, like the blank cell it came from.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) if v.is_nan() => Ok(()),
            CellValue::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub field_id: String,
}

impl Cell {
    pub fn new(value: CellValue, field: &Field) -> Self {
        Self {
            value,
            field_id: field.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(id: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }

    pub fn cell(&self, field_id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.field_id == field_id)
    }

    pub fn value(&self, field_id: &str) -> Option<&CellValue> {
        self.cell(field_id).map(|c| &c.value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub rows: Vec<Row>,
    pub longest_values: LongestValues,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub metadata: Metadata,
    pub data: TableData,
}

impl Table {
    pub fn new(metadata: Metadata, data: TableData) -> Self {
        Self { metadata, data }
    }

    pub fn fields(&self) -> &[Field] {
        &self.metadata.fields
    }

    pub fn rows(&self) -> &[Row] {
        &self.data.rows
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    pub id: Option<String>,
    pub name: Option<String>,
    /// `type="meta"` resources carry service descriptions, not results.
    pub meta: bool,
    pub metadata: Metadata,
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VOTable {
    pub metadata: Metadata,
    pub resources: Vec<Resource>,
}

impl VOTable {
    pub fn new(metadata: Metadata, resources: Vec<Resource>) -> Self {
        Self {
            metadata,
            resources,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.resources.iter().flat_map(|r| r.tables.iter())
    }

    /// The first table of the first resource that is not a meta resource.
    pub fn first_table(&self) -> Option<&Table> {
        self.resources
            .iter()
            .filter(|r| !r.meta)
            .flat_map(|r| r.tables.iter())
            .next()
    }
}
