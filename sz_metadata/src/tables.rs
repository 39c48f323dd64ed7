//! The `#~` table stream: row counts, row layouts, and cell access.
//!
//! Row widths depend on the row counts of other tables and on the heap-size
//! flags, so the layout of every table the stream may contain is computed up
//! front even though only a handful of tables are ever read.

use crate::cursor::Cursor;
use crate::error::{MetadataError, Result};

pub(crate) const TABLE_COUNT: usize = 0x2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Table {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRva = 0x1D,
    EncLog = 0x1E,
    EncMap = 0x1F,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOs = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOs = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
}

const ALL_TABLES: [Table; TABLE_COUNT] = [
    Table::Module,
    Table::TypeRef,
    Table::TypeDef,
    Table::FieldPtr,
    Table::Field,
    Table::MethodPtr,
    Table::MethodDef,
    Table::ParamPtr,
    Table::Param,
    Table::InterfaceImpl,
    Table::MemberRef,
    Table::Constant,
    Table::CustomAttribute,
    Table::FieldMarshal,
    Table::DeclSecurity,
    Table::ClassLayout,
    Table::FieldLayout,
    Table::StandAloneSig,
    Table::EventMap,
    Table::EventPtr,
    Table::Event,
    Table::PropertyMap,
    Table::PropertyPtr,
    Table::Property,
    Table::MethodSemantics,
    Table::MethodImpl,
    Table::ModuleRef,
    Table::TypeSpec,
    Table::ImplMap,
    Table::FieldRva,
    Table::EncLog,
    Table::EncMap,
    Table::Assembly,
    Table::AssemblyProcessor,
    Table::AssemblyOs,
    Table::AssemblyRef,
    Table::AssemblyRefProcessor,
    Table::AssemblyRefOs,
    Table::File,
    Table::ExportedType,
    Table::ManifestResource,
    Table::NestedClass,
    Table::GenericParam,
    Table::MethodSpec,
    Table::GenericParamConstraint,
];

impl Table {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Table::Module => "Module",
            Table::TypeRef => "TypeRef",
            Table::TypeDef => "TypeDef",
            Table::FieldPtr => "FieldPtr",
            Table::Field => "Field",
            Table::MethodPtr => "MethodPtr",
            Table::MethodDef => "MethodDef",
            Table::ParamPtr => "ParamPtr",
            Table::Param => "Param",
            Table::PropertyMap => "PropertyMap",
            Table::PropertyPtr => "PropertyPtr",
            Table::Property => "Property",
            Table::Assembly => "Assembly",
            Table::NestedClass => "NestedClass",
            _ => "metadata",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodedIndex {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndex {
    fn tag_bits(self) -> u32 {
        match self {
            CodedIndex::HasFieldMarshal
            | CodedIndex::HasSemantics
            | CodedIndex::MethodDefOrRef
            | CodedIndex::MemberForwarded
            | CodedIndex::TypeOrMethodDef => 1,
            CodedIndex::TypeDefOrRef
            | CodedIndex::HasConstant
            | CodedIndex::HasDeclSecurity
            | CodedIndex::Implementation
            | CodedIndex::ResolutionScope => 2,
            CodedIndex::MemberRefParent | CodedIndex::CustomAttributeType => 3,
            CodedIndex::HasCustomAttribute => 5,
        }
    }

    fn tables(self) -> &'static [Table] {
        match self {
            CodedIndex::TypeDefOrRef => &[Table::TypeDef, Table::TypeRef, Table::TypeSpec],
            CodedIndex::HasConstant => &[Table::Field, Table::Param, Table::Property],
            CodedIndex::HasCustomAttribute => &[
                Table::MethodDef,
                Table::Field,
                Table::TypeRef,
                Table::TypeDef,
                Table::Param,
                Table::InterfaceImpl,
                Table::MemberRef,
                Table::Module,
                Table::DeclSecurity,
                Table::Property,
                Table::Event,
                Table::StandAloneSig,
                Table::ModuleRef,
                Table::TypeSpec,
                Table::Assembly,
                Table::AssemblyRef,
                Table::File,
                Table::ExportedType,
                Table::ManifestResource,
                Table::GenericParam,
                Table::GenericParamConstraint,
                Table::MethodSpec,
            ],
            CodedIndex::HasFieldMarshal => &[Table::Field, Table::Param],
            CodedIndex::HasDeclSecurity => &[Table::TypeDef, Table::MethodDef, Table::Assembly],
            CodedIndex::MemberRefParent => &[
                Table::TypeDef,
                Table::TypeRef,
                Table::ModuleRef,
                Table::MethodDef,
                Table::TypeSpec,
            ],
            CodedIndex::HasSemantics => &[Table::Event, Table::Property],
            CodedIndex::MethodDefOrRef => &[Table::MethodDef, Table::MemberRef],
            CodedIndex::MemberForwarded => &[Table::Field, Table::MethodDef],
            CodedIndex::Implementation => &[Table::File, Table::AssemblyRef, Table::ExportedType],
            CodedIndex::CustomAttributeType => &[Table::MethodDef, Table::MemberRef],
            CodedIndex::ResolutionScope => &[
                Table::Module,
                Table::ModuleRef,
                Table::AssemblyRef,
                Table::TypeRef,
            ],
            CodedIndex::TypeOrMethodDef => &[Table::TypeDef, Table::MethodDef],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Fixed(usize),
    String,
    Guid,
    Blob,
    Index(Table),
    Coded(CodedIndex),
}

fn columns(table: Table) -> &'static [Column] {
    use CodedIndex as C;
    use Column::{Blob, Coded, Fixed, Guid, Index, String};
    match table {
        Table::Module => &[Fixed(2), String, Guid, Guid, Guid],
        Table::TypeRef => &[Coded(C::ResolutionScope), String, String],
        Table::TypeDef => &[
            Fixed(4),
            String,
            String,
            Coded(C::TypeDefOrRef),
            Index(Table::Field),
            Index(Table::MethodDef),
        ],
        Table::FieldPtr => &[Index(Table::Field)],
        Table::Field => &[Fixed(2), String, Blob],
        Table::MethodPtr => &[Index(Table::MethodDef)],
        Table::MethodDef => &[
            Fixed(4),
            Fixed(2),
            Fixed(2),
            String,
            Blob,
            Index(Table::Param),
        ],
        Table::ParamPtr => &[Index(Table::Param)],
        Table::Param => &[Fixed(2), Fixed(2), String],
        Table::InterfaceImpl => &[Index(Table::TypeDef), Coded(C::TypeDefOrRef)],
        Table::MemberRef => &[Coded(C::MemberRefParent), String, Blob],
        Table::Constant => &[Fixed(2), Coded(C::HasConstant), Blob],
        Table::CustomAttribute => &[
            Coded(C::HasCustomAttribute),
            Coded(C::CustomAttributeType),
            Blob,
        ],
        Table::FieldMarshal => &[Coded(C::HasFieldMarshal), Blob],
        Table::DeclSecurity => &[Fixed(2), Coded(C::HasDeclSecurity), Blob],
        Table::ClassLayout => &[Fixed(2), Fixed(4), Index(Table::TypeDef)],
        Table::FieldLayout => &[Fixed(4), Index(Table::Field)],
        Table::StandAloneSig => &[Blob],
        Table::EventMap => &[Index(Table::TypeDef), Index(Table::Event)],
        Table::EventPtr => &[Index(Table::Event)],
        Table::Event => &[Fixed(2), String, Coded(C::TypeDefOrRef)],
        Table::PropertyMap => &[Index(Table::TypeDef), Index(Table::Property)],
        Table::PropertyPtr => &[Index(Table::Property)],
        Table::Property => &[Fixed(2), String, Blob],
        Table::MethodSemantics => &[Fixed(2), Index(Table::MethodDef), Coded(C::HasSemantics)],
        Table::MethodImpl => &[
            Index(Table::TypeDef),
            Coded(C::MethodDefOrRef),
            Coded(C::MethodDefOrRef),
        ],
        Table::ModuleRef => &[String],
        Table::TypeSpec => &[Blob],
        Table::ImplMap => &[
            Fixed(2),
            Coded(C::MemberForwarded),
            String,
            Index(Table::ModuleRef),
        ],
        Table::FieldRva => &[Fixed(4), Index(Table::Field)],
        Table::EncLog => &[Fixed(4), Fixed(4)],
        Table::EncMap => &[Fixed(4)],
        Table::Assembly => &[
            Fixed(4),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(4),
            Blob,
            String,
            String,
        ],
        Table::AssemblyProcessor => &[Fixed(4)],
        Table::AssemblyOs => &[Fixed(4), Fixed(4), Fixed(4)],
        Table::AssemblyRef => &[
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(4),
            Blob,
            String,
            String,
            Blob,
        ],
        Table::AssemblyRefProcessor => &[Fixed(4), Index(Table::AssemblyRef)],
        Table::AssemblyRefOs => &[Fixed(4), Fixed(4), Fixed(4), Index(Table::AssemblyRef)],
        Table::File => &[Fixed(4), String, Blob],
        Table::ExportedType => &[Fixed(4), Fixed(4), String, String, Coded(C::Implementation)],
        Table::ManifestResource => &[Fixed(4), Fixed(4), String, Coded(C::Implementation)],
        Table::NestedClass => &[Index(Table::TypeDef), Index(Table::TypeDef)],
        Table::GenericParam => &[Fixed(2), Fixed(2), Coded(C::TypeOrMethodDef), String],
        Table::MethodSpec => &[Coded(C::MethodDefOrRef), Blob],
        Table::GenericParamConstraint => &[Index(Table::GenericParam), Coded(C::TypeDefOrRef)],
    }
}

const HEAP_STRINGS_WIDE: u8 = 0x01;
const HEAP_GUID_WIDE: u8 = 0x02;
const HEAP_BLOB_WIDE: u8 = 0x04;
const HEAP_EXTRA_DATA: u8 = 0x40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct HeapSizes {
    pub(crate) strings_wide: bool,
    pub(crate) guid_wide: bool,
    pub(crate) blob_wide: bool,
}

impl HeapSizes {
    pub(crate) fn from_flags(flags: u8) -> Self {
        Self {
            strings_wide: flags & HEAP_STRINGS_WIDE != 0,
            guid_wide: flags & HEAP_GUID_WIDE != 0,
            blob_wide: flags & HEAP_BLOB_WIDE != 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TableLayout<'data> {
    rows: u32,
    row_size: usize,
    column_offsets: Vec<(usize, bool)>,
    data: &'data [u8],
}

#[derive(Debug, Clone)]
pub(crate) struct TableStream<'data> {
    layouts: Vec<TableLayout<'data>>,
}

impl<'data> TableStream<'data> {
    pub(crate) fn parse(data: &'data [u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data, "#~ stream header");
        let _reserved = cursor.read_u32()?;
        let _major_version = cursor.read_u8()?;
        let _minor_version = cursor.read_u8()?;
        let heap_flags = cursor.read_u8()?;
        let _reserved = cursor.read_u8()?;
        let valid = cursor.read_u64()?;
        let _sorted = cursor.read_u64()?;

        let mut row_counts = [0u32; TABLE_COUNT];
        for bit in 0..64u8 {
            if valid & (1u64 << bit) == 0 {
                continue;
            }
            if usize::from(bit) >= TABLE_COUNT {
                return Err(MetadataError::UnsupportedTable(bit));
            }
            row_counts[usize::from(bit)] = cursor.read_u32()?;
        }
        if heap_flags & HEAP_EXTRA_DATA != 0 {
            cursor.skip(4)?;
        }

        let heap_sizes = HeapSizes::from_flags(heap_flags);
        let table_data = &data[data.len() - cursor.remaining()..];
        let layouts = layout_tables(&row_counts, heap_sizes, table_data)?;
        Ok(Self { layouts })
    }

    pub(crate) fn row_count(&self, table: Table) -> u32 {
        self.layouts[table as usize].rows
    }

    #[cfg(test)]
    pub(crate) fn row_size(&self, table: Table) -> usize {
        self.layouts[table as usize].row_size
    }

    /// Reads column `column` of one-based row `row`.
    pub(crate) fn cell(&self, table: Table, row: u32, column: usize) -> Result<u32> {
        let layout = &self.layouts[table as usize];
        if row == 0 || row > layout.rows {
            return Err(MetadataError::BadRowIndex {
                table: table.name(),
                row,
            });
        }
        let (column_offset, wide) = layout.column_offsets[column];
        let offset = (row as usize - 1) * layout.row_size + column_offset;
        Cursor::at(layout.data, offset, "metadata table row")?.read_index(wide)
    }
}

fn layout_tables<'data>(
    row_counts: &[u32; TABLE_COUNT],
    heap_sizes: HeapSizes,
    table_data: &'data [u8],
) -> Result<Vec<TableLayout<'data>>> {
    let mut cursor = Cursor::new(table_data, "metadata tables");
    let mut layouts = Vec::with_capacity(TABLE_COUNT);
    for table in ALL_TABLES {
        let rows = row_counts[table as usize];
        let mut column_offsets = Vec::with_capacity(columns(table).len());
        let mut row_size = 0usize;
        for column in columns(table) {
            let width = column_width(*column, row_counts, heap_sizes);
            column_offsets.push((row_size, width == 4));
            row_size += width;
        }
        let data = if rows == 0 {
            &[][..]
        } else {
            cursor.read_bytes(row_size * rows as usize)?
        };
        layouts.push(TableLayout {
            rows,
            row_size,
            column_offsets,
            data,
        });
    }
    Ok(layouts)
}

fn column_width(column: Column, row_counts: &[u32; TABLE_COUNT], heap_sizes: HeapSizes) -> usize {
    match column {
        Column::Fixed(width) => width,
        Column::String => wide_width(heap_sizes.strings_wide),
        Column::Guid => wide_width(heap_sizes.guid_wide),
        Column::Blob => wide_width(heap_sizes.blob_wide),
        Column::Index(table) => wide_width(row_counts[table as usize] > 0xFFFF),
        Column::Coded(coded) => {
            let max_rows = coded
                .tables()
                .iter()
                .map(|table| row_counts[*table as usize])
                .max()
                .unwrap_or(0);
            wide_width(u64::from(max_rows) >= 1u64 << (16 - coded.tag_bits()))
        }
    }
}

fn wide_width(wide: bool) -> usize {
    if wide { 4 } else { 2 }
}

pub(crate) mod column {
    pub(crate) const MODULE_NAME: usize = 1;

    pub(crate) const TYPE_DEF_FLAGS: usize = 0;
    pub(crate) const TYPE_DEF_NAME: usize = 1;
    pub(crate) const TYPE_DEF_NAMESPACE: usize = 2;
    pub(crate) const TYPE_DEF_FIELD_LIST: usize = 4;
    pub(crate) const TYPE_DEF_METHOD_LIST: usize = 5;

    pub(crate) const FIELD_NAME: usize = 1;
    pub(crate) const FIELD_SIGNATURE: usize = 2;

    pub(crate) const METHOD_RVA: usize = 0;
    pub(crate) const METHOD_NAME: usize = 3;
    pub(crate) const METHOD_SIGNATURE: usize = 4;
    pub(crate) const METHOD_PARAM_LIST: usize = 5;

    pub(crate) const PARAM_NAME: usize = 2;

    pub(crate) const PROPERTY_MAP_PARENT: usize = 0;
    pub(crate) const PROPERTY_MAP_PROPERTY_LIST: usize = 1;

    pub(crate) const PROPERTY_NAME: usize = 1;
    pub(crate) const PROPERTY_SIGNATURE: usize = 2;

    pub(crate) const NESTED_CLASS_NESTED: usize = 0;
    pub(crate) const NESTED_CLASS_ENCLOSING: usize = 1;

    pub(crate) const ASSEMBLY_NAME: usize = 7;

    pub(crate) const POINTER_TARGET: usize = 0;
}
