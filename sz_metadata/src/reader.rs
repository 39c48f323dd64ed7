use std::collections::HashMap;
use std::ops::Range;

use indexmap::IndexMap;

use crate::body::method_body_len;
use crate::error::{MetadataError, Result};
use crate::heaps::{BlobHeap, StringHeap};
use crate::model::{
    FieldDefinition, MethodDefinition, ModuleIdentity, ModuleMetadata, PropertyDefinition,
    TypeDefinition, TypeHandle,
};
use crate::pe::PeImage;
use crate::root::parse_metadata_root;
use crate::tables::{Table, TableStream, column};

const TYPE_VISIBILITY_MASK: u32 = 0x07;
const TYPE_NESTED_PUBLIC: u32 = 0x02;

/// Reads declared entities out of the metadata of one PE image.
#[derive(Debug)]
pub struct MetadataReader<'data> {
    image: PeImage<'data>,
    runtime_version: &'data str,
    tables: TableStream<'data>,
    strings: StringHeap<'data>,
    blobs: BlobHeap<'data>,
    enclosing_type: HashMap<u32, u32>,
    nested_types: IndexMap<u32, Vec<u32>>,
    property_lists: HashMap<u32, Range<u32>>,
}

impl<'data> MetadataReader<'data> {
    pub(crate) fn parse(image: PeImage<'data>) -> Result<Self> {
        let root = parse_metadata_root(image.metadata())?;
        let tables = TableStream::parse(root.tables)?;
        let mut reader = Self {
            image,
            runtime_version: root.version,
            tables,
            strings: StringHeap::new(root.strings),
            blobs: BlobHeap::new(root.blobs),
            enclosing_type: HashMap::new(),
            nested_types: IndexMap::new(),
            property_lists: HashMap::new(),
        };
        reader.index_nested_classes()?;
        reader.index_property_maps()?;
        tracing::debug!(
            runtime_version = reader.runtime_version,
            types = reader.tables.row_count(Table::TypeDef),
            fields = reader.tables.row_count(Table::Field),
            methods = reader.tables.row_count(Table::MethodDef),
            properties = reader.tables.row_count(Table::Property),
            "parsed metadata tables"
        );
        Ok(reader)
    }

    pub fn runtime_version(&self) -> &'data str {
        self.runtime_version
    }

    fn index_nested_classes(&mut self) -> Result<()> {
        for row in 1..=self.tables.row_count(Table::NestedClass) {
            let nested = self
                .tables
                .cell(Table::NestedClass, row, column::NESTED_CLASS_NESTED)?;
            let enclosing =
                self.tables
                    .cell(Table::NestedClass, row, column::NESTED_CLASS_ENCLOSING)?;
            self.check_type_row(nested)?;
            self.check_type_row(enclosing)?;
            self.enclosing_type.insert(nested, enclosing);
            self.nested_types.entry(enclosing).or_default().push(nested);
        }
        Ok(())
    }

    fn index_property_maps(&mut self) -> Result<()> {
        let tables = &self.tables;
        let map_rows = tables.row_count(Table::PropertyMap);
        let list_end = self.list_end(Table::Property, Table::PropertyPtr);
        for row in 1..=map_rows {
            let parent = tables.cell(Table::PropertyMap, row, column::PROPERTY_MAP_PARENT)?;
            let start = tables.cell(Table::PropertyMap, row, column::PROPERTY_MAP_PROPERTY_LIST)?;
            let end = if row < map_rows {
                let next = row + 1;
                tables.cell(Table::PropertyMap, next, column::PROPERTY_MAP_PROPERTY_LIST)?
            } else {
                list_end
            };
            self.check_type_row(parent)?;
            let range = checked_list(Table::Property, start, end, list_end)?;
            if self.property_lists.insert(parent, range).is_some() {
                return Err(MetadataError::DuplicatePropertyMap(parent));
            }
        }
        Ok(())
    }

    fn check_type_row(&self, row: u32) -> Result<()> {
        if row == 0 || row > self.tables.row_count(Table::TypeDef) {
            return Err(MetadataError::BadRowIndex {
                table: Table::TypeDef.name(),
                row,
            });
        }
        Ok(())
    }

    /// One past the last valid list index into `table`, going through its
    /// pointer table when the stream is uncompressed.
    fn list_end(&self, table: Table, pointer_table: Table) -> u32 {
        let pointer_rows = self.tables.row_count(pointer_table);
        if pointer_rows > 0 {
            pointer_rows + 1
        } else {
            self.tables.row_count(table) + 1
        }
    }

    fn resolve_list_entry(&self, pointer_table: Table, index: u32) -> Result<u32> {
        if self.tables.row_count(pointer_table) == 0 {
            return Ok(index);
        }
        self.tables
            .cell(pointer_table, index, column::POINTER_TARGET)
    }

    /// The run of `member_table` rows owned by `owner_row` of `owner_table`,
    /// following the ECMA-335 list convention.
    fn member_rows(
        &self,
        owner_table: Table,
        owner_row: u32,
        list_column: usize,
        member_table: Table,
        pointer_table: Table,
    ) -> Result<Vec<u32>> {
        let list_end = self.list_end(member_table, pointer_table);
        let start = self.tables.cell(owner_table, owner_row, list_column)?;
        let end = if owner_row < self.tables.row_count(owner_table) {
            self.tables.cell(owner_table, owner_row + 1, list_column)?
        } else {
            list_end
        };
        checked_list(member_table, start, end, list_end)?
            .map(|index| self.resolve_list_entry(pointer_table, index))
            .collect()
    }

    fn string(&self, table: Table, row: u32, column: usize) -> Result<&'data str> {
        let index = self.tables.cell(table, row, column)?;
        self.strings.get(index)
    }

    fn blob_len(&self, table: Table, row: u32, column: usize) -> Result<usize> {
        let index = self.tables.cell(table, row, column)?;
        self.blobs.len_at(index)
    }

    fn method_definition(&self, row: u32) -> Result<MethodDefinition> {
        let name = self.string(Table::MethodDef, row, column::METHOD_NAME)?;
        let signature_len = self.blob_len(Table::MethodDef, row, column::METHOD_SIGNATURE)?;
        let parameter_names = self
            .member_rows(
                Table::MethodDef,
                row,
                column::METHOD_PARAM_LIST,
                Table::Param,
                Table::ParamPtr,
            )?
            .into_iter()
            .map(|param_row| {
                self.string(Table::Param, param_row, column::PARAM_NAME)
                    .map(str::to_string)
            })
            .collect::<Result<Vec<_>>>()?;

        let rva = self
            .tables
            .cell(Table::MethodDef, row, column::METHOD_RVA)?;
        let body_len = if rva == 0 {
            None
        } else {
            let body = self.image.data_at(rva)?;
            Some(method_body_len(body).ok_or(MetadataError::BadMethodBody(rva))?)
        };

        Ok(MethodDefinition {
            name: name.to_string(),
            signature_len,
            parameter_names,
            body_len,
        })
    }
}

fn checked_list(table: Table, start: u32, end: u32, list_end: u32) -> Result<Range<u32>> {
    if start == 0 || start > list_end {
        return Err(MetadataError::BadRowIndex {
            table: table.name(),
            row: start,
        });
    }
    if end < start || end > list_end {
        return Err(MetadataError::BadRowIndex {
            table: table.name(),
            row: end,
        });
    }
    Ok(start..end)
}

impl ModuleMetadata for MetadataReader<'_> {
    fn identity(&self) -> Result<ModuleIdentity> {
        if self.tables.row_count(Table::Assembly) > 0 {
            let name = self.string(Table::Assembly, 1, column::ASSEMBLY_NAME)?;
            return Ok(ModuleIdentity::Assembly(name.to_string()));
        }
        let name = self.string(Table::Module, 1, column::MODULE_NAME)?;
        Ok(ModuleIdentity::NetModule(name.to_string()))
    }

    fn type_definitions(&self) -> Result<Vec<TypeDefinition>> {
        (1..=self.tables.row_count(Table::TypeDef))
            .map(|row| {
                let flags = self
                    .tables
                    .cell(Table::TypeDef, row, column::TYPE_DEF_FLAGS)?;
                let name = self.string(Table::TypeDef, row, column::TYPE_DEF_NAME)?;
                let namespace = self.string(Table::TypeDef, row, column::TYPE_DEF_NAMESPACE)?;
                Ok(TypeDefinition {
                    handle: TypeHandle(row),
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                    declaring_type: self.enclosing_type.get(&row).copied().map(TypeHandle),
                    is_nested: flags & TYPE_VISIBILITY_MASK >= TYPE_NESTED_PUBLIC,
                })
            })
            .collect()
    }

    fn fields(&self, owner: TypeHandle) -> Result<Vec<FieldDefinition>> {
        self.member_rows(
            Table::TypeDef,
            owner.0,
            column::TYPE_DEF_FIELD_LIST,
            Table::Field,
            Table::FieldPtr,
        )?
        .into_iter()
        .map(|row| {
            Ok(FieldDefinition {
                name: self
                    .string(Table::Field, row, column::FIELD_NAME)?
                    .to_string(),
                signature_len: self.blob_len(Table::Field, row, column::FIELD_SIGNATURE)?,
            })
        })
        .collect()
    }

    fn methods(&self, owner: TypeHandle) -> Result<Vec<MethodDefinition>> {
        self.member_rows(
            Table::TypeDef,
            owner.0,
            column::TYPE_DEF_METHOD_LIST,
            Table::MethodDef,
            Table::MethodPtr,
        )?
        .into_iter()
        .map(|row| self.method_definition(row))
        .collect()
    }

    fn properties(&self, owner: TypeHandle) -> Result<Vec<PropertyDefinition>> {
        self.check_type_row(owner.0)?;
        let Some(range) = self.property_lists.get(&owner.0) else {
            return Ok(Vec::new());
        };
        range
            .clone()
            .map(|index| {
                let row = self.resolve_list_entry(Table::PropertyPtr, index)?;
                Ok(PropertyDefinition {
                    name: self
                        .string(Table::Property, row, column::PROPERTY_NAME)?
                        .to_string(),
                    signature_len: self.blob_len(
                        Table::Property,
                        row,
                        column::PROPERTY_SIGNATURE,
                    )?,
                })
            })
            .collect()
    }

    fn nested_types(&self, owner: TypeHandle) -> Result<Vec<TypeHandle>> {
        self.check_type_row(owner.0)?;
        Ok(self
            .nested_types
            .get(&owner.0)
            .map(|rows| rows.iter().copied().map(TypeHandle).collect())
            .unwrap_or_default())
    }
}
