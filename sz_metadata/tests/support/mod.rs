//! Synthesizes minimal PE32 and PE32+ images carrying CLI metadata, so the reader can be
//! exercised without checking compiled assemblies into the repository.

#![allow(dead_code)]

const SECTION_RVA: u32 = 0x2000;
const FILE_ALIGNMENT: usize = 0x200;
const CLI_HEADER_SIZE: usize = 72;

const TABLE_MODULE: u8 = 0x00;
const TABLE_TYPE_DEF: u8 = 0x02;
const TABLE_FIELD_PTR: u8 = 0x03;
const TABLE_FIELD: u8 = 0x04;
const TABLE_METHOD_PTR: u8 = 0x05;
const TABLE_METHOD_DEF: u8 = 0x06;
const TABLE_PARAM_PTR: u8 = 0x07;
const TABLE_PARAM: u8 = 0x08;
const TABLE_PROPERTY_MAP: u8 = 0x15;
const TABLE_PROPERTY_PTR: u8 = 0x16;
const TABLE_PROPERTY: u8 = 0x17;
const TABLE_ASSEMBLY: u8 = 0x20;
const TABLE_NESTED_CLASS: u8 = 0x29;

#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    pub name: String,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct MethodSpec {
    pub name: String,
    pub signature: Vec<u8>,
    pub params: Vec<String>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct PropertySpec {
    pub name: String,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeSpec {
    pub name: String,
    pub namespace: String,
    pub flags: u32,
    pub fields: Vec<FieldSpec>,
    pub methods: Vec<MethodSpec>,
    pub properties: Vec<PropertySpec>,
    /// Zero-based index of the enclosing type in `ImageSpec::types`.
    pub enclosing: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ImageSpec {
    pub module_name: String,
    pub assembly_name: Option<String>,
    pub types: Vec<TypeSpec>,
    pub managed: bool,
    /// Emit a PE32+ optional header instead of PE32.
    pub pe64: bool,
    /// Name the table stream `#-` and set the extra-data heap flag.
    pub uncompressed: bool,
    /// Store Field, MethodDef, Param and Property rows in reverse physical
    /// order behind FieldPtr, MethodPtr, ParamPtr and PropertyPtr tables.
    pub pointer_tables: bool,
    /// Replaces the generated PropertyMap rows with `(parent, property_list)` pairs.
    pub property_map_rows: Option<Vec<(u16, u16)>>,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            module_name: "Demo.dll".to_string(),
            assembly_name: Some("Demo".to_string()),
            types: vec![TypeSpec {
                name: "<Module>".to_string(),
                ..TypeSpec::default()
            }],
            managed: true,
            pe64: false,
            uncompressed: false,
            pointer_tables: false,
            property_map_rows: None,
        }
    }
}

pub fn field(name: &str, signature: &[u8]) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        signature: signature.to_vec(),
    }
}

pub fn property(name: &str, signature: &[u8]) -> PropertySpec {
    PropertySpec {
        name: name.to_string(),
        signature: signature.to_vec(),
    }
}

pub fn method(name: &str, signature: &[u8], params: &[&str], body: Option<Vec<u8>>) -> MethodSpec {
    MethodSpec {
        name: name.to_string(),
        signature: signature.to_vec(),
        params: params.iter().map(|param| param.to_string()).collect(),
        body,
    }
}

pub fn tiny_body(il: &[u8]) -> Vec<u8> {
    assert!(il.len() < 64);
    let mut body = vec![((il.len() as u8) << 2) | 0x02];
    body.extend_from_slice(il);
    body
}

#[derive(Default)]
struct Heap {
    bytes: Vec<u8>,
}

impl Heap {
    fn new() -> Self {
        Self { bytes: vec![0] }
    }

    fn string(&mut self, text: &str) -> u16 {
        if text.is_empty() {
            return 0;
        }
        let offset = self.bytes.len() as u16;
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(0);
        offset
    }

    fn blob(&mut self, data: &[u8]) -> u16 {
        assert!(data.len() < 0x80);
        let offset = self.bytes.len() as u16;
        self.bytes.push(data.len() as u8);
        self.bytes.extend_from_slice(data);
        offset
    }

    fn padded(mut self) -> Vec<u8> {
        pad_to(&mut self.bytes, 4);
        self.bytes
    }
}

#[derive(Default)]
struct TableRows {
    rows: Vec<Vec<u8>>,
}

impl TableRows {
    fn row(&mut self) -> &mut Vec<u8> {
        self.rows.push(Vec::new());
        self.rows.last_mut().expect("row was just pushed")
    }

    fn len(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Splits into `(pointer table, physical table)`. Physical rows are stored
    /// back to front; the pointer table maps each logical index to its row.
    fn behind_pointers(self, enabled: bool) -> (TableRows, TableRows) {
        if !enabled {
            return (TableRows::default(), self);
        }
        let count = self.len();
        let mut pointers = TableRows::default();
        for logical in 1..=count {
            push_u16(pointers.row(), (count - logical + 1) as u16);
        }
        let mut rows = self.rows;
        rows.reverse();
        (pointers, TableRows { rows })
    }
}

pub fn build_image(spec: &ImageSpec) -> Vec<u8> {
    let mut text = vec![0u8; CLI_HEADER_SIZE];
    let mut strings = Heap::new();
    let mut blobs = Heap::new();

    let mut module = TableRows::default();
    let mut type_defs = TableRows::default();
    let mut fields = TableRows::default();
    let mut methods = TableRows::default();
    let mut params = TableRows::default();
    let mut property_map = TableRows::default();
    let mut properties = TableRows::default();
    let mut assembly = TableRows::default();
    let mut nested_classes = TableRows::default();

    let row = module.row();
    push_u16(row, 0);
    push_u16(row, strings.string(&spec.module_name));
    push_u16(row, 0);
    push_u16(row, 0);
    push_u16(row, 0);

    for (type_index, type_spec) in spec.types.iter().enumerate() {
        let type_row = type_index as u16 + 1;
        let row = type_defs.row();
        push_u32(row, type_spec.flags);
        push_u16(row, strings.string(&type_spec.name));
        push_u16(row, strings.string(&type_spec.namespace));
        push_u16(row, 0);
        push_u16(row, fields.len() as u16 + 1);
        push_u16(row, methods.len() as u16 + 1);

        for field_spec in &type_spec.fields {
            let name = strings.string(&field_spec.name);
            let signature = blobs.blob(&field_spec.signature);
            let row = fields.row();
            push_u16(row, 0x0006);
            push_u16(row, name);
            push_u16(row, signature);
        }

        for method_spec in &type_spec.methods {
            let rva = match &method_spec.body {
                Some(body) => {
                    pad_to(&mut text, 4);
                    let rva = SECTION_RVA + text.len() as u32;
                    text.extend_from_slice(body);
                    rva
                }
                None => 0,
            };
            let name = strings.string(&method_spec.name);
            let signature = blobs.blob(&method_spec.signature);
            let param_list = params.len() as u16 + 1;
            let row = methods.row();
            push_u32(row, rva);
            push_u16(row, 0);
            push_u16(row, 0x0006);
            push_u16(row, name);
            push_u16(row, signature);
            push_u16(row, param_list);

            for (sequence, param_name) in method_spec.params.iter().enumerate() {
                let name = strings.string(param_name);
                let row = params.row();
                push_u16(row, 0);
                push_u16(row, sequence as u16 + 1);
                push_u16(row, name);
            }
        }

        if !type_spec.properties.is_empty() {
            let row = property_map.row();
            push_u16(row, type_row);
            push_u16(row, properties.len() as u16 + 1);
            for property_spec in &type_spec.properties {
                let name = strings.string(&property_spec.name);
                let signature = blobs.blob(&property_spec.signature);
                let row = properties.row();
                push_u16(row, 0);
                push_u16(row, name);
                push_u16(row, signature);
            }
        }

        if let Some(enclosing) = type_spec.enclosing {
            let row = nested_classes.row();
            push_u16(row, type_row);
            push_u16(row, enclosing as u16 + 1);
        }
    }

    if let Some(assembly_name) = &spec.assembly_name {
        let name = strings.string(assembly_name);
        let row = assembly.row();
        push_u32(row, 0x8004);
        push_u16(row, 1);
        push_u16(row, 0);
        push_u16(row, 0);
        push_u16(row, 0);
        push_u32(row, 0);
        push_u16(row, 0);
        push_u16(row, name);
        push_u16(row, 0);
    }

    if let Some(overrides) = &spec.property_map_rows {
        property_map = TableRows::default();
        for (parent, property_list) in overrides {
            let row = property_map.row();
            push_u16(row, *parent);
            push_u16(row, *property_list);
        }
    }

    let (field_ptrs, fields) = fields.behind_pointers(spec.pointer_tables);
    let (method_ptrs, methods) = methods.behind_pointers(spec.pointer_tables);
    let (param_ptrs, params) = params.behind_pointers(spec.pointer_tables);
    let (property_ptrs, properties) = properties.behind_pointers(spec.pointer_tables);

    // Ascending table id, as the stream requires.
    let tables = [
        (TABLE_MODULE, module),
        (TABLE_TYPE_DEF, type_defs),
        (TABLE_FIELD_PTR, field_ptrs),
        (TABLE_FIELD, fields),
        (TABLE_METHOD_PTR, method_ptrs),
        (TABLE_METHOD_DEF, methods),
        (TABLE_PARAM_PTR, param_ptrs),
        (TABLE_PARAM, params),
        (TABLE_PROPERTY_MAP, property_map),
        (TABLE_PROPERTY_PTR, property_ptrs),
        (TABLE_PROPERTY, properties),
        (TABLE_ASSEMBLY, assembly),
        (TABLE_NESTED_CLASS, nested_classes),
    ];
    let table_stream = encode_table_stream(&tables, spec.uncompressed);
    let table_stream_name = if spec.uncompressed { "#-" } else { "#~" };
    let metadata = encode_metadata_root(&[
        (table_stream_name, table_stream),
        ("#Strings", strings.padded()),
        ("#Blob", blobs.padded()),
    ]);

    pad_to(&mut text, 4);
    let metadata_rva = SECTION_RVA + text.len() as u32;
    let metadata_size = metadata.len() as u32;
    text.extend_from_slice(&metadata);

    put_u32(&mut text, 0, CLI_HEADER_SIZE as u32);
    put_u16(&mut text, 4, 2);
    put_u16(&mut text, 6, 5);
    put_u32(&mut text, 8, metadata_rva);
    put_u32(&mut text, 12, metadata_size);
    put_u32(&mut text, 16, 1);

    pad_to(&mut text, FILE_ALIGNMENT);
    wrap_in_pe(&text, spec.managed, spec.pe64)
}

fn encode_table_stream(tables: &[(u8, TableRows)], extra_data: bool) -> Vec<u8> {
    let present = tables
        .iter()
        .filter(|(_, rows)| rows.len() > 0)
        .collect::<Vec<_>>();
    let valid = present
        .iter()
        .fold(0u64, |bits, (table, _)| bits | (1u64 << table));

    let heap_flags = if extra_data { 0x40 } else { 0x00 };
    let mut stream = vec![0, 0, 0, 0, 2, 0, heap_flags, 1];
    stream.extend_from_slice(&valid.to_le_bytes());
    stream.extend_from_slice(&0u64.to_le_bytes());
    for (_, rows) in &present {
        push_u32(&mut stream, rows.len());
    }
    if extra_data {
        push_u32(&mut stream, 0);
    }
    for (_, rows) in &present {
        for row in &rows.rows {
            stream.extend_from_slice(row);
        }
    }
    pad_to(&mut stream, 4);
    stream
}

fn encode_metadata_root(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let version = b"v4.0.30319\0\0";
    let header_len = 16 + version.len() + 4;
    let stream_headers_len = streams
        .iter()
        .map(|(name, _)| 8 + (name.len() + 1).next_multiple_of(4))
        .sum::<usize>();

    let mut root = Vec::new();
    push_u32(&mut root, 0x424A_5342);
    push_u16(&mut root, 1);
    push_u16(&mut root, 1);
    push_u32(&mut root, 0);
    push_u32(&mut root, version.len() as u32);
    root.extend_from_slice(version);
    push_u16(&mut root, 0);
    push_u16(&mut root, streams.len() as u16);

    let mut offset = header_len + stream_headers_len;
    for (name, data) in streams {
        push_u32(&mut root, offset as u32);
        push_u32(&mut root, data.len() as u32);
        root.extend_from_slice(name.as_bytes());
        root.push(0);
        pad_to(&mut root, 4);
        offset += data.len();
    }
    for (_, data) in streams {
        root.extend_from_slice(data);
    }
    root
}

/// Optional-header offsets that differ between PE32 and PE32+.
struct OptionalHeaderLayout {
    magic: u16,
    machine: u16,
    size: u16,
    /// Stack and heap reserve/commit sizes are u64 in PE32+.
    wide_sizes: bool,
    rva_count: usize,
}

const PE32_LAYOUT: OptionalHeaderLayout = OptionalHeaderLayout {
    magic: 0x010B,
    machine: 0x014C,
    size: 224,
    wide_sizes: false,
    rva_count: 0xF4,
};

const PE64_LAYOUT: OptionalHeaderLayout = OptionalHeaderLayout {
    magic: 0x020B,
    machine: 0x8664,
    size: 240,
    wide_sizes: true,
    rva_count: 0x104,
};

fn wrap_in_pe(text: &[u8], managed: bool, pe64: bool) -> Vec<u8> {
    let layout = if pe64 { &PE64_LAYOUT } else { &PE32_LAYOUT };
    let optional_header = 0x98;
    let data_directories = layout.rva_count + 4;
    let section = optional_header + layout.size as usize;

    let mut image = vec![0u8; FILE_ALIGNMENT];
    image[0] = b'M';
    image[1] = b'Z';
    put_u32(&mut image, 0x3C, 0x80);

    image[0x80..0x84].copy_from_slice(b"PE\0\0");
    put_u16(&mut image, 0x84, layout.machine);
    put_u16(&mut image, 0x86, 1);
    put_u16(&mut image, 0x94, layout.size);
    put_u16(&mut image, 0x96, 0x2102);

    put_u16(&mut image, optional_header, layout.magic);
    put_u32(&mut image, 0x9C, text.len() as u32);
    put_u32(&mut image, 0xAC, SECTION_RVA);
    if pe64 {
        put_u32(&mut image, 0xB0, 0x0040_0000);
    } else {
        put_u32(&mut image, 0xB0, SECTION_RVA);
        put_u32(&mut image, 0xB4, 0x0040_0000);
    }
    put_u32(&mut image, 0xB8, SECTION_RVA);
    put_u32(&mut image, 0xBC, FILE_ALIGNMENT as u32);
    put_u16(&mut image, 0xC0, 4);
    put_u16(&mut image, 0xC8, 4);
    let size_of_image = SECTION_RVA as usize + text.len().next_multiple_of(SECTION_RVA as usize);
    put_u32(&mut image, 0xD0, size_of_image as u32);
    put_u32(&mut image, 0xD4, FILE_ALIGNMENT as u32);
    put_u16(&mut image, 0xDC, 3);
    put_u16(&mut image, 0xDE, 0x8540);
    let size_width = if layout.wide_sizes { 8 } else { 4 };
    let stack_and_heap = [0x0010_0000u32, 0x1000, 0x0010_0000, 0x1000];
    for (slot, value) in stack_and_heap.into_iter().enumerate() {
        put_u32(&mut image, 0xE0 + slot * size_width, value);
    }
    put_u32(&mut image, layout.rva_count, 16);

    if managed {
        let com_descriptor = data_directories + 14 * 8;
        put_u32(&mut image, com_descriptor, SECTION_RVA);
        put_u32(&mut image, com_descriptor + 4, CLI_HEADER_SIZE as u32);
    }

    image[section..section + 5].copy_from_slice(b".text");
    put_u32(&mut image, section + 8, text.len() as u32);
    put_u32(&mut image, section + 12, SECTION_RVA);
    put_u32(&mut image, section + 16, text.len() as u32);
    put_u32(&mut image, section + 20, FILE_ALIGNMENT as u32);
    put_u32(&mut image, section + 36, 0x6000_0020);

    image.extend_from_slice(text);
    image
}

fn pad_to(bytes: &mut Vec<u8>, alignment: usize) {
    let padded = bytes.len().next_multiple_of(alignment);
    bytes.resize(padded, 0);
}

fn push_u16(bytes: &mut Vec<u8>, value: u16) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn put_u16(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
