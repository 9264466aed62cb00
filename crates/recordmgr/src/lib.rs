//! Record manager: fixed-schema tables laid out as slotted pages over a
//! [`buffer::BufferPool`].
//!
//! Page 0 of a table file is the catalog header (tuple count, free-page
//! pointer, schema); pages 1.. hold fixed-size records at a stride of
//! `Schema::record_size()`. A record's leading byte is a tombstone:
//! `'+'` live, `'-'` deleted, anything else (a fresh zeroed page) free.
//! `findFreeSlot`'s "anything but '+' is free" rule is preserved exactly
//! since it's what lets a deleted slot be reused by a later insert
//! without a separate free list.
//!
//! Every operation here drives the buffer pool rather than the storage
//! layer directly, matching the data flow recordmgr → buffer → storage.


use buffer::{BufferPool, ReplacementStrategy};
use common::{DbError, DbResult, Rid, Row};
use std::path::{Path, PathBuf};
use storage::{PAGE_SIZE, PagedFile};
use types::{SqlType, Value};

/// Fixed width of an on-disk attribute name, NUL-padded.
pub const ATTRIBUTE_SIZE: usize = 15;

/// Live-record tombstone marker.
pub const TOMBSTONE_LIVE: u8 = b'+';
/// Deleted-record tombstone marker (slot is free to reuse).
pub const TOMBSTONE_DEAD: u8 = b'-';

/// Number of frames a table's buffer pool is opened with (both
/// `createTable` and `openTable` fix this at the same size).
const TABLE_BUFFER_POOL_PAGES: usize = 100;

/// Attribute data type, carrying its own fixed width for `String` rather
/// than a parallel `typeLength` array, since Rust enums can hold data,
/// unlike the legacy C `DataType` + `typeLength[]` pair. The on-disk catalog
/// still writes the type tag and length as two separate 4-byte fields,
/// so this is purely an in-memory simplification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Bool,
    String(u16),
}

impl DataType {
    pub fn width(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Float => 4,
            DataType::Bool => 1,
            DataType::String(len) => *len as usize,
        }
    }

    pub fn sql_type(&self) -> SqlType {
        match self {
            DataType::Int => SqlType::Int,
            DataType::Float => SqlType::Float,
            DataType::Bool => SqlType::Bool,
            DataType::String(_) => SqlType::String,
        }
    }

    fn code(&self) -> i32 {
        match self {
            DataType::Int => 0,
            DataType::Float => 1,
            DataType::Bool => 2,
            DataType::String(_) => 3,
        }
    }

    fn from_code(code: i32, len: i32) -> DbResult<Self> {
        match code {
            0 => Ok(DataType::Int),
            1 => Ok(DataType::Float),
            2 => Ok(DataType::Bool),
            3 => Ok(DataType::String(len.max(0) as u16)),
            other => Err(DbError::Catalog(format!("unknown data type code {other}"))),
        }
    }
}

/// A single named attribute within a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn width(&self) -> usize {
        self.data_type.width()
    }
}

/// A table's fixed schema: attribute list plus key-attribute metadata.
///
/// The on-disk page-0 layout only persists `keySize`, not the actual
/// key-attribute ordinals, a legacy catalog peculiarity preserved here
/// rather than silently "fixed". On reopen, `key_indices` is
/// reconstructed as the first `key_size` attributes; see DESIGN.md for
/// this tradeoff's rationale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    pub attrs: Vec<Attribute>,
    pub key_size: usize,
    pub key_indices: Vec<usize>,
}

impl Schema {
    pub fn new(attrs: Vec<Attribute>, key_indices: Vec<usize>) -> Self {
        let key_size = key_indices.len();
        Self {
            attrs,
            key_size,
            key_indices,
        }
    }

    /// `1 + Σ attrWidth(i)`, byte 0 is the tombstone marker.
    pub fn record_size(&self) -> usize {
        1 + self.attrs.iter().map(Attribute::width).sum::<usize>()
    }

    /// `1 + Σ` widths of attributes preceding `idx`.
    pub fn attr_offset(&self, idx: usize) -> DbResult<usize> {
        if idx >= self.attrs.len() {
            return Err(DbError::RecordMgr(format!("INVALID_ATTRIBUTE_NUM: {idx}")));
        }
        Ok(1 + self.attrs[..idx].iter().map(Attribute::width).sum::<usize>())
    }
}

/// A fixed-size record buffer: byte 0 is the tombstone, the remainder is
/// the attribute payload in schema order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub data: Vec<u8>,
    pub id: Option<Rid>,
}

impl Record {
    /// A fresh record, tombstone byte `'-'` and zeroed payload, matching
    /// the legacy `createRecord`'s `"-\0..."` initialization.
    pub fn new(schema: &Schema) -> Self {
        let mut data = vec![0u8; schema.record_size()];
        data[0] = TOMBSTONE_DEAD;
        Self { data, id: None }
    }

    pub fn get_attr(&self, schema: &Schema, idx: usize) -> DbResult<Value> {
        let attr = schema
            .attrs
            .get(idx)
            .ok_or_else(|| DbError::RecordMgr(format!("INVALID_ATTRIBUTE_NUM: {idx}")))?;
        let offset = schema.attr_offset(idx)?;
        let width = attr.width();
        let bytes = &self.data[offset..offset + width];
        Ok(match attr.data_type {
            DataType::Int => Value::Int(i32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Float => Value::Float(f32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Bool => Value::Bool(bytes[0] != 0),
            DataType::String(_) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Value::Text(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
        })
    }

    pub fn set_attr(&mut self, schema: &Schema, idx: usize, value: &Value) -> DbResult<()> {
        let attr = schema
            .attrs
            .get(idx)
            .ok_or_else(|| DbError::RecordMgr(format!("INVALID_ATTRIBUTE_NUM: {idx}")))?;
        if value.sql_type() != Some(attr.data_type.sql_type()) {
            return Err(DbError::RecordMgr(format!(
                "DATATYPE_MISMATCH: attribute {idx} expects {:?}, got {value:?}",
                attr.data_type.sql_type()
            )));
        }
        let offset = schema.attr_offset(idx)?;
        let width = attr.width();
        let slice = &mut self.data[offset..offset + width];
        match (value, attr.data_type) {
            (Value::Int(v), DataType::Int) => slice.copy_from_slice(&v.to_le_bytes()),
            (Value::Float(v), DataType::Float) => slice.copy_from_slice(&v.to_le_bytes()),
            (Value::Bool(v), DataType::Bool) => slice[0] = *v as u8,
            (Value::Text(s), DataType::String(len)) => {
                let bytes = s.as_bytes();
                let n = bytes.len().min(len as usize);
                slice[..n].copy_from_slice(&bytes[..n]);
                slice[n..].fill(0);
            }
            _ => unreachable!("sql_type check above guarantees a matching variant"),
        }
        Ok(())
    }
}

fn record_to_row(schema: &Schema, record: &Record) -> DbResult<Row> {
    let values = (0..schema.attrs.len())
        .map(|i| record.get_attr(schema, i))
        .collect::<DbResult<Vec<_>>>()?;
    Ok(Row::new(values))
}

fn encode_header(buf: &mut [u8; PAGE_SIZE], schema: &Schema, tuples: i32, free_page: i32) {
    buf.fill(0);
    buf[0..4].copy_from_slice(&tuples.to_le_bytes());
    buf[4..8].copy_from_slice(&free_page.to_le_bytes());
    buf[8..12].copy_from_slice(&(schema.attrs.len() as i32).to_le_bytes());
    buf[12..16].copy_from_slice(&(schema.key_size as i32).to_le_bytes());

    let mut offset = 16;
    for attr in &schema.attrs {
        let name_bytes = attr.name.as_bytes();
        let n = name_bytes.len().min(ATTRIBUTE_SIZE);
        buf[offset..offset + n].copy_from_slice(&name_bytes[..n]);
        offset += ATTRIBUTE_SIZE;

        buf[offset..offset + 4].copy_from_slice(&attr.data_type.code().to_le_bytes());
        offset += 4;

        let len = match attr.data_type {
            DataType::String(l) => l as i32,
            _ => 0,
        };
        buf[offset..offset + 4].copy_from_slice(&len.to_le_bytes());
        offset += 4;
    }
}

fn decode_header(buf: &[u8; PAGE_SIZE]) -> DbResult<(Schema, i32, i32)> {
    let tuples = i32::from_le_bytes(buf[0..4].try_into().unwrap());
    let free_page = i32::from_le_bytes(buf[4..8].try_into().unwrap());
    let num_attr = i32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;
    let key_size = i32::from_le_bytes(buf[12..16].try_into().unwrap()) as usize;

    let mut offset = 16;
    let mut attrs = Vec::with_capacity(num_attr);
    for _ in 0..num_attr {
        let name_bytes = &buf[offset..offset + ATTRIBUTE_SIZE];
        let end = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(ATTRIBUTE_SIZE);
        let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();
        offset += ATTRIBUTE_SIZE;

        let code = i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let len = i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
        offset += 4;

        attrs.push(Attribute::new(name, DataType::from_code(code, len)?));
    }

    let key_indices: Vec<usize> = (0..key_size).collect();
    Ok((Schema::new(attrs, key_indices), tuples, free_page))
}

fn find_free_slot(page: &[u8; PAGE_SIZE], record_size: usize) -> Option<usize> {
    let slots = PAGE_SIZE / record_size;
    (0..slots).find(|&slot| page[slot * record_size] != TOMBSTONE_LIVE)
}

/// An open table: schema, tuple/free-page bookkeeping, and the buffer
/// pool its records are read and written through.
pub struct Table {
    name: PathBuf,
    pool: BufferPool,
    schema: Schema,
    num_tuples: i32,
    free_page: i32,
    record_size: usize,
}

impl Table {
    /// Creates the paged file and writes the catalog header, using a
    /// throwaway buffer pool purely to exercise the normal pin path
    /// rather than poking the storage layer directly.
    pub fn create(name: impl AsRef<Path>, schema: Schema) -> DbResult<()> {
        let name = name.as_ref();
        PagedFile::create(name)?;
        let mut pool = BufferPool::init(name, TABLE_BUFFER_POOL_PAGES, ReplacementStrategy::Lru)?;
        let handle = pool.pin_page(0)?;
        encode_header(pool.frame_data_mut(&handle)?, &schema, 0, 1);
        pool.mark_dirty(&handle)?;
        pool.unpin_page(&handle)?;
        pool.shutdown()?;
        Ok(())
    }

    /// Opens a table, decoding the catalog header into an in-memory
    /// schema and attaching a fresh buffer pool for subsequent access.
    pub fn open(name: impl AsRef<Path>) -> DbResult<Table> {
        let name = name.as_ref().to_path_buf();
        let mut pool = BufferPool::init(&name, TABLE_BUFFER_POOL_PAGES, ReplacementStrategy::Lru)?;
        let handle = pool.pin_page(0)?;
        let (schema, num_tuples, free_page) = decode_header(pool.frame_data(&handle)?)?;
        pool.unpin_page(&handle)?;
        pool.force_page(&handle)?;

        let record_size = schema.record_size();
        Ok(Table {
            name,
            pool,
            schema,
            num_tuples,
            free_page,
            record_size,
        })
    }

    /// Shuts down the table's buffer pool, flushing any dirty pages.
    pub fn close(self) -> DbResult<()> {
        self.pool.shutdown()
    }

    pub fn delete(name: impl AsRef<Path>) -> DbResult<()> {
        PagedFile::destroy(name)
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_num_tuples(&self) -> i32 {
        self.num_tuples
    }

    fn sync_header(&mut self) -> DbResult<()> {
        let handle = self.pool.pin_page(0)?;
        let buf = self.pool.frame_data_mut(&handle)?;
        buf[0..4].copy_from_slice(&self.num_tuples.to_le_bytes());
        buf[4..8].copy_from_slice(&self.free_page.to_le_bytes());
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin_page(&handle)?;
        Ok(())
    }

    /// Scans forward from the table's free-page pointer for the first
    /// page with a free slot, growing the file one page at a time via
    /// the buffer pool's own `ensure_capacity` call on a miss.
    pub fn insert_record(&mut self, record: &mut Record) -> DbResult<Rid> {
        let mut page = self.free_page;
        let slot;
        loop {
            let handle = self.pool.pin_page(page)?;
            let found = find_free_slot(self.pool.frame_data(&handle)?, self.record_size);
            match found {
                Some(s) => {
                    slot = s;
                    let offset = s * self.record_size;
                    let buf = self.pool.frame_data_mut(&handle)?;
                    buf[offset] = TOMBSTONE_LIVE;
                    buf[offset + 1..offset + self.record_size]
                        .copy_from_slice(&record.data[1..self.record_size]);
                    self.pool.mark_dirty(&handle)?;
                    self.pool.unpin_page(&handle)?;
                    break;
                }
                None => {
                    self.pool.unpin_page(&handle)?;
                    page += 1;
                }
            }
        }

        self.num_tuples += 1;
        self.free_page = page;
        let rid = Rid::new(page, slot as i32);
        record.id = Some(rid);
        self.sync_header()?;
        Ok(rid)
    }

    /// Tombstones the slot at `rid` and repoints `free_page` at it; only
    /// decrements `num_tuples` when the slot was live.
    pub fn delete_record(&mut self, rid: Rid) -> DbResult<()> {
        let handle = self.pool.pin_page(rid.page)?;
        let offset = rid.slot as usize * self.record_size;
        let buf = self.pool.frame_data_mut(&handle)?;
        let was_live = buf[offset] == TOMBSTONE_LIVE;
        buf[offset] = TOMBSTONE_DEAD;
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin_page(&handle)?;

        if was_live {
            self.num_tuples -= 1;
        }
        self.free_page = rid.page;
        self.sync_header()
    }

    pub fn update_record(&mut self, record: &Record) -> DbResult<()> {
        let rid = record
            .id
            .ok_or_else(|| DbError::RecordMgr("RM_NULL_ARGUMENT: record has no RID".into()))?;
        let handle = self.pool.pin_page(rid.page)?;
        let offset = rid.slot as usize * self.record_size;
        let buf = self.pool.frame_data_mut(&handle)?;
        buf[offset] = TOMBSTONE_LIVE;
        buf[offset + 1..offset + self.record_size].copy_from_slice(&record.data[1..self.record_size]);
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin_page(&handle)
    }

    pub fn get_record(&mut self, rid: Rid) -> DbResult<Record> {
        let handle = self.pool.pin_page(rid.page)?;
        let offset = rid.slot as usize * self.record_size;
        let data = self.pool.frame_data(&handle)?;

        if data[offset] != TOMBSTONE_LIVE {
            self.pool.unpin_page(&handle)?;
            return Err(DbError::RecordMgr("RM_NO_TUPLE_WITH_GIVEN_RID".into()));
        }

        let mut buf = vec![0u8; self.record_size];
        buf[0] = TOMBSTONE_LIVE;
        buf[1..].copy_from_slice(&data[offset + 1..offset + self.record_size]);
        self.pool.unpin_page(&handle)?;

        Ok(Record {
            data: buf,
            id: Some(rid),
        })
    }

    /// Starts a predicate-driven sequential scan from page 1, slot 0.
    pub fn start_scan(&mut self, cond: expr::Expr) -> Scan<'_> {
        Scan {
            table: self,
            expr: cond,
            rid: Rid::new(1, 0),
            scan_count: 0,
            started: false,
        }
    }
}

/// A sequential scan positioned by `{page, slot}`, driving `expr::eval`
/// over each live candidate row.
///
/// `start_scan` takes `Expr` by value rather than `Option<Expr>`, so the
/// legacy `SCAN_CONDITION_NOT_FOUND` failure mode (a null predicate) is
/// unrepresentable at this API boundary. Rust's type system absorbs
/// that check instead of performing it at runtime.
pub struct Scan<'a> {
    table: &'a mut Table,
    expr: expr::Expr,
    rid: Rid,
    scan_count: i64,
    started: bool,
}

impl Scan<'_> {
    /// Advances to the next row satisfying the predicate.
    ///
    /// Tombstoned slots are skipped without counting against the
    /// tuple-count budget (a strict improvement over the legacy
    /// behavior, which relied on deleted rows' garbage bytes happening
    /// to evaluate falsy).
    pub fn next(&mut self) -> DbResult<Record> {
        let slots_per_page = PAGE_SIZE / self.table.record_size;
        loop {
            if self.started {
                self.rid.slot += 1;
                if self.rid.slot as usize >= slots_per_page {
                    self.rid.slot = 0;
                    self.rid.page += 1;
                }
            }
            self.started = true;

            if self.scan_count >= self.table.num_tuples as i64 {
                self.reset();
                return Err(DbError::RecordMgr("RM_NO_MORE_TUPLES".into()));
            }

            let handle = self.table.pool.pin_page(self.rid.page)?;
            let offset = self.rid.slot as usize * self.table.record_size;
            let data = self.table.pool.frame_data(&handle)?;

            if data[offset] != TOMBSTONE_LIVE {
                self.table.pool.unpin_page(&handle)?;
                continue;
            }

            let mut buf = vec![0u8; self.table.record_size];
            buf[0] = TOMBSTONE_DEAD;
            buf[1..].copy_from_slice(&data[offset + 1..offset + self.table.record_size]);
            self.table.pool.unpin_page(&handle)?;

            let candidate = Record {
                data: buf,
                id: Some(self.rid),
            };
            let row = record_to_row(&self.table.schema, &candidate)?;
            let matched = expr::eval(&self.expr, &row)?.as_bool().unwrap_or(false);
            self.scan_count += 1;

            if matched {
                return Ok(candidate);
            }
        }
    }

    fn reset(&mut self) {
        self.rid = Rid::new(1, 0);
        self.scan_count = 0;
        self.started = false;
    }

    /// Resets scan state. No page is ever left pinned across `next`
    /// calls, so there's nothing else to release here.
    pub fn close(mut self) {
        self.reset();
    }
}
