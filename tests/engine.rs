//! Integration tests that hand-assemble small SQLite-format database
//! files in memory and drive them through the public `Database` /
//! `execute` API, end to end rather than unit by unit.

use sqlite_query_engine::database::Database;
use sqlite_query_engine::executor::{execute, QueryOutput};
use sqlite_query_engine::sql::parse_select;

use std::sync::atomic::{AtomicU64, Ordering};

const PAGE_SIZE: usize = 4096;

static FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn write_temp_db(bytes: &[u8]) -> String {
    let id = FILE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!("engine_integration_test_{}_{id}.db", std::process::id()));
    std::fs::write(&path, bytes).expect("write temp db fixture");
    path.to_string_lossy().into_owned()
}

fn varint(mut v: i64) -> Vec<u8> {
    assert!(v >= 0, "test helper only covers non-negative varints");
    if v == 0 {
        return vec![0];
    }
    let mut chunks = Vec::new();
    chunks.push((v & 0x7F) as u8);
    v >>= 7;
    while v > 0 {
        chunks.push((v & 0x7F) as u8 | 0x80);
        v >>= 7;
    }
    chunks.reverse();
    chunks
}

/// One column value for a record, along with its serial type code and
/// body bytes.
enum Col {
    Null,
    Int(i64),
    Text(String),
}

impl Col {
    fn serial_type_code(&self) -> i64 {
        match self {
            Col::Null => 0,
            Col::Int(n) => match n {
                0..=127 | -128..=-1 => 1,
                -32768..=32767 => 2,
                _ => 6,
            },
            Col::Text(s) => 13 + 2 * s.len() as i64,
        }
    }

    fn body(&self) -> Vec<u8> {
        match self {
            Col::Null => vec![],
            Col::Int(n) => match self.serial_type_code() {
                1 => vec![*n as i8 as u8],
                2 => (*n as i16).to_be_bytes().to_vec(),
                _ => n.to_be_bytes().to_vec(),
            },
            Col::Text(s) => s.as_bytes().to_vec(),
        }
    }
}

/// Builds a record: `header_size_varint ++ serial_type_varints ++ body`.
fn build_record(cols: &[Col]) -> Vec<u8> {
    let type_bytes: Vec<u8> = cols.iter().flat_map(|c| varint(c.serial_type_code())).collect();
    let header_size = 1 + type_bytes.len();
    let mut out = varint(header_size as i64);
    out.extend(type_bytes);
    for c in cols {
        out.extend(c.body());
    }
    out
}

fn leaf_table_cell(rowid: i64, record: &[u8]) -> Vec<u8> {
    let mut cell = varint(record.len() as i64);
    cell.extend(varint(rowid));
    cell.extend_from_slice(record);
    cell
}

fn leaf_index_cell(key: &str, rowid: i64) -> Vec<u8> {
    let record = build_record(&[Col::Text(key.to_string()), Col::Int(rowid)]);
    let mut cell = varint(record.len() as i64);
    cell.extend(record);
    cell
}

/// Packs `cells` from the end of the page buffer backwards and points
/// a pointer array (right after the header) at each, the way sqlite's
/// own page layout works (content grows down, pointers grow up).
fn page_with_cells(
    header_offset: usize,
    kind_byte: u8,
    header_len: usize,
    right_child: Option<u32>,
    cells: &[Vec<u8>],
) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_SIZE];
    page[header_offset] = kind_byte;
    page[header_offset + 3..header_offset + 5].copy_from_slice(&(cells.len() as u16).to_be_bytes());
    if let Some(rc) = right_child {
        page[header_offset + 8..header_offset + 12].copy_from_slice(&rc.to_be_bytes());
    }

    let mut cursor = page.len();
    let mut offsets = Vec::new();
    for cell in cells {
        cursor -= cell.len();
        page[cursor..cursor + cell.len()].copy_from_slice(cell);
        offsets.push(cursor as u16);
    }

    let ptr_start = header_offset + header_len;
    for (i, off) in offsets.iter().enumerate() {
        page[ptr_start + i * 2..ptr_start + i * 2 + 2].copy_from_slice(&off.to_be_bytes());
    }
    page
}

fn file_header(page_size: u16) -> Vec<u8> {
    let mut header = vec![0u8; 100];
    header[16..18].copy_from_slice(&page_size.to_be_bytes());
    header
}

fn schema_cell(obj_type: &str, name: &str, table_name: &str, rootpage: i64, sql: &str) -> Vec<u8> {
    let record = build_record(&[
        Col::Text(obj_type.to_string()),
        Col::Text(name.to_string()),
        Col::Text(table_name.to_string()),
        Col::Int(rootpage),
        Col::Text(sql.to_string()),
    ]);
    leaf_table_cell(0, &record) // schema rows carry a rowid too, but it's never read back
}

/// Builds a canonical two-page `apples` fixture: page 1 is
/// `sqlite_schema` (file-header-prefixed), page 2 is the `apples`
/// table's leaf.
fn apples_fixture() -> String {
    let create_sql = "CREATE TABLE apples (id INTEGER PRIMARY KEY, name TEXT, color TEXT)";
    let schema_cells = vec![schema_cell("table", "apples", "apples", 2, create_sql)];
    let mut page1 = page_with_cells(100, 0x0D, 8, None, &schema_cells);
    page1.splice(0..100, file_header(PAGE_SIZE as u16));

    let rows = [
        (1i64, "Granny Smith", "Light Green"),
        (2, "Fuji", "Red"),
        (3, "Honeycrisp", "Blush Red"),
        (4, "Golden Delicious", "Yellow"),
    ];
    let row_cells: Vec<Vec<u8>> = rows
        .iter()
        .map(|(id, name, color)| {
            let record = build_record(&[Col::Null, Col::Text(name.to_string()), Col::Text(color.to_string())]);
            leaf_table_cell(*id, &record)
        })
        .collect();
    let page2 = page_with_cells(0, 0x0D, 8, None, &row_cells);

    let mut file_bytes = page1;
    file_bytes.extend(page2);
    write_temp_db(&file_bytes)
}

#[test]
fn dbinfo_reports_page_size_and_schema_cell_count() {
    let path = apples_fixture();
    let db = Database::open(&path).unwrap();
    assert_eq!(db.page_size(), PAGE_SIZE as u32);
    assert_eq!(db.schema_cell_count().unwrap(), 1);
}

#[test]
fn tables_lists_catalog_in_schema_order() {
    let path = apples_fixture();
    let db = Database::open(&path).unwrap();
    let names: Vec<&str> = db.tables().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["apples"]);
}

#[test]
fn count_star_matches_row_count() {
    let path = apples_fixture();
    let db = Database::open(&path).unwrap();
    let query = parse_select("SELECT COUNT(*) FROM apples").unwrap();
    match execute(&db, &query).unwrap() {
        QueryOutput::Count(n) => assert_eq!(n, 4),
        _ => panic!("expected a count"),
    }
}

#[test]
fn single_column_projection_preserves_tree_order() {
    let path = apples_fixture();
    let db = Database::open(&path).unwrap();
    let query = parse_select("SELECT name FROM apples").unwrap();
    match execute(&db, &query).unwrap() {
        QueryOutput::Rows(rows) => {
            assert_eq!(rows, vec!["Granny Smith", "Fuji", "Honeycrisp", "Golden Delicious"]);
        }
        _ => panic!("expected rows"),
    }
}

#[test]
fn integer_primary_key_is_aliased_to_the_rowid() {
    let path = apples_fixture();
    let db = Database::open(&path).unwrap();
    let query = parse_select("SELECT id FROM apples").unwrap();
    match execute(&db, &query).unwrap() {
        QueryOutput::Rows(rows) => assert_eq!(rows, vec!["1", "2", "3", "4"]),
        _ => panic!("expected rows"),
    }
}

#[test]
fn filtered_multi_column_projection_matches_spec_scenario() {
    let path = apples_fixture();
    let db = Database::open(&path).unwrap();
    let query = parse_select("SELECT name, color FROM apples WHERE color = 'Yellow'").unwrap();
    match execute(&db, &query).unwrap() {
        QueryOutput::Rows(rows) => assert_eq!(rows, vec!["Golden Delicious|Yellow"]),
        _ => panic!("expected rows"),
    }
}

#[test]
fn unknown_table_is_a_query_error() {
    let path = apples_fixture();
    let db = Database::open(&path).unwrap();
    let query = parse_select("SELECT name FROM pears").unwrap();
    assert!(execute(&db, &query).is_err());
}

/// Builds a fixture where the table's root is an interior page with
/// one real leaf (rowid 1) and one deliberately corrupt "leaf" (an
/// invalid page-type byte) that an index-restricted scan must never
/// visit. An `idx_t_color` index routes the `WHERE color = 'Yellow'`
/// query to rowid 1 only; if the walker ever touched the corrupt page
/// it would surface a `FormatError` instead of a clean result.
fn indexed_fixture_with_corrupt_unindexed_leaf() -> String {
    let create_sql = "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, color TEXT)";
    let schema_cells = vec![
        schema_cell("table", "t", "t", 2, create_sql),
        schema_cell("index", "idx_t_color", "t", 5, "CREATE INDEX idx_t_color ON t (color)"),
    ];
    let mut page1 = page_with_cells(100, 0x0D, 8, None, &schema_cells);
    page1.splice(0..100, file_header(PAGE_SIZE as u16));

    // Page 2: interior table root. boundary_rowid=10 routes rowid 1
    // into the left child (page 3); the corrupt page 4 is reachable
    // only via the right_child pointer, for any rowid >= 10.
    let interior_cell = {
        let mut c = 3u32.to_be_bytes().to_vec();
        c.extend(varint(10));
        c
    };
    let page2 = page_with_cells(0, 0x05, 12, Some(4), &[interior_cell]);

    // Page 3: the real leaf, one row.
    let record = build_record(&[Col::Null, Col::Text("Golden Delicious".into()), Col::Text("Yellow".into())]);
    let page3 = page_with_cells(0, 0x0D, 8, None, &[leaf_table_cell(1, &record)]);

    // Page 4: deliberately corrupt, a page-type byte with no meaning.
    let mut page4 = vec![0u8; PAGE_SIZE];
    page4[0] = 0xFF;

    // Page 5: the color index, one leaf entry pointing at rowid 1.
    let page5 = page_with_cells(0, 0x0A, 8, None, &[leaf_index_cell("yellow", 1)]);

    let mut file_bytes = page1;
    file_bytes.extend(page2);
    file_bytes.extend(page3);
    file_bytes.extend(page4);
    file_bytes.extend(page5);
    write_temp_db(&file_bytes)
}

#[test]
fn indexed_query_never_visits_the_unmatched_leaf() {
    let path = indexed_fixture_with_corrupt_unindexed_leaf();
    let db = Database::open(&path).unwrap();
    let query = parse_select("SELECT name, color FROM t WHERE color = 'Yellow'").unwrap();
    match execute(&db, &query).unwrap() {
        QueryOutput::Rows(rows) => assert_eq!(rows, vec!["Golden Delicious|Yellow"]),
        _ => panic!("expected rows"),
    }
}

#[test]
fn full_scan_over_the_same_fixture_would_hit_the_corrupt_page() {
    // Sanity check that the corrupt page is really reachable by an
    // unfiltered scan, so the prior test's pass is meaningful and not
    // an artifact of a fixture that never exercises page 4 at all.
    let path = indexed_fixture_with_corrupt_unindexed_leaf();
    let db = Database::open(&path).unwrap();
    let query = parse_select("SELECT name, color FROM t").unwrap();
    assert!(execute(&db, &query).is_err());
}
