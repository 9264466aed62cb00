use super::*;
use tempfile::tempdir;

#[test]
fn create_open_single_page() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t0.bin");

    PagedFile::create(&path).unwrap();
    let pf = PagedFile::open(&path).unwrap();

    assert_eq!(pf.total_num_pages(), 1);
    assert_eq!(fs::metadata(&path).unwrap().len(), PAGE_SIZE as u64);
}

#[test]
fn write_read_round_trip_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t1.bin");

    PagedFile::create(&path).unwrap();
    let mut pf = PagedFile::open(&path).unwrap();

    let mut payload = [0u8; PAGE_SIZE];
    for (i, b) in payload.iter_mut().enumerate() {
        *b = (i % 256) as u8;
    }
    pf.write_block(0, &payload).unwrap();
    pf.close().unwrap();

    let mut pf = PagedFile::open(&path).unwrap();
    let mut buf = [0u8; PAGE_SIZE];
    pf.read_block(0, &mut buf).unwrap();

    assert_eq!(buf, payload);
}

#[test]
fn ensure_capacity_grows_with_zeroed_pages() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t2.bin");

    PagedFile::create(&path).unwrap();
    let mut pf = PagedFile::open(&path).unwrap();
    pf.ensure_capacity(5).unwrap();

    assert_eq!(pf.total_num_pages(), 5);
    assert_eq!(fs::metadata(&path).unwrap().len(), 5 * PAGE_SIZE as u64);

    let mut buf = [0u8; PAGE_SIZE];
    for page in 0..5 {
        pf.read_block(page, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }
}

#[test]
fn ensure_capacity_is_a_no_op_when_already_large_enough() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t3.bin");

    PagedFile::create(&path).unwrap();
    let mut pf = PagedFile::open(&path).unwrap();
    pf.ensure_capacity(1).unwrap();

    assert_eq!(pf.total_num_pages(), 1);
}

#[test]
fn cursor_variants_track_last_touched_block() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t4.bin");

    PagedFile::create(&path).unwrap();
    let mut pf = PagedFile::open(&path).unwrap();
    pf.ensure_capacity(3).unwrap();

    let mut buf = [0u8; PAGE_SIZE];
    pf.read_first_block(&mut buf).unwrap();
    assert_eq!(pf.get_block_pos(), 0);

    pf.read_last_block(&mut buf).unwrap();
    assert_eq!(pf.get_block_pos(), 2);

    pf.read_previous_block(&mut buf).unwrap();
    assert_eq!(pf.get_block_pos(), 1);

    pf.read_current_block(&mut buf).unwrap();
    assert_eq!(pf.get_block_pos(), 1);

    pf.read_next_block(&mut buf).unwrap();
    assert_eq!(pf.get_block_pos(), 2);
}

#[test]
fn read_out_of_range_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t5.bin");

    PagedFile::create(&path).unwrap();
    let mut pf = PagedFile::open(&path).unwrap();
    let mut buf = [0u8; PAGE_SIZE];

    assert!(matches!(pf.read_block(-1, &mut buf), Err(DbError::Storage(_))));
    assert!(matches!(pf.read_block(1, &mut buf), Err(DbError::Storage(_))));
}

#[test]
fn read_previous_on_first_page_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t6.bin");

    PagedFile::create(&path).unwrap();
    let mut pf = PagedFile::open(&path).unwrap();
    let mut buf = [0u8; PAGE_SIZE];

    assert!(matches!(
        pf.read_previous_block(&mut buf),
        Err(DbError::Storage(_))
    ));
}

#[test]
fn write_out_of_range_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t7.bin");

    PagedFile::create(&path).unwrap();
    let mut pf = PagedFile::open(&path).unwrap();
    let buf = [0u8; PAGE_SIZE];

    assert!(matches!(
        pf.write_block(5, &buf),
        Err(DbError::Storage(_))
    ));
}

#[test]
fn destroy_removes_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t8.bin");

    PagedFile::create(&path).unwrap();
    PagedFile::destroy(&path).unwrap();

    assert!(!path.exists());
    assert!(PagedFile::open(&path).is_err());
}

#[test]
fn open_truncates_partial_trailing_bytes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t9.bin");

    PagedFile::create(&path).unwrap();
    {
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(&[1, 2, 3]).unwrap();
    }

    let pf = PagedFile::open(&path).unwrap();
    assert_eq!(pf.total_num_pages(), 1);
}
