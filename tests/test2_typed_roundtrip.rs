use sql_gatekeeper::{AccessFlags, OpenFlags, SqlConnection};

fn open_scratch(dir: &tempfile::TempDir) -> Result<SqlConnection, Box<dyn std::error::Error>> {
    Ok(SqlConnection::open(
        dir.path().join("roundtrip.db"),
        OpenFlags::None,
        AccessFlags::ReadWrite,
    )?)
}

#[test]
fn int8_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let conn = open_scratch(&dir)?;
    conn.exec_command("CREATE TABLE test_int8(value INT8);")?;

    let mut insert = conn.prepare_data_command("INSERT INTO test_int8 VALUES (?)")?;
    insert.bind_int8(1, 127)?;
    assert!(!insert.step()?);
    insert.reset();
    insert.bind_optional_int8(1, Some(-127))?;
    assert!(!insert.step()?);

    let mut select = conn.prepare_data_command("SELECT value FROM test_int8")?;
    assert!(select.step()?);
    assert_eq!(select.column_int8(0)?, 127);
    assert!(select.step()?);
    assert_eq!(select.column_optional_int8(0)?, Some(-127));
    assert!(!select.step()?);
    Ok(())
}

#[test]
fn int16_roundtrip_boundary_patterns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let conn = open_scratch(&dir)?;
    conn.exec_command("CREATE TABLE test_int16(value INT16);")?;

    let mut insert = conn.prepare_data_command("INSERT INTO test_int16 VALUES (?)")?;
    // All-ones and sign-bit-only patterns.
    insert.bind_int16(1, -1)?;
    assert!(!insert.step()?);
    insert.reset();
    insert.bind_optional_int16(1, Some(i16::MIN))?;
    assert!(!insert.step()?);

    let mut select = conn.prepare_data_command("SELECT value FROM test_int16")?;
    assert!(select.step()?);
    assert_eq!(select.column_int16(0)?, -1);
    assert!(select.step()?);
    assert_eq!(select.column_optional_int16(0)?, Some(i16::MIN));
    Ok(())
}

#[test]
fn int32_roundtrip_boundary_patterns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let conn = open_scratch(&dir)?;
    conn.exec_command("CREATE TABLE test_int32(value INT32);")?;

    let mut insert = conn.prepare_data_command("INSERT INTO test_int32 VALUES (?)")?;
    insert.bind_int32(1, -1)?;
    assert!(!insert.step()?);
    insert.reset();
    insert.bind_optional_int32(1, Some(i32::MIN))?;
    assert!(!insert.step()?);

    let mut select = conn.prepare_data_command("SELECT value FROM test_int32")?;
    assert!(select.step()?);
    assert_eq!(select.column_int32(0)?, -1);
    assert!(select.step()?);
    assert_eq!(select.column_optional_int32(0)?, Some(i32::MIN));
    Ok(())
}

#[test]
fn int64_roundtrip_boundary_patterns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let conn = open_scratch(&dir)?;
    conn.exec_command("CREATE TABLE test_int64(value INT64);")?;

    let mut insert = conn.prepare_data_command("INSERT INTO test_int64 VALUES (?)")?;
    insert.bind_int64(1, -1)?;
    assert!(!insert.step()?);
    insert.reset();
    insert.bind_optional_int64(1, Some(i64::MIN))?;
    assert!(!insert.step()?);

    let mut select = conn.prepare_data_command("SELECT value FROM test_int64")?;
    assert!(select.step()?);
    assert_eq!(select.column_int64(0)?, -1);
    assert!(select.step()?);
    assert_eq!(select.column_optional_int64(0)?, Some(i64::MIN));
    Ok(())
}

#[test]
fn float_roundtrip_within_epsilon() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let conn = open_scratch(&dir)?;
    conn.exec_command("CREATE TABLE test_float(value FLOAT);")?;

    let mut insert = conn.prepare_data_command("INSERT INTO test_float VALUES (?)")?;
    insert.bind_float(1, 10.2545)?;
    assert!(!insert.step()?);
    insert.reset();
    insert.bind_optional_float(1, Some(-90.6788))?;
    assert!(!insert.step()?);

    let mut select = conn.prepare_data_command("SELECT value FROM test_float")?;
    assert!(select.step()?);
    let value = select.column_float(0)?;
    assert!(value > 10.2544 && value < 10.2546);
    assert!(select.step()?);
    let value = select.column_optional_float(0)?.expect("value was bound");
    assert!(value > -90.6789 && value < -90.6787);
    Ok(())
}

#[test]
fn double_roundtrip_within_epsilon() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let conn = open_scratch(&dir)?;
    conn.exec_command("CREATE TABLE test_double(value DOUBLE);")?;

    let mut insert = conn.prepare_data_command("INSERT INTO test_double VALUES (?)")?;
    insert.bind_double(1, 10.2545)?;
    assert!(!insert.step()?);
    insert.reset();
    insert.bind_optional_double(1, Some(-90.6788))?;
    assert!(!insert.step()?);

    let mut select = conn.prepare_data_command("SELECT value FROM test_double")?;
    assert!(select.step()?);
    let value = select.column_double(0)?;
    assert!(value > 10.2544 && value < 10.2546);
    assert!(select.step()?);
    let value = select.column_optional_double(0)?.expect("value was bound");
    assert!(value > -90.6789 && value < -90.6787);
    Ok(())
}

#[test]
fn string_and_blob_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let conn = open_scratch(&dir)?;
    conn.exec_command("CREATE TABLE test_payload(label TEXT, data BLOB);")?;

    let payload: &[u8] = &[0x00, 0xFF, 0x10, 0x20, 0x7F];
    let mut insert = conn.prepare_data_command("INSERT INTO test_payload VALUES (?, ?)")?;
    insert.bind_string(1, "zażółć gęślą jaźń")?;
    insert.bind_blob(2, payload)?;
    assert!(!insert.step()?);

    let mut select = conn.prepare_data_command("SELECT label, data FROM test_payload")?;
    assert!(select.step()?);
    assert_eq!(select.column_string(0)?, "zażółć gęślą jaźń");
    assert_eq!(select.column_blob(1)?, payload);
    Ok(())
}

#[test]
fn numeric_columns_read_back_as_text() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let conn = open_scratch(&dir)?;
    conn.exec_command("CREATE TABLE test_mixed(value INT64);")?;
    conn.exec_command("INSERT INTO test_mixed VALUES (42);")?;

    let mut count = conn.prepare_data_command("SELECT COUNT(*) FROM test_mixed")?;
    assert!(count.step()?);
    assert_eq!(count.column_string(0)?, "1");

    let mut select = conn.prepare_data_command("SELECT value FROM test_mixed")?;
    assert!(select.step()?);
    assert_eq!(select.column_string(0)?, "42");
    Ok(())
}
