use std::thread;

use sql_gatekeeper::{AccessFlags, DbError, OpenFlags, SqlConnection};

const WRITERS: usize = 5;
const ROWS_PER_WRITER: usize = 10;

/// Mirrors the classic mass read/write scenario: several writer threads,
/// each with its own connection to the same file, insert uniquely-prefixed
/// rows and immediately verify each insert through a prepared count query.
/// Under the default synchronization object no writer may ever observe 0 or
/// 2+ copies of its own value.
#[test]
fn massive_read_write_with_naive_synchronization() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("stress.db");

    let conn = SqlConnection::open(&db_path, OpenFlags::None, AccessFlags::ReadWrite)?;
    conn.exec_command("CREATE TABLE test(value TEXT);")?;

    let mut workers = Vec::with_capacity(WRITERS);
    for prefix in 0..WRITERS {
        let path = db_path.clone();
        workers.push(thread::spawn(move || -> Result<(), DbError> {
            let conn = SqlConnection::open(&path, OpenFlags::None, AccessFlags::ReadWrite)?;
            let mut count = conn.prepare_data_command("SELECT COUNT(*) FROM test WHERE value=?")?;

            for i in 0..ROWS_PER_WRITER {
                let value = format!("value_{prefix}_{i}");
                conn.exec_command(&format!("INSERT INTO test VALUES ('{value}');"))?;

                count.bind_string(1, &value)?;
                assert!(count.step()?);
                assert_eq!(count.column_string(0)?, "1");
                count.reset();
            }
            Ok(())
        }));
    }

    for worker in workers {
        worker.join().expect("writer thread panicked")?;
    }

    let mut total = conn.prepare_data_command("SELECT COUNT(*) FROM test")?;
    assert!(total.step()?);
    assert_eq!(total.column_int64(0)?, (WRITERS * ROWS_PER_WRITER) as i64);

    conn.exec_command("DROP TABLE test;")?;
    Ok(())
}
