use sqlrec::{AccessMode, Connection, CursorState, Error, OpenOptions, RecordParams};

sqlrec::record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person {
        pub id: i32,
        pub name: String,
    }
}

sqlrec::record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Sample {
        pub i: i32,
        pub big: i64,
        pub f: f64,
        pub t: String,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn people(rows: &[(i32, &str)]) -> sqlrec::Result<Connection> {
    init_tracing();
    let conn = Connection::open_in_memory()?;
    conn.run("CREATE TABLE t (id INTEGER, name TEXT)", ())?;
    for (id, name) in rows {
        conn.run("INSERT INTO t (id, name) VALUES (?, ?)", (*id, *name))?;
    }
    Ok(conn)
}

fn assert_f64(a: f64, b: f64) {
    let diff = (a - b).abs();
    assert!(diff < 1e-12, "expected {b}, got {a} (diff {diff})");
}

#[test]
fn roundtrip_all_types() -> sqlrec::Result<()> {
    let conn = people(&[])?;

    let mut s = Sample::default();
    conn.execute(
        "SELECT ? AS i, ? AS big, ? AS f, ? AS t",
        (i32::MIN, 1i64 << 40, 3.75, "nul\0inside"),
    )?
    .fetch_one(&mut s)?;

    assert_eq!(s.i, i32::MIN);
    assert_eq!(s.big, 1 << 40);
    assert_f64(s.f, 3.75);
    // length-prefixed both ways: the embedded NUL survives
    assert_eq!(s.t.as_bytes(), b"nul\0inside");
    Ok(())
}

#[test]
fn fetch_one_by_key() -> sqlrec::Result<()> {
    let conn = people(&[(41, "Grace"), (42, "Ada")])?;

    let mut p = Person::default();
    let mut stmt = conn.execute("SELECT id, name FROM t WHERE id = ?", (42,))?;
    assert_eq!(stmt.state(), CursorState::NotStarted);
    stmt.fetch_one(&mut p)?;

    assert_eq!(stmt.state(), CursorState::RowAvailable);
    assert_eq!(
        p,
        Person {
            id: 42,
            name: "Ada".into()
        }
    );
    Ok(())
}

#[test]
fn for_each_collects_in_result_order() -> sqlrec::Result<()> {
    let conn = people(&[(1, "A"), (2, "B")])?;

    let mut got = Vec::new();
    conn.execute("SELECT * FROM t ORDER BY id", ())?
        .for_each(|p: Person| got.push(p))?;

    assert_eq!(
        got,
        vec![
            Person {
                id: 1,
                name: "A".into()
            },
            Person {
                id: 2,
                name: "B".into()
            },
        ]
    );
    Ok(())
}

#[test]
fn fetch_one_on_empty_result_is_no_row() -> sqlrec::Result<()> {
    let conn = people(&[(1, "A")])?;

    let mut stmt = conn.execute("SELECT id, name FROM t WHERE id = ?", (99,))?;
    let mut p = Person::default();
    assert_eq!(stmt.fetch_one(&mut p), Err(Error::NoRow));
    assert_eq!(stmt.state(), CursorState::Exhausted);
    assert_eq!(p, Person::default());
    Ok(())
}

#[test]
fn fetch_one_then_iterate_the_rest() -> sqlrec::Result<()> {
    let conn = people(&[(1, "A"), (2, "B"), (3, "C")])?;

    let mut stmt = conn.execute("SELECT id, name FROM t ORDER BY id", ())?;
    let first: Person = stmt.fetch()?;
    assert_eq!(first.id, 1);

    let rest: Vec<Person> = stmt.collect()?;
    assert_eq!(rest.iter().map(|p| p.id).collect::<Vec<_>>(), [2, 3]);
    Ok(())
}

#[test]
fn exhausted_statement_does_not_restart() -> sqlrec::Result<()> {
    let conn = people(&[(1, "A"), (2, "B")])?;

    let mut stmt = conn.execute("SELECT id, name FROM t", ())?;
    let mut calls = 0;
    stmt.for_each(|_: Person| calls += 1)?;
    assert_eq!(calls, 2);
    assert_eq!(stmt.state(), CursorState::Exhausted);

    // a second pass sees nothing
    stmt.for_each(|_: Person| calls += 1)?;
    assert_eq!(calls, 2);
    assert!(stmt.collect::<Person>()?.is_empty());
    assert_eq!(stmt.fetch::<Person>(), Err(Error::NoRow));
    Ok(())
}

#[test]
fn collect_into_keeps_existing_elements() -> sqlrec::Result<()> {
    let conn = people(&[(1, "A"), (2, "B")])?;

    let mut out = vec![Person {
        id: 0,
        name: "seed".into(),
    }];
    conn.execute("SELECT id, name FROM t ORDER BY id", ())?
        .collect_into(&mut out)?;

    let names: Vec<_> = out.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["seed", "A", "B"]);
    Ok(())
}

#[test]
fn rows_iterator_is_lazy_and_can_stop_early() -> sqlrec::Result<()> {
    let conn = people(&[(1, "A"), (2, "B"), (3, "C")])?;

    let mut stmt = conn.execute("SELECT id, name FROM t ORDER BY id", ())?;
    let first_two: Vec<Person> = stmt.rows::<Person>().take(2).collect::<sqlrec::Result<_>>()?;
    assert_eq!(first_two.len(), 2);
    assert_eq!(stmt.state(), CursorState::RowAvailable);

    // dropping a half-consumed statement must finalize cleanly
    drop(stmt);
    assert_eq!(conn.execute("SELECT count(*) AS id FROM t", ())?.fetch::<Person>()?.id, 3);
    Ok(())
}

#[test]
fn interleaved_statements_on_one_connection() -> sqlrec::Result<()> {
    let conn = people(&[(1, "A"), (2, "B")])?;

    let mut outer = conn.execute("SELECT id, name FROM t ORDER BY id", ())?;
    let mut inner = conn.execute("SELECT id, name FROM t ORDER BY id DESC", ())?;

    let a: Person = outer.fetch()?;
    let b: Person = inner.fetch()?;
    assert_eq!((a.id, b.id), (1, 2));
    Ok(())
}

#[test]
fn malformed_sql_is_a_query_error_and_connection_survives() -> sqlrec::Result<()> {
    let conn = people(&[(1, "A")])?;

    let err = conn.execute("SELEC id FROM t", ()).unwrap_err();
    match &err {
        Error::Query { code, message } => {
            assert_eq!(*code, 1);
            assert!(message.contains("syntax error"), "{message}");
        }
        other => panic!("expected query error, got {other:?}"),
    }

    let err = conn.execute("SELECT nope FROM t", ()).unwrap_err();
    assert!(matches!(err, Error::Query { .. }), "{err:?}");

    let err = conn.execute("   ", ()).unwrap_err();
    assert!(matches!(err, Error::Query { .. }), "{err:?}");

    let p: Person = conn.execute("SELECT id, name FROM t", ())?.fetch()?;
    assert_eq!(p.name, "A");
    Ok(())
}

#[test]
fn only_the_first_statement_is_prepared() -> sqlrec::Result<()> {
    let conn = people(&[])?;
    let p: Person = conn
        .execute("SELECT 1 AS id; SELECT 2 AS id", ())?
        .fetch()?;
    assert_eq!(p.id, 1);
    Ok(())
}

#[test]
fn too_many_arguments_is_a_bind_error() -> sqlrec::Result<()> {
    let conn = people(&[])?;

    let err = conn.execute("SELECT ? AS id", (1, 2)).unwrap_err();
    match err {
        Error::Bind { position, code, .. } => {
            assert_eq!(position, 2);
            assert_eq!(code, 25); // SQLITE_RANGE
        }
        other => panic!("expected bind error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn step_failure_is_a_row_fetch_error_and_sticks() -> sqlrec::Result<()> {
    let conn = people(&[])?;
    conn.run("CREATE TABLE u (id INTEGER PRIMARY KEY)", ())?;
    conn.run("INSERT INTO u (id) VALUES (?)", (1,))?;

    let mut stmt = conn.execute("INSERT INTO u (id) VALUES (?)", (1,))?;
    let err = stmt.run().unwrap_err();
    match &err {
        Error::RowFetch { code, message } => {
            assert_eq!(*code, 19); // SQLITE_CONSTRAINT
            assert!(message.contains("UNIQUE"), "{message}");
        }
        other => panic!("expected row fetch error, got {other:?}"),
    }
    assert_eq!(stmt.state(), CursorState::Errored);
    assert_eq!(stmt.run(), Err(err));
    drop(stmt);

    // the connection is still usable
    conn.run("INSERT INTO u (id) VALUES (?)", (2,))?;
    Ok(())
}

#[test]
fn unreadable_text_errors_the_cursor() -> sqlrec::Result<()> {
    let conn = people(&[])?;
    conn.run("INSERT INTO t (id, name) VALUES (1, CAST(x'ff' AS TEXT))", ())?;
    conn.run("INSERT INTO t (id, name) VALUES (2, 'ok')", ())?;

    let mut stmt = conn.execute("SELECT id, name FROM t ORDER BY id", ())?;
    let err = stmt.fetch::<Person>().unwrap_err();
    assert!(matches!(err, Error::RowFetch { code: 20, .. }), "{err:?}"); // SQLITE_MISMATCH
    assert_eq!(stmt.state(), CursorState::Errored);

    // the following row is not handed out
    assert_eq!(stmt.collect::<Person>(), Err(err.clone()));
    let mut calls = 0;
    assert_eq!(stmt.for_each(|_: Person| calls += 1), Err(err));
    assert_eq!(calls, 0);
    Ok(())
}

#[test]
fn null_and_optional_arguments() -> sqlrec::Result<()> {
    let conn = people(&[])?;
    conn.run(
        "INSERT INTO t (id, name) VALUES (?, ?)",
        (Some(7), None::<String>),
    )?;

    let p: Person = conn.execute("SELECT id, name FROM t", ())?.fetch()?;
    assert_eq!(p.id, 7);
    assert_eq!(p.name, "");
    Ok(())
}

#[test]
fn record_params_bind_fields_in_order() -> sqlrec::Result<()> {
    let conn = people(&[])?;
    let ada = Person {
        id: 42,
        name: "Ada".into(),
    };
    conn.run(
        "INSERT INTO t (id, name) VALUES (?, ?)",
        RecordParams(&ada),
    )?;

    let back: Person = conn
        .execute("SELECT * FROM t WHERE name = ?", sqlrec::params![ada.name])?
        .fetch()?;
    assert_eq!(back, ada);
    Ok(())
}

#[test]
fn file_database_and_access_modes() -> sqlrec::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("people.db");

    {
        let conn = Connection::open(&path, AccessMode::ReadWriteCreate)?;
        conn.run("CREATE TABLE t (id INTEGER, name TEXT)", ())?;
        conn.run("INSERT INTO t VALUES (?, ?)", (1, "A"))?;
    }

    let conn = Connection::open(&path, AccessMode::ReadOnly)?;
    let p: Person = conn.execute("SELECT id, name FROM t", ())?.fetch()?;
    assert_eq!(p.name, "A");

    let err = conn.run("INSERT INTO t VALUES (?, ?)", (2, "B")).unwrap_err();
    assert!(
        matches!(err, Error::RowFetch { code: 8, .. }), // SQLITE_READONLY
        "{err:?}"
    );
    Ok(())
}

#[test]
fn open_failures_are_connection_errors() {
    let dir = tempfile::tempdir().expect("tempdir");

    let missing = dir.path().join("missing.db");
    let err = Connection::open(&missing, AccessMode::ReadOnly).unwrap_err();
    assert!(matches!(err, Error::Connection { code: 14, .. }), "{err:?}"); // SQLITE_CANTOPEN

    let err = Connection::open(&missing, AccessMode::ReadWrite).unwrap_err();
    assert!(matches!(err, Error::Connection { .. }), "{err:?}");

    let err = OpenOptions::new().open("bad\0name.db").unwrap_err();
    match err {
        Error::Connection { message, .. } => assert!(message.contains("NUL"), "{message}"),
        other => panic!("expected connection error, got {other:?}"),
    }
}

#[test]
fn uri_locations() -> sqlrec::Result<()> {
    let conn = OpenOptions::new().uri(true).open("file::memory:")?;
    let p: Person = conn.execute("SELECT 5 AS id", ())?.fetch()?;
    assert_eq!(p.id, 5);
    Ok(())
}

#[test]
fn close_is_idempotent_and_final() -> sqlrec::Result<()> {
    let mut conn = people(&[(1, "A")])?;
    assert!(conn.is_open());

    conn.close()?;
    conn.close()?;
    assert!(!conn.is_open());

    let err = conn.execute("SELECT 1", ()).unwrap_err();
    assert!(matches!(err, Error::Connection { .. }), "{err:?}");
    assert!(err.to_string().starts_with("connection error"), "{err}");
    Ok(())
}
