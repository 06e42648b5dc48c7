#![cfg(feature = "sqlite")]
use sql_fluent::prelude::*;
use tokio::runtime::Runtime;

#[test]
fn dml_select_and_value_types_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:surface_types?mode=memory&cache=shared".to_string()).await?;
        let mut conn = db.get_connection().await?;
        conn.execute_batch(
            "CREATE TABLE sample (id INTEGER, score REAL, label TEXT, payload BLOB, note TEXT);",
        )
        .await?;

        let rows_affected = conn
            .execute_dml(
                "INSERT INTO sample (id, score, label, payload, note) VALUES (?1, ?2, ?3, ?4, ?5)",
                &[
                    SqlValue::Int(7),
                    SqlValue::Float(2.5),
                    SqlValue::Text("seven".to_string()),
                    SqlValue::Blob(vec![0xde, 0xad]),
                    SqlValue::Null,
                ],
            )
            .await?;
        assert_eq!(rows_affected, 1);

        let result_set = conn
            .execute_select(
                "select id, score, label, payload, note from sample where id = ?1",
                &[SqlValue::Int(7)],
            )
            .await?;
        assert_eq!(result_set.results.len(), 1);
        let row = &result_set.results[0];
        assert_eq!(*row.get("id").unwrap().as_int().unwrap(), 7);
        assert_eq!(row.get("score").unwrap().as_float().unwrap(), 2.5);
        assert_eq!(row.get("label").unwrap().as_text().unwrap(), "seven");
        assert_eq!(row.get("payload").unwrap().as_blob().unwrap(), &[0xde, 0xad]);
        assert!(row.get("note").unwrap().is_null());
        assert_eq!(*row.get_by_index(0).unwrap().as_int().unwrap(), 7);
        assert!(row.get("no_such_column").is_none());

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

#[test]
fn script_errors_roll_the_whole_batch_back() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:surface_script?mode=memory&cache=shared".to_string())
                .await?;
        let mut conn = db.get_connection().await?;
        conn.execute_batch("CREATE TABLE log (id INTEGER);").await?;

        let err = conn
            .execute_batch(
                "INSERT INTO log (id) VALUES (1);
                 INSERT INTO nonexistent (id) VALUES (2);",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SqlFluentError::SqliteError(_)));

        let result_set = conn
            .execute_select("select count(*) as cnt from log;", &[])
            .await?;
        assert_eq!(
            *result_set.results[0].get("cnt").unwrap().as_int().unwrap(),
            0
        );

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

#[test]
fn interact_sync_exposes_the_raw_connection() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:surface_raw?mode=memory&cache=shared".to_string()).await?;
        let mut conn = db.get_connection().await?;
        conn.execute_batch("CREATE TABLE raw_t (id INTEGER);").await?;

        let inserted = conn
            .interact_sync(|wrapper| match wrapper {
                AnyConnWrapper::Sqlite(sql_conn) => {
                    let tx = sql_conn.transaction()?;
                    for i in 0..5 {
                        tx.execute("INSERT INTO raw_t (id) VALUES (?1)", [i])?;
                    }
                    tx.commit()?;
                    Ok::<usize, SqlFluentError>(5)
                }
                #[allow(unreachable_patterns)]
                _ => Err(SqlFluentError::Other("unexpected database type".into())),
            })
            .await??;
        assert_eq!(inserted, 5);

        let result_set = conn
            .execute_select("select count(*) as cnt from raw_t;", &[])
            .await?;
        assert_eq!(
            *result_set.results[0].get("cnt").unwrap().as_int().unwrap(),
            5
        );

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

#[test]
fn database_type_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:surface_kind?mode=memory&cache=shared".to_string()).await?;
        assert_eq!(db.db_type, DatabaseType::Sqlite);
        let cloned = db.clone();
        let _conn = cloned.get_connection().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}
