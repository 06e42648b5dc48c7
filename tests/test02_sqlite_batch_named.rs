#![cfg(feature = "sqlite")]
use std::collections::HashMap;

use sql_fluent::prelude::*;
use tokio::runtime::Runtime;

fn named_row(pairs: &[(&str, i64)]) -> HashMap<String, SqlValue> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), SqlValue::Int(*v)))
        .collect()
}

#[test]
fn named_rows_update_in_placeholder_order() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:named_update?mode=memory&cache=shared".to_string()).await?;
        let mut conn = db.get_connection().await?;
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER);
             INSERT INTO t (id, v) VALUES (1, 0), (2, 0), (3, 0);",
        )
        .await?;

        let rows = vec![
            named_row(&[("id", 1), ("v", 10)]),
            named_row(&[("id", 2), ("v", 20)]),
            named_row(&[("id", 3), ("v", 30)]),
        ];
        let results = conn
            .batch("UPDATE t SET v = :v WHERE id = :id")
            .named_rows(rows)?
            .batch_size(2)?
            .run()
            .await?;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.rows_affected == 1));

        let result_set = conn
            .execute_select("select v from t order by id;", &[])
            .await?;
        let values: Vec<i64> = result_set
            .results
            .iter()
            .map(|row| *row.get("v").unwrap().as_int().unwrap())
            .collect();
        assert_eq!(values, vec![10, 20, 30]);

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

#[test]
fn named_rows_tolerate_extra_keys() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:named_extra?mode=memory&cache=shared".to_string()).await?;
        let mut conn = db.get_connection().await?;
        conn.execute_batch("CREATE TABLE t (id INTEGER, v INTEGER);")
            .await?;

        let rows = vec![named_row(&[("id", 1), ("v", 10), ("ignored", 99)])];
        let results = conn
            .batch("INSERT INTO t (id, v) VALUES (:id, :v)")
            .named_rows(rows)?
            .run()
            .await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rows_affected, 1);

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

#[test]
fn missing_named_value_fails_before_reaching_the_statement()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:named_missing?mode=memory&cache=shared".to_string()).await?;
        let mut conn = db.get_connection().await?;
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER);
             INSERT INTO t (id, v) VALUES (1, 0);",
        )
        .await?;

        // second row lacks :v; nothing was flushed yet, so no update lands
        let rows = vec![named_row(&[("id", 1), ("v", 10)]), named_row(&[("id", 1)])];
        let err = conn
            .batch("UPDATE t SET v = :v WHERE id = :id")
            .named_rows(rows)?
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SqlFluentError::ParameterError(_)));

        let result_set = conn
            .execute_select("select v from t where id = 1;", &[])
            .await?;
        assert_eq!(
            *result_set.results[0].get("v").unwrap().as_int().unwrap(),
            0
        );

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

#[test]
fn per_row_outcomes_report_rows_affected() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:named_outcome?mode=memory&cache=shared".to_string()).await?;
        let mut conn = db.get_connection().await?;
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER);
             INSERT INTO t (id, v) VALUES (1, 0);",
        )
        .await?;

        // id 7 doesn't exist, so its update affects zero rows but still
        // yields an ordered result
        let rows = vec![
            named_row(&[("id", 1), ("v", 10)]),
            named_row(&[("id", 7), ("v", 70)]),
        ];
        let results = conn
            .batch("UPDATE t SET v = :v WHERE id = :id")
            .named_rows(rows)?
            .run()
            .await?;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rows_affected, 1);
        assert_eq!(results[1].rows_affected, 0);

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

#[test]
fn mixing_parameter_kinds_is_a_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db =
            FluentDb::new_sqlite("file:named_config?mode=memory&cache=shared".to_string()).await?;
        let mut conn = db.get_connection().await?;

        let err = conn
            .batch("INSERT INTO t (id) VALUES (:id)")
            .named_rows(vec![named_row(&[("id", 1)])])?
            .rows(vec![vec![SqlValue::Int(1)]])
            .unwrap_err();
        assert!(matches!(err, SqlFluentError::ConfigError(_)));

        let err = conn
            .batch("INSERT INTO t (id) VALUES (?1)")
            .rows(vec![vec![SqlValue::Int(1)]])?
            .named_rows(vec![named_row(&[("id", 1)])])
            .unwrap_err();
        assert!(matches!(err, SqlFluentError::ConfigError(_)));

        let err = conn
            .batch("INSERT INTO t (id) VALUES (?1)")
            .rows(vec![vec![SqlValue::Int(1)]])?
            .batch_size(0)
            .unwrap_err();
        assert!(matches!(err, SqlFluentError::ConfigError(_)));

        let err = conn
            .batch("INSERT INTO t (id) VALUES (?1)")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SqlFluentError::ConfigError(_)));

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}
