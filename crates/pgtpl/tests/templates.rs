//! Template execution against a live database.
//!
//! Every test is skipped when `DATABASE_URL` is not set.

use pgtpl::{DriverError, ErrorAction, TplError, TplResult, Value, template};
use serde_json::json;
use tokio_postgres::{Client, NoTls};

async fn connect(test: &str) -> TplResult<Option<Client>> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };

    let (client, connection) = tokio_postgres::connect(&database_url, NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });

    client
        .batch_execute(
            "CREATE TEMP TABLE zoo (id int4 NOT NULL, type text NOT NULL, value text NOT NULL);
             INSERT INTO zoo (id, type, value) VALUES
                (5, 'fruit', 'apple'),
                (5, 'mammal', 'cat'),
                (5, 'mammal', 'rhino'),
                (6, 'fruit', 'pear'),
                (7, 'bird', 'owl');",
        )
        .await?;
    Ok(Some(client))
}

#[tokio::test]
async fn fetch_all_expands_named_lists() -> TplResult<()> {
    let Some(client) = connect("fetch_all_expands_named_lists").await? else {
        return Ok(());
    };

    let rows = template("SELECT id, value FROM zoo WHERE id IN (:ids) AND type = :type ORDER BY value")
        .bind_named("ids", vec![5, 6])
        .bind_named("type", "fruit")
        .tag("zoo.fruit")
        .fetch_all(&client)
        .await?;

    let values: Vec<_> = rows.iter().map(|r| r.get("value").cloned()).collect();
    assert_eq!(
        values,
        vec![Some(Value::from("apple")), Some(Value::from("pear"))]
    );
    assert_eq!(rows[0].get("id"), Some(&Value::Int(5)));
    Ok(())
}

#[tokio::test]
async fn empty_list_matches_nothing() -> TplResult<()> {
    let Some(client) = connect("empty_list_matches_nothing").await? else {
        return Ok(());
    };

    let rows = template("SELECT * FROM zoo WHERE id IN (?)")
        .bind(Vec::<i32>::new())
        .fetch_all(&client)
        .await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn fetch_grouped_nests_rows() -> TplResult<()> {
    let Some(client) = connect("fetch_grouped_nests_rows").await? else {
        return Ok(());
    };

    let grouped = template("SELECT id, type, value FROM zoo WHERE id IN (?) ORDER BY id, value")
        .bind(vec![5, 6])
        .fetch_grouped(&client, "id[type][]=>value", false)
        .await?;

    assert_eq!(
        serde_json::Value::Object(grouped),
        json!({
            "5": {"fruit": ["apple"], "mammal": ["cat", "rhino"]},
            "6": {"fruit": ["pear"]}
        })
    );
    Ok(())
}

#[tokio::test]
async fn invalid_format_fails_before_execution() -> TplResult<()> {
    let Some(client) = connect("invalid_format_fails_before_execution").await? else {
        return Ok(());
    };

    let err = template("SELECT * FROM no_such_table")
        .fetch_grouped(&client, "id[=>value", false)
        .await
        .unwrap_err();
    assert!(err.is_invalid_format());
    Ok(())
}

#[tokio::test]
async fn scalar_column_and_execute() -> TplResult<()> {
    let Some(client) = connect("scalar_column_and_execute").await? else {
        return Ok(());
    };

    let count = template("SELECT count(*) FROM zoo WHERE type = ?")
        .bind("mammal")
        .fetch_scalar(&client)
        .await?;
    assert_eq!(count, Some(Value::Int(2)));

    let ids = template("SELECT DISTINCT id FROM zoo ORDER BY id")
        .fetch_column(&client)
        .await?;
    assert_eq!(ids, vec![Value::Int(5), Value::Int(6), Value::Int(7)]);

    let mixed = template("UPDATE zoo SET value = ? WHERE type = :type")
        .execute(&client)
        .await
        .unwrap_err();
    assert!(matches!(mixed, TplError::MixedPlaceholders { .. }));

    let updated = template("UPDATE zoo SET value = :value WHERE type = :type")
        .bind_named("value", Value::Literal("upper(value)".into()))
        .bind_named("type", "mammal")
        .execute(&client)
        .await?;
    assert_eq!(updated, 2);

    let rhino = template("SELECT value FROM zoo WHERE value = ?")
        .bind("RHINO")
        .fetch_opt(&client)
        .await?;
    assert!(rhino.is_some());
    Ok(())
}

#[tokio::test]
async fn decodes_numeric_and_other_column_types() -> TplResult<()> {
    let Some(client) = connect("decodes_numeric_and_other_column_types").await? else {
        return Ok(());
    };

    let row = template(
        r"SELECT sum(id)::numeric AS total, avg(id)::numeric(10,2) AS mean,
                 '\x0102'::bytea AS raw, interval '1 day 02:00:00' AS gap,
                 inet '10.0.0.1' AS addr, cidr '10.0.0.0/8' AS net, NULL::numeric AS nothing
          FROM zoo",
    )
    .fetch_opt(&client)
    .await?
    .expect("aggregate returns one row");

    assert_eq!(row.get("total"), Some(&Value::from("28")));
    assert_eq!(row.get("mean"), Some(&Value::from("5.60")));
    assert_eq!(row.get("raw"), Some(&Value::from(r"\x0102")));
    assert_eq!(row.get("gap"), Some(&Value::from("1 day 02:00:00")));
    assert_eq!(row.get("addr"), Some(&Value::from("10.0.0.1")));
    assert_eq!(row.get("net"), Some(&Value::from("10.0.0.0/8")));
    assert_eq!(row.get("nothing"), Some(&Value::Null));
    Ok(())
}

#[tokio::test]
async fn binds_to_numeric_and_temporal_parameters() -> TplResult<()> {
    let Some(client) = connect("binds_to_numeric_and_temporal_parameters").await? else {
        return Ok(());
    };

    let count = template("SELECT count(*) FROM zoo WHERE id::numeric = ?")
        .bind(5)
        .fetch_scalar(&client)
        .await?;
    assert_eq!(count, Some(Value::Int(3)));

    let count = template("SELECT count(*) FROM zoo WHERE id::numeric > ?")
        .bind(5.5)
        .fetch_scalar(&client)
        .await?;
    assert_eq!(count, Some(Value::Int(2)));

    let next = template("SELECT ?::date + 1")
        .bind("2024-02-28")
        .fetch_scalar(&client)
        .await?;
    assert_eq!(next, Some(Value::from("2024-02-29")));

    let err = template("SELECT ?::uuid")
        .bind(5)
        .fetch_scalar(&client)
        .await
        .unwrap_err();
    assert!(matches!(err, TplError::Query(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn runs_inside_a_transaction() -> TplResult<()> {
    let Some(mut client) = connect("runs_inside_a_transaction").await? else {
        return Ok(());
    };

    let tx = client.transaction().await?;
    let deleted = template("DELETE FROM zoo WHERE id = ?")
        .bind(7)
        .execute(&tx)
        .await?;
    assert_eq!(deleted, 1);
    tx.rollback().await?;

    let left = template("SELECT count(*) FROM zoo").fetch_scalar(&client).await?;
    assert_eq!(left, Some(Value::Int(5)));
    Ok(())
}

#[tokio::test]
async fn driver_errors_carry_debug_sql() -> TplResult<()> {
    let Some(client) = connect("driver_errors_carry_debug_sql").await? else {
        return Ok(());
    };

    let err = template("SELECT * FROM zoo WHERE id = :id AND nope = :kind")
        .bind_named("id", 5)
        .bind_named("kind", "fruit")
        .fetch_all(&client)
        .await
        .unwrap_err();

    let TplError::Driver {
        error,
        debug_sql,
        params,
    } = err
    else {
        panic!("expected a driver error, got {err:?}");
    };
    assert_eq!(error.sql_state.as_deref(), Some("42703"));
    assert!(error.message.contains("nope"));
    assert!(debug_sql.contains("<span class=\"sql-error\">nope</span>"));
    assert!(debug_sql.contains("<abbr title=\":kind\">'fruit'</abbr>"));
    assert_eq!(params.len(), 2);
    Ok(())
}

#[tokio::test]
async fn handler_can_recover() -> TplResult<()> {
    let Some(client) = connect("handler_can_recover").await? else {
        return Ok(());
    };

    let rows = template("SELECT * FROM no_such_table WHERE id = ?")
        .bind(1)
        .on_error(|e: &DriverError, _: &str| {
            if e.sql_state.as_deref() == Some("42P01") {
                ErrorAction::Recover
            } else {
                ErrorAction::Propagate
            }
        })
        .fetch_all(&client)
        .await?;
    assert!(rows.is_empty());

    let affected = template("DELETE FROM no_such_table")
        .on_error(|_: &DriverError, _: &str| ErrorAction::Recover)
        .execute(&client)
        .await?;
    assert_eq!(affected, 0);
    Ok(())
}
