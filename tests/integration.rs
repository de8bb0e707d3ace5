//! Integration tests for influxdb-codec.
//!
//! These tests require a running InfluxDB 1.x instance.
//! Start one with: `docker run -p 8086:8086 influxdb:1.8`
//!
//! Run tests with: `cargo test --test integration`

use std::ops::ControlFlow;
use std::time::Duration;

use influxdb_codec::{
    Client, Error, Point, Precision, QueryCursor, QueryOptions, Value, WriteOptions,
    for_each_result, for_each_row, for_each_series,
};
use serial_test::serial;

// Test configuration
const INFLUXDB_URL: &str = "http://localhost:8086";
const INFLUXDB_DB: &str = "influxdb_codec_test";

/// Helper to check if InfluxDB is available
async fn influxdb_available(client: &Client) -> bool {
    tokio::time::timeout(Duration::from_secs(2), client.ping())
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

/// Connect and recreate the test database, or `None` to skip the test.
async fn setup() -> Option<Client> {
    let client = Client::new(INFLUXDB_URL).unwrap();
    if !influxdb_available(&client).await {
        eprintln!("Skipping test: InfluxDB not available");
        return None;
    }

    let opts = QueryOptions::default();
    client
        .execute(&format!("DROP DATABASE {}", INFLUXDB_DB), &opts)
        .await
        .unwrap();
    client
        .execute(&format!("CREATE DATABASE {}", INFLUXDB_DB), &opts)
        .await
        .unwrap();
    Some(client)
}

/// Generate N points, one second apart
fn generate_points(measurement: &str, count: usize) -> Vec<Point> {
    let base_ts = 1_700_000_000_000_000_000i64; // 2023-11-14
    (0..count)
        .map(|i| {
            Point::new(measurement)
                .tag("host", format!("server{}", i % 10))
                .tag("region", "us-east")
                .field("value", i as f64 / 4.0)
                .field("seq", i as i64)
                .timestamp(base_ts + i as i64 * 1_000_000_000)
        })
        .collect()
}

/// Count every row of every series, on a blocking thread.
async fn count_rows(mut cursor: QueryCursor) -> influxdb_codec::Result<usize> {
    tokio::task::spawn_blocking(move || {
        let mut rows = 0;
        for_each_result(&mut cursor, |result| {
            for_each_series(result, |series| {
                for_each_row(series, |_| {
                    rows += 1;
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(ControlFlow::Continue(()))
            })?;
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(rows)
    })
    .await
    .unwrap()
}

// ============================================================================
// Basic Integration Tests
// ============================================================================

#[tokio::test]
#[serial]
async fn test_ping() {
    let client = Client::new(INFLUXDB_URL).unwrap();
    if !influxdb_available(&client).await {
        eprintln!("Skipping test: InfluxDB not available");
        return;
    }

    let info = client.ping().await.unwrap();
    assert!(info.version.is_some());
}

#[tokio::test]
#[serial]
async fn test_write_and_query() {
    let Some(client) = setup().await else {
        return;
    };

    client
        .write(
            &generate_points("temperature", 100),
            &WriteOptions::database(INFLUXDB_DB),
        )
        .await
        .unwrap();

    let cursor = client
        .query(
            "SELECT * FROM temperature",
            &QueryOptions::database(INFLUXDB_DB),
        )
        .await
        .unwrap();
    assert_eq!(count_rows(cursor).await.unwrap(), 100);
}

#[tokio::test]
#[serial]
async fn test_chunked_query_by_series() {
    let Some(client) = setup().await else {
        return;
    };

    client
        .write(
            &generate_points("cpu", 1_000),
            &WriteOptions {
                precision: Precision::Second,
                ..WriteOptions::database(INFLUXDB_DB)
            },
        )
        .await
        .unwrap();

    let mut cursor = client
        .query(
            "SELECT value, seq FROM cpu GROUP BY host",
            &QueryOptions::database(INFLUXDB_DB).chunked(7),
        )
        .await
        .unwrap();

    let series = tokio::task::spawn_blocking(move || -> influxdb_codec::Result<Vec<(String, usize)>> {
        let mut seen = Vec::new();
        let mut result = cursor.next_result_set()?.expect("one result");
        assert_eq!(result.columns(), ["time", "value", "seq"]);

        while let Some(mut series) = result.next_series()? {
            let host = series.tags()[0].value.clone();
            let mut last = None;
            while let Some(row) = series.next_row()? {
                let time = row.time().expect("time column");
                assert!(last.is_none_or(|prev| prev < time));
                last = Some(time);
            }
            let (len, complete) = series.len();
            assert!(complete);
            seen.push((host, len));
        }
        drop(result);
        assert!(cursor.next_result_set()?.is_none());
        Ok(seen)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(series.len(), 10);
    assert!(series.iter().all(|(_, len)| *len == 100));
}

#[tokio::test]
#[serial]
async fn test_empty_result() {
    let Some(client) = setup().await else {
        return;
    };

    let mut cursor = client
        .query(
            "SELECT * FROM nonexistent",
            &QueryOptions::database(INFLUXDB_DB),
        )
        .await
        .unwrap();

    let no_series = tokio::task::spawn_blocking(move || -> influxdb_codec::Result<bool> {
        let mut result = cursor.next_result_set()?.expect("one result");
        Ok(result.next_series()?.is_none())
    })
    .await
    .unwrap()
    .unwrap();
    assert!(no_series);
}

#[tokio::test]
#[serial]
async fn test_multiple_statements() {
    let Some(client) = setup().await else {
        return;
    };

    client
        .write(
            &[
                Point::value("a", 1).timestamp(1_000_000_000),
                Point::value("b", "text").timestamp(2_000_000_000),
            ],
            &WriteOptions::database(INFLUXDB_DB),
        )
        .await
        .unwrap();

    let mut cursor = client
        .query(
            "SELECT value FROM a; SELECT value FROM b",
            &QueryOptions::database(INFLUXDB_DB),
        )
        .await
        .unwrap();

    let values = tokio::task::spawn_blocking(move || -> influxdb_codec::Result<Vec<Value>> {
        let mut values = Vec::new();
        while let Some(mut result) = cursor.next_result_set()? {
            while let Some(mut series) = result.next_series()? {
                while let Some(row) = series.next_row()? {
                    values.extend(row.value_by_name("value").cloned());
                }
            }
        }
        Ok(values)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(values, vec![Value::from(1.0), Value::from("text")]);
}

#[tokio::test]
#[serial]
async fn test_bound_parameters() {
    let Some(client) = setup().await else {
        return;
    };

    client
        .write(
            &generate_points("params", 20),
            &WriteOptions::database(INFLUXDB_DB),
        )
        .await
        .unwrap();

    let cursor = client
        .query(
            "SELECT value FROM params WHERE host = $host",
            &QueryOptions::database(INFLUXDB_DB).param("host", "server3"),
        )
        .await
        .unwrap();
    assert_eq!(count_rows(cursor).await.unwrap(), 2);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
#[serial]
async fn test_invalid_query() {
    let client = Client::new(INFLUXDB_URL).unwrap();
    if !influxdb_available(&client).await {
        eprintln!("Skipping test: InfluxDB not available");
        return;
    }

    let result = client
        .query("SELEKT nonsense", &QueryOptions::database(INFLUXDB_DB))
        .await;
    assert!(matches!(result, Err(Error::Server { status: 400, .. })));
}

#[tokio::test]
#[serial]
async fn test_statement_error() {
    let Some(client) = setup().await else {
        return;
    };

    let mut cursor = client
        .query(
            "SELECT * FROM cpu",
            &QueryOptions::database("influxdb_codec_missing"),
        )
        .await
        .unwrap();

    let err = tokio::task::spawn_blocking(move || cursor.next_result_set().map(|r| r.is_some()))
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.is_query_error());
}

#[tokio::test]
#[serial]
async fn test_write_rejected() {
    let Some(client) = setup().await else {
        return;
    };

    let result = client
        .write(
            &[Point::value("cpu", 1)],
            &WriteOptions::database("influxdb_codec_missing"),
        )
        .await;
    assert!(matches!(result, Err(Error::Server { status: 404, .. })));
}
