//! Callback-driven iteration over cursors, result sets and series.
//!
//! Each helper pulls until the end of the stream and propagates the first
//! error. A callback ends iteration early, without error, by returning
//! `Ok(ControlFlow::Break(()))`.

use std::io::Read;
use std::ops::ControlFlow;

use crate::cursor::{Cursor, ResultSet, Row, Series};
use crate::error::Result;

/// Call `f` for every result set in the cursor.
pub fn for_each_result<R, F>(cursor: &mut Cursor<R>, mut f: F) -> Result<()>
where
    R: Read,
    F: FnMut(&mut ResultSet<'_, R>) -> Result<ControlFlow<()>>,
{
    while let Some(mut result) = cursor.next_result_set()? {
        if f(&mut result)?.is_break() {
            break;
        }
    }
    Ok(())
}

/// Call `f` for every series in the result set.
pub fn for_each_series<R, F>(result: &mut ResultSet<'_, R>, mut f: F) -> Result<()>
where
    R: Read,
    F: FnMut(&mut Series<'_, R>) -> Result<ControlFlow<()>>,
{
    while let Some(mut series) = result.next_series()? {
        if f(&mut series)?.is_break() {
            break;
        }
    }
    Ok(())
}

/// Call `f` for every row in the series.
pub fn for_each_row<R, F>(series: &mut Series<'_, R>, mut f: F) -> Result<()>
where
    R: Read,
    F: FnMut(Row) -> Result<ControlFlow<()>>,
{
    while let Some(row) = series.next_row()? {
        if f(row)?.is_break() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const TWO_STATEMENTS: &str = r#"{"results":[
        {"statement_id":0,"series":[
            {"name":"cpu","tags":{"host":"a"},"columns":["time","value"],"values":[[1,1],[2,2]]},
            {"name":"cpu","tags":{"host":"b"},"columns":["time","value"],"values":[[3,3]]}
        ]},
        {"statement_id":1,"series":[
            {"name":"mem","columns":["time","value"],"values":[[4,4]]}
        ]}
    ]}"#;

    fn cursor(body: &str) -> Cursor<&[u8]> {
        Cursor::new(body.as_bytes(), "json").unwrap()
    }

    #[test]
    fn test_visits_everything() {
        let mut cur = cursor(TWO_STATEMENTS);
        let mut seen = Vec::new();

        for_each_result(&mut cur, |result| {
            for_each_series(result, |series| {
                let name = series.name().to_string();
                for_each_row(series, |row| {
                    seen.push((name.clone(), row.value(1).and_then(|v| v.as_f64())));
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(ControlFlow::Continue(()))
            })?;
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                ("cpu".to_string(), Some(1.0)),
                ("cpu".to_string(), Some(2.0)),
                ("cpu".to_string(), Some(3.0)),
                ("mem".to_string(), Some(4.0)),
            ]
        );
    }

    #[test]
    fn test_break_is_not_an_error() {
        let mut cur = cursor(TWO_STATEMENTS);
        let mut statements = Vec::new();
        for_each_result(&mut cur, |result| {
            statements.push(result.statement_id());
            Ok(ControlFlow::Break(()))
        })
        .unwrap();
        assert_eq!(statements, vec![Some(0)]);

        // The cursor can still be advanced past the abandoned result.
        let next = cur.next_result_set().unwrap().unwrap();
        assert_eq!(next.statement_id(), Some(1));
    }

    #[test]
    fn test_break_in_row_callback() {
        let mut cur = cursor(TWO_STATEMENTS);
        let mut result = cur.next_result_set().unwrap().unwrap();
        let mut series = result.next_series().unwrap().unwrap();
        let mut rows = 0;
        for_each_row(&mut series, |_| {
            rows += 1;
            Ok(ControlFlow::Break(()))
        })
        .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_callback_error_propagates() {
        let mut cur = cursor(TWO_STATEMENTS);
        let err = for_each_result(&mut cur, |_| Err(Error::NoFields)).unwrap_err();
        assert!(matches!(err, Error::NoFields));
    }

    #[test]
    fn test_stream_error_propagates() {
        let mut cur = cursor(r#"{"results":[{"error":"boom"}]}"#);
        let err = for_each_result(&mut cur, |_| Ok(ControlFlow::Continue(()))).unwrap_err();
        assert!(matches!(err, Error::QueryError { message } if message == "boom"));
    }
}
