//! Bounded retry for kernel tables that can grow between a size query and a read.

use tracing::debug;

/// Outcome of reading a table into a buffer sized by a previous query.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRead<T> {
    /// The table fit; these are its entries.
    Complete(Vec<T>),
    /// The table now holds more entries than the capacity queried before.
    Grew { reported: usize },
}

/// Reads a resizable table with at most `max_attempts` query/read rounds.
///
/// `query_len` returns the current number of entries; `read` then reads the
/// table for that capacity. If the table grew in between, the whole round is
/// repeated. Returns `Ok(None)` once the attempts are exhausted.
pub fn read_resizable_table<T, E>(
    max_attempts: usize,
    mut query_len: impl FnMut() -> Result<usize, E>,
    mut read: impl FnMut(usize) -> Result<TableRead<T>, E>,
) -> Result<Option<Vec<T>>, E> {
    for attempt in 1..=max_attempts {
        let capacity = query_len()?;
        match read(capacity)? {
            TableRead::Complete(entries) => return Ok(Some(entries)),
            TableRead::Grew { reported } => {
                debug!(
                    attempt,
                    capacity, reported, "table resized between size query and read, retrying"
                );
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_table_reads_once() {
        let mut queries = 0;
        let result: Result<_, ()> = read_resizable_table(
            3,
            || {
                queries += 1;
                Ok(2)
            },
            |cap| Ok(TableRead::Complete(vec![0u8; cap])),
        );

        assert_eq!(result.unwrap(), Some(vec![0, 0]));
        assert_eq!(queries, 1);
    }

    #[test]
    fn test_growing_table_retries_then_succeeds() {
        let mut sizes = vec![1usize, 2, 2].into_iter();
        let mut reads = 0;
        let result: Result<_, ()> = read_resizable_table(
            3,
            || Ok(sizes.next().unwrap_or(2)),
            |cap| {
                reads += 1;
                if reads == 1 {
                    Ok(TableRead::Grew { reported: cap + 1 })
                } else {
                    Ok(TableRead::Complete(vec![7u32; cap]))
                }
            },
        );

        assert_eq!(result.unwrap(), Some(vec![7, 7]));
        assert_eq!(reads, 2);
    }

    #[test]
    fn test_retry_budget_is_bounded() {
        let mut reads = 0;
        let result: Result<Option<Vec<u8>>, ()> = read_resizable_table(
            3,
            || Ok(1),
            |cap| {
                reads += 1;
                Ok(TableRead::Grew { reported: cap + 1 })
            },
        );

        assert_eq!(result.unwrap(), None);
        assert_eq!(reads, 3);
    }

    #[test]
    fn test_query_error_propagates() {
        let result: Result<Option<Vec<u8>>, &str> =
            read_resizable_table(3, || Err("no table"), |_| unreachable!());
        assert_eq!(result.unwrap_err(), "no table");
    }
}
