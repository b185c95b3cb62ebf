//! Asynchronous CSV reader with batch interface
//!
//! Provides batch reading over journal requests for the async pipeline.
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of RequestRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::RequestRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous journal reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 0,
        }
    }

    /// Read up to `batch_size` requests
    ///
    /// Rows that fail to parse or convert are logged and skipped, so a batch
    /// may be shorter than `batch_size` before the end of the file. An empty
    /// batch means the file is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<RequestRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(row) = records.next().await else {
                break;
            };
            self.line_num += 1;
            let line = self.line_num + 1;

            match row {
                Ok(csv_record) => match convert_csv_record(csv_record) {
                    Ok(request) => batch.push(request),
                    Err(e) => warn!(line, error = %e, "skipping request"),
                },
                Err(e) => warn!(line, error = %e, "skipping malformed CSV row"),
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    const HEADER: &str = "type,account,card,code,listing,quantity,amount,key\n";

    fn reader(rows: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        AsyncReader::new(Cursor::new(format!("{}{}", HEADER, rows).into_bytes()))
    }

    #[tokio::test]
    async fn test_async_reader_multiple_batches() {
        let mut reader = reader(
            "top_up,1,1,1111,,,10,\n\
             top_up,2,2,2222,,,20,\n\
             order,1,1,1111,5,1,,\n\
             remove,3,,3333,6,,,\n\
             reactivate,3,,3333,6,,,\n",
        );

        let first = reader.read_batch(2).await;
        let second = reader.read_batch(2).await;
        let third = reader.read_batch(2).await;
        let fourth = reader.read_batch(2).await;

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].account(), 1);
        assert_eq!(first[1].account(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(third.len(), 1);
        assert!(fourth.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut reader = reader("");
        assert!(reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let mut reader = reader(
            "refund,1,1,1111,,,10,\n\
             order,1,1,1111,5,,,\n\
             order,oops,1,1111,5,1,,\n\
             top_up,1,1,1111,,,10,\n",
        );

        let batch = reader.read_batch(10).await;

        assert_eq!(batch.len(), 1);
        assert!(matches!(batch[0], RequestRecord::TopUp { .. }));
    }
}
