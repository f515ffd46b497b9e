use actix_web::web::Bytes;
use futures_core::Stream;
use std::path::Path;
use streem::IntoStreamer;
use tokio::io::AsyncWriteExt;

use crate::staging::StagingError;

pub(crate) struct File {
    inner: tokio::fs::File,
}

impl File {
    pub(crate) async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(File {
            inner: tokio::fs::File::open(path).await?,
        })
    }

    pub(crate) async fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(File {
            inner: tokio::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .await?,
        })
    }

    /// Copy `stream` into the file, failing once more than `limit` bytes have arrived
    ///
    /// Returns the number of bytes written.
    pub(crate) async fn write_from_stream<S>(
        &mut self,
        stream: S,
        limit: u64,
    ) -> Result<u64, StagingError>
    where
        S: Stream<Item = std::io::Result<Bytes>>,
    {
        let stream = std::pin::pin!(stream);
        let mut streamer = stream.into_streamer();

        let mut written: u64 = 0;

        while let Some(res) = streamer.next().await {
            tracing::trace!("write_from_stream: looping");

            let mut bytes = res.map_err(StagingError::Read)?;

            written += bytes.len() as u64;
            if written > limit {
                return Err(StagingError::TooLarge { limit });
            }

            self.inner
                .write_all_buf(&mut bytes)
                .await
                .map_err(StagingError::Write)?;
        }

        self.inner.flush().await.map_err(StagingError::Write)?;

        Ok(written)
    }

    /// Move the cursor back to the start so the contents can be read again
    #[cfg(test)]
    pub(crate) async fn rewind(&mut self) -> std::io::Result<()> {
        use tokio::io::AsyncSeekExt;

        self.inner.rewind().await.map(|_| ())
    }

    pub(crate) async fn close(self) -> std::io::Result<()> {
        self.inner.sync_all().await
    }

    pub(crate) fn into_inner(self) -> tokio::fs::File {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::File;
    use crate::staging::StagingError;
    use actix_web::web::Bytes;
    use tokio::io::AsyncReadExt;

    fn chunks(
        parts: &'static [&'static [u8]],
    ) -> impl futures_core::Stream<Item = std::io::Result<Bytes>> {
        streem::from_fn(move |yielder| async move {
            for part in parts {
                yielder.yield_(Ok(Bytes::from_static(part))).await;
            }
        })
    }

    #[tokio::test]
    async fn writes_whole_stream() {
        let dir = tempfile::tempdir().expect("Created tempdir");
        let path = dir.path().join("upload");

        let mut file = File::create(&path).await.expect("Created file");
        let written = file
            .write_from_stream(chunks(&[b"hello ", b"world"]), 1024)
            .await
            .expect("Wrote stream");
        assert_eq!(written, 11);

        file.close().await.expect("Closed");

        let mut contents = String::new();
        File::open(&path)
            .await
            .expect("Opened file")
            .into_inner()
            .read_to_string(&mut contents)
            .await
            .expect("Read file");

        assert_eq!(contents, "hello world");
    }

    #[tokio::test]
    async fn stops_past_limit() {
        let dir = tempfile::tempdir().expect("Created tempdir");
        let path = dir.path().join("upload");

        let mut file = File::create(&path).await.expect("Created file");
        let res = file
            .write_from_stream(chunks(&[b"12345", b"67890"]), 8)
            .await;

        assert!(matches!(res, Err(StagingError::TooLarge { limit: 8 })));
    }

    #[tokio::test]
    async fn rewind_rereads_from_start() {
        let dir = tempfile::tempdir().expect("Created tempdir");
        let path = dir.path().join("upload");

        let mut file = File::create(&path).await.expect("Created file");
        file.write_from_stream(chunks(&[b"abc"]), 1024)
            .await
            .expect("Wrote stream");

        file.rewind().await.expect("Rewound");

        let mut contents = Vec::new();
        file.into_inner()
            .read_to_end(&mut contents)
            .await
            .expect("Read file");

        assert_eq!(contents, b"abc");
    }
}
