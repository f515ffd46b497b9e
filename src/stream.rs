use actix_web::web::Bytes;
use futures_core::Stream;
use streem::IntoStreamer;

pub(crate) fn map_err<S, T, E1, E2, F>(stream: S, f: F) -> impl Stream<Item = Result<T, E2>>
where
    S: Stream<Item = Result<T, E1>>,
    T: 'static,
    E2: 'static,
    F: Fn(E1) -> E2 + Copy,
{
    streem::from_fn(move |yielder| async move {
        let stream = std::pin::pin!(stream);
        let mut streamer = stream.into_streamer();

        while let Some(res) = streamer.next().await {
            tracing::trace!("map_err: looping");

            yielder.yield_(res.map_err(f)).await;
        }
    })
}

/// Adapt a multipart field into the byte stream staging expects
pub(crate) fn form_field<S>(stream: S) -> impl Stream<Item = std::io::Result<Bytes>>
where
    S: Stream<Item = Result<Bytes, actix_form_data::Error>>,
{
    map_err(stream, |e| {
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use streem::IntoStreamer;

    #[derive(Debug, PartialEq)]
    struct Truncated;

    #[tokio::test]
    async fn map_err_only_touches_errors() {
        let source = streem::from_fn(|yielder| async move {
            yielder.yield_ok(1u8).await;
            yielder.yield_err(Truncated).await;
            yielder.yield_ok(2u8).await;
        });

        let stream = std::pin::pin!(super::map_err(source, |Truncated| "truncated"));
        let mut streamer = stream.into_streamer();

        assert_eq!(streamer.next().await, Some(Ok(1)));
        assert_eq!(streamer.next().await, Some(Err("truncated")));
        assert_eq!(streamer.next().await, Some(Ok(2)));
        assert_eq!(streamer.next().await, None);
    }
}
