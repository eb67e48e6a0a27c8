use futures_core::ready;
use futures_core::stream::Stream;
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Extension trait with stream adapters used around Stores.
pub trait StoreStreamExt: Stream {
    /// Yields items until one satisfies `test`, yields that item too, then ends.
    ///
    /// Handy for awaiting a state transition:
    ///
    /// ```
    /// use futures::StreamExt;
    /// use storerx::StoreStreamExt;
    ///
    /// # futures::executor::block_on(async {
    /// let seen: Vec<i32> = futures::stream::iter(0..10)
    ///     .stop_if(|value| *value >= 3)
    ///     .collect()
    ///     .await;
    /// assert_eq!(seen, vec![0, 1, 2, 3]);
    /// # });
    /// ```
    fn stop_if<F>(self, test: F) -> StopIf<Self, F>
    where
        F: FnMut(&Self::Item) -> bool,
        Self: Sized,
    {
        StopIf {
            stream: self,
            test: Some(test),
        }
    }
}

impl<T: ?Sized> StoreStreamExt for T where T: Stream {}

/// Stream returned by [`StoreStreamExt::stop_if`].
///
/// `test` is taken once the matching item has been yielded, which marks the end.
#[pin_project]
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct StopIf<S, F> {
    #[pin]
    stream: S,
    test: Option<F>,
}

impl<S, F> Stream for StopIf<S, F>
where
    S: Stream,
    F: FnMut(&S::Item) -> bool,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let Some(test) = this.test.as_mut() else {
            return Poll::Ready(None);
        };

        let item = ready!(this.stream.poll_next(cx));
        match &item {
            Some(value) if !test(value) => {}
            _ => *this.test = None,
        }
        Poll::Ready(item)
    }
}
