//! Bridge from callback streams to `futures::Stream`.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::{Stream, StreamExt};

use super::stream::Observable;
use super::subscription::Subscription;

/// An [`Observable`] consumed as an async stream.
///
/// Values are buffered without bound; the underlying subscription is released
/// when the stream is dropped.
#[derive(Debug)]
pub struct ObservableStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    _subscription: Subscription,
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Consume the observable as a `futures::Stream`.
    ///
    /// Replaying sources deliver their current value before this returns, so
    /// the first `next().await` resolves immediately.
    pub fn into_stream(self) -> ObservableStream<T> {
        let (sender, receiver) = mpsc::unbounded();
        let subscription = self.subscribe(move |value: &T| {
            // Receiver gone means the stream was dropped mid-delivery.
            let _ = sender.unbounded_send(value.clone());
        });
        ObservableStream {
            receiver,
            _subscription: subscription,
        }
    }
}

impl<T> Stream for ObservableStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::subject::ValueSubject;

    #[tokio::test]
    async fn test_stream_yields_replay_then_updates() {
        let subject = ValueSubject::new(1);
        let mut stream = subject.observe().into_stream();
        assert_eq!(stream.next().await, Some(1));

        subject.publish(2);
        subject.publish(3);
        assert_eq!(stream.next().await, Some(2));
        assert_eq!(stream.next().await, Some(3));
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let subject = ValueSubject::new(0);
        let stream = subject.observe().into_stream();
        assert_eq!(subject.observer_count(), 1);
        drop(stream);
        assert_eq!(subject.observer_count(), 0);
    }
}
