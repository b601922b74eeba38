//! Observable streams and the subjects behind properties.
//!
//! Everything here is push-based and synchronous: publishing on a subject
//! calls each observer on the publishing thread before returning. Async
//! consumers can turn any [`Observable`] into a `futures::Stream` with
//! [`Observable::into_stream`].

mod bridge;
mod stream;
pub(crate) mod subject;
mod subscription;

pub use bridge::ObservableStream;
pub use stream::{Observable, Observer};
pub use subscription::Subscription;
