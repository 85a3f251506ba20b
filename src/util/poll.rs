use std::{
    future::Future,
    task::{Context, Poll},
    thread,
    time::Duration,
};

use futures::task::noop_waker_ref;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Drives `future` to completion on the calling thread.
///
/// SDK futures do their I/O on the ambient tokio runtime, so a thread that is
/// not already inside one must enter a runtime handle before calling this.
pub fn poll_until_ready<Fut>(future: Fut) -> Fut::Output
where
    Fut: Future,
{
    let mut future = Box::pin(future);
    let mut context = Context::from_waker(noop_waker_ref());

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(result) => {
                return result;
            }
            Poll::Pending => {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}
