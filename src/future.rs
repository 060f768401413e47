use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::{Duration, Instant},
};

pub(crate) trait WithTimeout: Future + Sized {
    fn with_timeout(self, duration: Duration) -> tokio::time::Timeout<Self> {
        tokio::time::timeout(duration, self)
    }
}

/// Records how long a future was alive under the histogram `name`
///
/// Futures dropped before finishing are recorded with `completed = "false"`, so cancelled
/// requests still show up in the timings.
pub(crate) trait WithMetrics: Future + Sized {
    fn with_metrics(self, name: &'static str) -> Measured<Self> {
        Measured {
            future: self,
            timing: Timing {
                name,
                start: Instant::now(),
                completed: false,
            },
        }
    }
}

impl<F: Future> WithTimeout for F {}
impl<F: Future> WithMetrics for F {}

pin_project_lite::pin_project! {
    pub(crate) struct Measured<F> {
        #[pin]
        future: F,
        timing: Timing,
    }
}

struct Timing {
    name: &'static str,
    start: Instant,
    completed: bool,
}

impl<F: Future> Future for Measured<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let out = std::task::ready!(this.future.poll(cx));
        this.timing.completed = true;

        Poll::Ready(out)
    }
}

impl Drop for Timing {
    fn drop(&mut self) {
        metrics::histogram!(self.name, "completed" => self.completed.to_string())
            .record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{WithMetrics, WithTimeout};

    #[tokio::test]
    async fn measured_future_passes_output_through() {
        let out = async { 5 }.with_metrics("tubely.test").await;

        assert_eq!(out, 5);
    }

    #[tokio::test]
    async fn slow_future_times_out() {
        let res = tokio::time::sleep(Duration::from_secs(5))
            .with_timeout(Duration::from_millis(10))
            .await;

        assert!(res.is_err());
    }
}
