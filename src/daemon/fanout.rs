use futures::future::{join_all, BoxFuture};

pub type Task<'a> = (&'static str, BoxFuture<'a, anyhow::Result<()>>);

/// Outcome of a tolerant fan-out: every task ran to completion.
#[derive(Debug, Default)]
pub struct Settled {
    pub succeeded: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

impl Settled {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs all tasks concurrently and waits for every one of them. Failures
/// are logged and collected, never propagated.
pub async fn settle_all(label: &str, tasks: Vec<Task<'_>>) -> Settled {
    let (names, futures): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
    let results = join_all(futures).await;

    let mut settled = Settled::default();
    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(()) => settled.succeeded.push(name),
            Err(e) => {
                tracing::debug!(refresh = label, task = name, error = %e, "Refresh task failed");
                settled.failed.push((name, format!("{:#}", e)));
            }
        }
    }

    if !settled.all_ok() {
        tracing::warn!(
            refresh = label,
            failed = settled.failed.len(),
            succeeded = settled.succeeded.len(),
            errors = ?settled.failed,
            "Data refresh finished with errors"
        );
    }

    settled
}
