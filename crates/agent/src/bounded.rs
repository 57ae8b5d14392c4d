use std::future::Future;
use std::time::Duration;

use orderbot_core::store::StoreError;

/// Runs one store call under a deadline. An elapsed deadline drops the call
/// and reports [`StoreError::Timeout`].
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use orderbot_core::store::StoreError;

    use super::bounded;

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let result: Result<(), StoreError> = bounded("list_menu_items", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result,
            Err(StoreError::Timeout { operation: "list_menu_items", timeout_ms: 50 })
        );
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let result = bounded("lookup_client", Duration::from_millis(50), async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
