use tokio::sync::watch;

/// Single-flag readiness signal: cleared while the prefix cache is rebuilt, set afterwards.
pub struct ReadyGate {
    state: watch::Sender<bool>,
}

impl ReadyGate {
    /// Starts cleared; the service sets it once the first cache build finishes.
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self { state }
    }

    pub fn set(&self) {
        self.state.send_replace(true);
    }

    pub fn clear(&self) {
        self.state.send_replace(false);
    }

    pub fn is_ready(&self) -> bool {
        *self.state.borrow()
    }

    /// Wait until the gate is set. Returns immediately when it already is.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail while we're borrowed
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_blocks_until_set() {
        let gate = Arc::new(ReadyGate::new());
        assert!(!gate.is_ready());

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        gate.set();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish once the gate is set")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_returns_when_already_set() {
        let gate = ReadyGate::new();
        gate.set();
        tokio::time::timeout(Duration::from_millis(100), gate.wait())
            .await
            .unwrap();

        gate.clear();
        assert!(!gate.is_ready());
    }
}
