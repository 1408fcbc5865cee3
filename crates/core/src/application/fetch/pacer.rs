// Pacer - serializes politeness waits across fetch workers

use std::time::Duration;
use tokio::sync::Mutex;

/// Shared pacing clock.
///
/// A worker holds the gate for the whole of its wait, so concurrent waits run
/// back to back and the aggregate request rate follows the delay schedule.
/// Not a correctness lock: nothing else is guarded by it.
#[derive(Debug, Default)]
pub struct Pacer {
    gate: Mutex<()>,
}

impl Pacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn wait(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        let _turn = self.gate.lock().await;
        tokio::time::sleep(delay).await;
    }
}
