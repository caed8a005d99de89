// Long-polling event loop

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::state::AppState;
use crate::handlers::dispatch::process_event;
use crate::transport::telegram::{to_event, TelegramClient};

/// Pause before retrying after a failed poll
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Poll for updates forever, handling events one at a time in arrival order
pub async fn run_polling(state: Arc<AppState>, client: Arc<TelegramClient>) {
    let mut offset: Option<i64> = None;

    info!("Polling for updates");

    loop {
        let updates = match client.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, retry_secs = RETRY_DELAY.as_secs(), "getUpdates failed");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);

            match to_event(&update) {
                Some(event) => process_event(&state, event).await,
                None => debug!(update_id = update.update_id, "Ignoring unsupported update"),
            }
        }
    }
}
