use colored::Colorize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::utils::log_status;

/// Print a status line each time the session goes busy. The task ends when
/// the session store is dropped.
pub fn spawn_loading_indicator(mut loading: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while loading.changed().await.is_ok() {
            let busy = *loading.borrow_and_update();
            if busy {
                log_status("… working".dimmed());
            }
        }
    })
}
