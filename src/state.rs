use std::sync::Arc;

use crate::middleware::webhook_auth::AuthChain;
use crate::modules::transcode::notification::NotificationDispatcher;
use crate::modules::transcode::service::TranscodeService;
use crate::modules::transcode::store::VideoStore;

#[derive(Clone)]
pub struct AppState {
    pub transcode: TranscodeService,
    pub dispatcher: NotificationDispatcher,
    pub webhook_auth: AuthChain,
}

impl AppState {
    pub fn new(
        store: Arc<dyn VideoStore>,
        dispatcher: NotificationDispatcher,
        webhook_auth: AuthChain,
    ) -> Self {
        Self {
            transcode: TranscodeService::new(store),
            dispatcher,
            webhook_auth,
        }
    }
}
