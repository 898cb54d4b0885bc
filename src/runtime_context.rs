
use std::sync::Arc;

use crate::runtime_config::RuntimeConfig;
use crate::slack_client::{SlackApi, SlackClient};

pub struct RuntimeContext {
    config: RuntimeConfig,
    slack: Arc<dyn SlackApi>,
}

impl RuntimeContext {
    pub fn new(config: RuntimeConfig) -> Arc<Self> {
        let slack = SlackClient::new(&config);
        Self::with_slack(config, slack)
    }

    pub fn with_slack(config: RuntimeConfig, slack: Arc<dyn SlackApi>) -> Arc<Self> {
        let context = Self {
            config,
            slack,
        };
        Arc::new(context)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn slack(&self) -> &dyn SlackApi {
        self.slack.as_ref()
    }
}
