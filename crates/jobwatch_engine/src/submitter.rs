use std::sync::Arc;

use jobwatch_core::{Generation, JobRequest, JobSubmitter, Msg};
use tokio::sync::mpsc::UnboundedSender;

use crate::client::JobService;

/// Runs each submission on its own task and reports back through the session channel.
pub struct SpawningSubmitter {
    service: Arc<dyn JobService>,
    runtime: tokio::runtime::Handle,
    msg_tx: UnboundedSender<Msg>,
}

impl SpawningSubmitter {
    pub fn new(
        service: Arc<dyn JobService>,
        runtime: tokio::runtime::Handle,
        msg_tx: UnboundedSender<Msg>,
    ) -> Self {
        Self {
            service,
            runtime,
            msg_tx,
        }
    }
}

impl JobSubmitter for SpawningSubmitter {
    fn submit(&mut self, generation: Generation, request: JobRequest) {
        let service = self.service.clone();
        let msg_tx = self.msg_tx.clone();
        self.runtime.spawn(async move {
            let result = service.start_job(&request).await;
            let _ = msg_tx.send(Msg::SubmissionResolved { generation, result });
        });
    }
}
