use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics::MetricsRegistry;
use crate::resources::probe::ResourceProbe;
use crate::resources::{ResourceSnapshot, SamplingError};

/// Owns the background sampling task. [`SamplerHandle::shutdown`] stops and
/// joins it; dropping the handle stops it at the next wake-up without joining.
pub struct SamplerHandle {
    stop: watch::Sender<bool>,
    latest: watch::Receiver<Option<ResourceSnapshot>>,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    pub fn latest(&self) -> watch::Receiver<Option<ResourceSnapshot>> {
        self.latest.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            warn!("resource sampler task ended abnormally: {err}");
        }
        info!("resource sampler stopped");
    }
}

/// Samples `probe` every `interval` and writes each reading into `registry`.
/// A failed read is logged and counted; the loop carries on with the next tick.
pub fn spawn_sampler<P>(probe: P, registry: MetricsRegistry, interval: Duration) -> SamplerHandle
where
    P: ResourceProbe + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let (latest_tx, latest_rx) = watch::channel(None);
    let probe = Arc::new(Mutex::new(probe));
    let period = interval.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("resource sampler running every {period:?}");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_rx.changed() => break,
            }

            match sample_once(Arc::clone(&probe)).await {
                Ok(snapshot) => {
                    debug!(
                        cpu = snapshot.cpu_percent,
                        memory = snapshot.memory_percent,
                        disk = snapshot.disk_percent,
                        "resource sample"
                    );
                    registry.record_resources(&snapshot);
                    latest_tx.send_replace(Some(snapshot));
                }
                Err(err) => {
                    registry.record_sampler_error();
                    warn!("skipping resource sample: {err}");
                }
            }
        }
    });

    SamplerHandle {
        stop: stop_tx,
        latest: latest_rx,
        task,
    }
}

async fn sample_once<P>(probe: Arc<Mutex<P>>) -> Result<ResourceSnapshot, SamplingError>
where
    P: ResourceProbe + 'static,
{
    // sysinfo reads procfs synchronously; keep that off the async workers.
    tokio::task::spawn_blocking(move || {
        let mut probe = probe
            .lock()
            .map_err(|_| SamplingError::Probe("probe lock poisoned".to_string()))?;
        probe.sample()
    })
    .await
    .map_err(|err| SamplingError::Probe(err.to_string()))?
}
