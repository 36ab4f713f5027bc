//! Background duration probing for track loads.
//!
//! Each slot carries a monotonically increasing generation. A request
//! captures the generation current at submit time; a completion is only
//! worth committing while that generation is still current.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use media::{DurationProbe, MediaResource};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use timeline::{Track, TrackId};
use tracing::{debug, error};
use uuid::Uuid;

pub type Generation = u64;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("probe workers stopped")]
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProbeStatus {
    Ready(Track),
    Failed(String),
    /// A newer load for the same slot arrived before this one was probed.
    Superseded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeEvent {
    pub id: String,
    pub slot: TrackId,
    pub generation: Generation,
    pub status: ProbeStatus,
}

struct ProbeRequest {
    id: String,
    slot: TrackId,
    generation: Generation,
    resource: MediaResource,
}

type Generations = Arc<Mutex<[Generation; 2]>>;

pub struct TrackLoader {
    tx_submit: Sender<ProbeRequest>,
    rx_events: Receiver<ProbeEvent>,
    generations: Generations,
    pending: usize,
}

impl TrackLoader {
    pub fn start(probe: Arc<dyn DurationProbe>, num_workers: usize) -> Self {
        let (tx_submit, rx_submit) = unbounded::<ProbeRequest>();
        let (tx_events, rx_events) = unbounded::<ProbeEvent>();
        let generations: Generations = Arc::new(Mutex::new([0; 2]));

        for i in 0..num_workers.max(1) {
            let rx = rx_submit.clone();
            let tx = tx_events.clone();
            let probe = probe.clone();
            let generations = generations.clone();
            let spawned = thread::Builder::new()
                .name(format!("probe-{i}"))
                .spawn(move || worker_loop(rx, tx, probe, generations));
            if let Err(err) = spawned {
                error!("failed to spawn probe worker {i}: {err}");
            }
        }

        Self { tx_submit, rx_events, generations, pending: 0 }
    }

    /// Queue a probe for `slot`, superseding any earlier request for it.
    pub fn request(&mut self, slot: TrackId, resource: MediaResource) -> Result<Generation, LoaderError> {
        let generation = {
            let mut g = self.generations.lock();
            g[slot.index()] += 1;
            g[slot.index()]
        };
        let id = Uuid::new_v4().to_string();
        debug!(%slot, generation, %id, resource = %resource.name(), "probe requested");
        self.tx_submit
            .send(ProbeRequest { id, slot, generation, resource })
            .map_err(|_| LoaderError::Stopped)?;
        self.pending += 1;
        Ok(generation)
    }

    pub fn current_generation(&self, slot: TrackId) -> Generation { self.generations.lock()[slot.index()] }

    pub fn is_current(&self, slot: TrackId, generation: Generation) -> bool {
        self.current_generation(slot) == generation
    }

    /// Requests submitted whose completion has not been taken yet.
    pub fn pending(&self) -> usize { self.pending }

    pub fn try_next(&mut self) -> Option<ProbeEvent> {
        let ev = self.rx_events.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(ev)
    }

    pub fn next_timeout(&mut self, timeout: Duration) -> Result<Option<ProbeEvent>, LoaderError> {
        match self.rx_events.recv_timeout(timeout) {
            Ok(ev) => {
                self.pending = self.pending.saturating_sub(1);
                Ok(Some(ev))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(LoaderError::Stopped),
        }
    }

    /// Block until every submitted request has completed or `timeout` passes.
    pub fn wait_all(&mut self, timeout: Duration) -> Result<Vec<ProbeEvent>, LoaderError> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while self.pending > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() { break; }
            match self.next_timeout(left)? {
                Some(ev) => out.push(ev),
                None => break,
            }
        }
        Ok(out)
    }
}

fn worker_loop(rx: Receiver<ProbeRequest>, tx: Sender<ProbeEvent>, probe: Arc<dyn DurationProbe>, generations: Generations) {
    while let Ok(req) = rx.recv() {
        let ProbeRequest { id, slot, generation, resource } = req;
        if generations.lock()[slot.index()] != generation {
            debug!(%slot, generation, "skipping superseded probe");
            let _ = tx.send(ProbeEvent { id, slot, generation, status: ProbeStatus::Superseded });
            continue;
        }
        let status = match probe.probe(&resource) {
            Ok(duration) => match Track::loaded(resource.to_source(), duration) {
                Ok(track) => ProbeStatus::Ready(track),
                Err(err) => ProbeStatus::Failed(err.to_string()),
            },
            Err(err) => ProbeStatus::Failed(err.to_string()),
        };
        let _ = tx.send(ProbeEvent { id, slot, generation, status });
    }
}
