//! Parallel creation of the pool's resources at startup

use crate::errors::{PoolError, PoolResult};
use crate::factory::{CreationParameters, ResourceFactory};
use crate::store::Store;

use crossbeam::channel;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, error};

/// What a worker reports for one slot
enum Creation<R, E> {
    Created(R),
    Failed(E),
    Panicked(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Create `count` resources on a worker group of at most `workers` threads,
/// pushing each into `store` in completion order.
///
/// Each resource is tagged with the slot it was created for. The worker group
/// only lives for the duration of this call.
pub(crate) fn populate<F: ResourceFactory>(
    factory: &F,
    params: &CreationParameters,
    count: usize,
    workers: usize,
    store: &Store<(F::Resource, usize)>,
) -> PoolResult<()> {
    let workers = workers.min(count);
    let next_slot = AtomicUsize::new(0);
    let aborted = AtomicBool::new(false);
    let (results_tx, results_rx) = channel::bounded(count);

    let outcome = crossbeam::scope(|scope| {
        for worker in 0..workers {
            let results_tx = results_tx.clone();
            let next_slot = &next_slot;
            let aborted = &aborted;

            let spawned = scope
                .builder()
                .name(format!("resource-pool-init-{worker}"))
                .spawn(move |_| {
                    while !aborted.load(Ordering::Acquire) {
                        let slot = next_slot.fetch_add(1, Ordering::Relaxed);
                        if slot >= count {
                            break;
                        }
                        let creation =
                            match panic::catch_unwind(AssertUnwindSafe(|| factory.create(params))) {
                                Ok(Ok(resource)) => Creation::Created(resource),
                                Ok(Err(err)) => {
                                    aborted.store(true, Ordering::Release);
                                    Creation::Failed(err)
                                }
                                Err(payload) => {
                                    aborted.store(true, Ordering::Release);
                                    Creation::Panicked(panic_message(payload.as_ref()))
                                }
                            };
                        if results_tx.send((slot, creation)).is_err() {
                            break;
                        }
                    }
                });

            if let Err(err) = spawned {
                aborted.store(true, Ordering::Release);
                return Err(PoolError::startup(format!(
                    "failed to spawn startup worker {worker}: {err}"
                )));
            }
        }
        drop(results_tx);

        let mut created = 0;
        for (slot, creation) in results_rx.iter() {
            match creation {
                Creation::Created(resource) => {
                    if store.push((resource, slot)).is_err() {
                        aborted.store(true, Ordering::Release);
                        return Err(PoolError::startup("store rejected a freshly created resource"));
                    }
                    created += 1;
                    debug!(slot, created, total = count, "Created pooled resource");
                }
                Creation::Failed(err) => {
                    aborted.store(true, Ordering::Release);
                    return Err(PoolError::creation_failed(slot, err));
                }
                Creation::Panicked(message) => {
                    aborted.store(true, Ordering::Release);
                    return Err(PoolError::creation_panicked(slot, &message));
                }
            }
        }

        if created < count {
            return Err(PoolError::startup(format!(
                "only {created} of {count} resources were created"
            )));
        }
        Ok(())
    });

    let result = outcome
        .map_err(|_| PoolError::startup("resource factory panicked during startup"))
        .and_then(|inner| inner);

    if let Err(ref err) = result {
        error!(error = %err, capacity = count, "Resource pool startup failed");
    }
    result
}
