use crate::driver::{Driver, DriverResource};
use crate::error::{Error, Result};
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Bounded pool of exclusive browser handles. Capacity is fixed at
/// construction; a checkout is a [`PooledResource`] guard that returns the
/// handle on drop, so release happens exactly once on every exit path.
pub struct ResourcePool {
    semaphore: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<Box<dyn DriverResource>>>>,
    size: usize,
}

impl ResourcePool {
    /// Eagerly launches `size` resources. Any launch failure tears down the
    /// ones already launched and aborts — the harness never runs on a
    /// partial pool.
    pub async fn init(size: usize, driver: &dyn Driver) -> Result<Self> {
        let mut resources: Vec<Box<dyn DriverResource>> = Vec::with_capacity(size);
        for i in 0..size {
            match driver.launch().await {
                Ok(resource) => {
                    log::info!("[pool] launched resource {}/{}", i + 1, size);
                    resources.push(resource);
                }
                Err(e) => {
                    for resource in &resources {
                        if let Err(close_err) = resource.close().await {
                            log::warn!("[pool] close during aborted init failed: {close_err}");
                        }
                    }
                    return Err(Error::ResourceInit(e));
                }
            }
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(size)),
            idle: Arc::new(Mutex::new(resources)),
            size,
        })
    }

    /// Suspends until a resource is free. No fairness guarantee beyond
    /// eventual availability.
    pub async fn acquire(&self) -> Result<PooledResource> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::Internal("resource pool is closed".to_string()))?;
        // The guard restores the permit on drop; detach it from the
        // semaphore's RAII so the two cannot double-release.
        permit.forget();

        let resource = self
            .idle
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| Error::Internal("pool permit issued with no idle resource".to_string()))?;

        Ok(PooledResource {
            resource: Some(resource),
            idle: Arc::clone(&self.idle),
            semaphore: Arc::clone(&self.semaphore),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn checked_out(&self) -> usize {
        self.size - self.idle.lock().unwrap().len()
    }

    /// Best-effort shutdown: closes every idle resource, logging and
    /// swallowing individual failures.
    pub async fn close_all(&self) {
        let drained: Vec<Box<dyn DriverResource>> = {
            let mut idle = self.idle.lock().unwrap();
            idle.drain(..).collect()
        };
        for resource in drained {
            if let Err(e) = resource.close().await {
                log::warn!("[pool] resource close failed: {e}");
            }
        }
    }
}

/// Exclusive checkout of one pooled resource.
pub struct PooledResource {
    resource: Option<Box<dyn DriverResource>>,
    idle: Arc<Mutex<Vec<Box<dyn DriverResource>>>>,
    semaphore: Arc<Semaphore>,
}

impl Deref for PooledResource {
    type Target = dyn DriverResource;

    fn deref(&self) -> &Self::Target {
        self.resource
            .as_deref()
            .expect("pooled resource present until drop")
    }
}

impl Drop for PooledResource {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.idle.lock().unwrap().push(resource);
            self.semaphore.add_permits(1);
        }
    }
}
