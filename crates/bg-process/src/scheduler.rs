use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use eyre::{eyre, Error, Result};
use futures::future::BoxFuture;
use log::{debug, error, info, warn};
use model::schedule::ScheduledJob;
use parking_lot::Mutex;
use storage::schedule::ScheduleStore;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::{Scheduler, Task};

/// Persistence of job triggers.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    async fn all(&self) -> Result<Vec<ScheduledJob>>;
    async fn get(&self, name: &str) -> Result<Option<ScheduledJob>>;
    async fn save(&self, job: &ScheduledJob) -> Result<()>;
    async fn remove(&self, name: &str) -> Result<()>;
}

#[async_trait]
impl TriggerStore for ScheduleStore {
    async fn all(&self) -> Result<Vec<ScheduledJob>> {
        ScheduleStore::all(self).await
    }

    async fn get(&self, name: &str) -> Result<Option<ScheduledJob>> {
        ScheduleStore::get(self, name).await
    }

    async fn save(&self, job: &ScheduledJob) -> Result<()> {
        ScheduleStore::save(self, job).await
    }

    async fn remove(&self, name: &str) -> Result<()> {
        ScheduleStore::remove(self, name).await
    }
}

type Runner = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct Registered {
    runner: Runner,
    running: Arc<tokio::sync::Mutex<()>>,
    armed: Option<Uuid>,
}

struct Inner {
    sched: JobScheduler,
    store: Arc<dyn TriggerStore>,
    jobs: Mutex<HashMap<String, Registered>>,
}

/// Runs registered tasks by name. Every trigger is a one-shot cron job; a
/// recurring job arms its successor when it fires. Triggers are persisted so
/// a restarted process picks them up again with [`CronScheduler::restore`].
#[derive(Clone)]
pub struct CronScheduler {
    inner: Arc<Inner>,
}

impl CronScheduler {
    pub async fn new(store: Arc<dyn TriggerStore>) -> Result<Self> {
        let sched = JobScheduler::new().await?;
        Ok(CronScheduler {
            inner: Arc::new(Inner {
                sched,
                store,
                jobs: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn register<T>(&self, task: T)
    where
        T: Task + Clone + Send + Sync + 'static,
    {
        let runner: Runner = Arc::new(move || {
            let mut task = task.clone();
            Box::pin(async move {
                info!("Starting task {}", T::NAME);
                match task.process().await {
                    Ok(()) => info!("Task {} finished", T::NAME),
                    Err(err) => error!("Task {} failed: {:#}", T::NAME, err),
                }
            })
        });
        self.inner.jobs.lock().insert(
            T::NAME.to_owned(),
            Registered {
                runner,
                running: Arc::default(),
                armed: None,
            },
        );
    }

    pub async fn start(&self) -> Result<()> {
        self.inner.sched.start().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        let mut sched = self.inner.sched.clone();
        sched.shutdown().await?;
        Ok(())
    }

    /// Re-arms triggers persisted by a previous process.
    pub async fn restore(&self) -> Result<usize> {
        let mut restored = 0;
        for trigger in self.inner.store.all().await? {
            if !self.is_registered(&trigger.name) {
                warn!("Dropping trigger of unknown job {}", trigger.name);
                self.inner.store.remove(&trigger.name).await?;
                continue;
            }
            info!("Restoring job {} at {}", trigger.name, trigger.next_run);
            self.arm(trigger).await?;
            restored += 1;
        }
        Ok(restored)
    }

    fn is_registered(&self, name: &str) -> bool {
        self.inner.jobs.lock().contains_key(name)
    }

    fn ensure_registered(&self, name: &str) -> Result<()> {
        if self.is_registered(name) {
            Ok(())
        } else {
            Err(eyre!("Job {} is not registered", name))
        }
    }

    async fn arm(&self, trigger: ScheduledJob) -> Result<()> {
        self.ensure_registered(&trigger.name)?;
        let delay = (trigger.next_run - Utc::now())
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        let this = self.clone();
        let name = trigger.name.clone();
        let job = Job::new_one_shot_async(delay, move |id, _| this.clone().fire(name.clone(), id))?;
        let id = job.guid();

        let previous = {
            let mut jobs = self.inner.jobs.lock();
            jobs.get_mut(&trigger.name)
                .and_then(|registered| registered.armed.replace(id))
        };
        if let Some(previous) = previous {
            if let Err(err) = self.inner.sched.remove(&previous).await {
                debug!("Trigger {} of {} already gone: {}", previous, trigger.name, err);
            }
        }
        self.inner.sched.add(job).await?;
        debug!("Job {} armed in {:?}", trigger.name, delay);
        Ok(())
    }

    fn fire(self, name: String, id: Uuid) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let handles = {
                let mut jobs = self.inner.jobs.lock();
                match jobs.get_mut(&name) {
                    Some(registered) if registered.armed == Some(id) => {
                        registered.armed = None;
                        Some((registered.runner.clone(), registered.running.clone()))
                    }
                    _ => None,
                }
            };
            let Some((runner, running)) = handles else {
                debug!("Stale trigger {} of {} ignored", id, name);
                return;
            };

            if let Err(err) = self.advance(&name, Utc::now()).await {
                error!("Failed to advance trigger of {}: {:#}", name, err);
            }

            let Ok(_running) = running.try_lock() else {
                warn!("Job {} is still running, trigger skipped", name);
                return;
            };
            runner().await;
        })
    }

    async fn advance(&self, name: &str, fired_at: DateTime<Utc>) -> Result<(), Error> {
        let Some(trigger) = self.inner.store.get(name).await? else {
            return Ok(());
        };
        match trigger.successor(fired_at) {
            Some(next) => {
                self.inner.store.save(&next).await?;
                self.arm(next).await?;
            }
            None => self.inner.store.remove(name).await?,
        }
        Ok(())
    }
}

#[async_trait]
impl Scheduler for CronScheduler {
    async fn is_scheduled(&self, job: &str) -> Result<bool> {
        Ok(self
            .inner
            .jobs
            .lock()
            .get(job)
            .map(|registered| registered.armed.is_some())
            .unwrap_or(false))
    }

    async fn schedule_recurring(&self, job: &str, interval: Duration) -> Result<()> {
        self.ensure_registered(job)?;
        let trigger = ScheduledJob::recurring(job, Utc::now(), interval);
        info!("Scheduling {} every {}s", job, interval.num_seconds());
        self.inner.store.save(&trigger).await?;
        self.arm(trigger).await
    }

    async fn schedule_once(&self, job: &str, at: DateTime<Utc>) -> Result<()> {
        self.ensure_registered(job)?;
        let trigger = ScheduledJob::once(job, at);
        info!("Scheduling {} at {}", job, at);
        self.inner.store.save(&trigger).await?;
        self.arm(trigger).await
    }
}
