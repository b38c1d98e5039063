//! Cron-driven branch activation.
//!
//! One job per scene branch, keyed `{sceneId}_{true|false}`. A job is a task
//! walking the schedule's upcoming fire times and reporting each one to the
//! engine as [`Internal::CronDue`].

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use scenehub_domain::error::ValidationError;
use scenehub_domain::scene::{Branch, SceneId};

use super::Internal;

const DAY_NAMES: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Key of the job driving `branch` of `scene`.
#[must_use]
pub fn job_key(scene: &SceneId, branch: Branch) -> String {
    format!("{scene}_{branch}")
}

/// Rewrite a crontab-style expression into the seconds-first dialect of the
/// `cron` crate.
///
/// Five-field expressions get a leading `0` seconds field. Numeric
/// days of week use crontab numbering (`0` and `7` are Sunday) and are
/// rewritten to day names.
#[must_use]
pub fn normalize_cron(expression: &str) -> String {
    let mut fields: Vec<String> = expression.split_whitespace().map(str::to_string).collect();
    if fields.len() == 5 {
        fields.insert(0, "0".to_string());
    }
    if let Some(days) = fields.get_mut(5) {
        *days = days_of_week(days);
    }
    fields.join(" ")
}

fn days_of_week(field: &str) -> String {
    field
        .split(',')
        .map(|part| {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (part, None),
            };
            match (day_range(range), step) {
                (Some(named), None) => named,
                (Some(named), Some(step)) if !named.contains(',') => format!("{named}/{step}"),
                _ => part.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn day_range(range: &str) -> Option<String> {
    let day = |text: &str| text.parse::<usize>().ok().filter(|d| *d <= 7);
    match range.split_once('-') {
        None => day(range).map(|d| DAY_NAMES[d].to_string()),
        Some((start, end)) => {
            let (start, end) = (day(start)?, day(end)?);
            Some(match (start, end) {
                (0 | 7, 7) => "Sun".to_string(),
                (6, 7) => "Sat,Sun".to_string(),
                (start, 7) => format!("{}-Sat,Sun", DAY_NAMES[start]),
                (start, end) => format!("{}-{}", DAY_NAMES[start], DAY_NAMES[end]),
            })
        }
    }
}

/// First fire time strictly after `now`, in `now`'s time zone.
///
/// Jobs run on [`Local`] time, so `0 7 * * *` means seven o'clock on the
/// installation's wall clock.
#[must_use]
pub fn next_fire<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    schedule.after(now).next()
}

/// Owns every cron job.
#[derive(Default)]
pub struct Scheduler {
    jobs: HashMap<String, JoinHandle<()>>,
}

impl Scheduler {
    /// Start the job for `branch` of `scene`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCron`] if `expression` does not parse.
    pub fn register(
        &mut self,
        internal: &mpsc::UnboundedSender<Internal>,
        scene: &SceneId,
        branch: Branch,
        expression: &str,
    ) -> Result<(), ValidationError> {
        let schedule = Schedule::from_str(&normalize_cron(expression)).map_err(|_| {
            ValidationError::InvalidCron {
                scene: scene.clone(),
                expression: expression.to_string(),
            }
        })?;

        let key = job_key(scene, branch);
        if let Some(previous) = self.jobs.remove(&key) {
            previous.abort();
        }

        let tx = internal.clone();
        let scene = scene.clone();
        let handle = tokio::spawn(async move {
            let mut now = Local::now();
            while let Some(next) = next_fire(&schedule, &now) {
                let wait = (next - Local::now()).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
                now = next;
                let due = Internal::CronDue {
                    scene: scene.clone(),
                    branch,
                };
                if tx.send(due).is_err() {
                    break;
                }
            }
        });
        self.jobs.insert(key, handle);
        Ok(())
    }

    /// Abort every job.
    pub fn cancel_all(&mut self) {
        for (_, job) in self.jobs.drain() {
            job.abort();
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.jobs.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
