// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory job feed keyed by id with explicit most-recent-first ordering.

use std::collections::{HashMap, VecDeque};

use tokio::sync::watch;
use vidra_core::{GenerationJob, JobId};

/// The ordered collection of jobs.
///
/// Updates against an id that is not present are no-ops, which is how
/// late completions for deleted jobs are discarded. A job whose storage
/// delete is in flight is marked; completions wait on the mark before
/// touching the job.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<JobId, GenerationJob>,
    order: VecDeque<JobId>,
    deleting: HashMap<JobId, watch::Sender<()>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `job` at the front of the feed, replacing any job with the same id.
    pub fn insert_front(&mut self, job: GenerationJob) {
        if self.jobs.contains_key(&job.id) {
            self.order.retain(|id| id != &job.id);
        }
        self.order.push_front(job.id.clone());
        self.jobs.insert(job.id.clone(), job);
    }

    /// Appends jobs not already present, keeping their relative order.
    ///
    /// Returns how many were added.
    pub fn extend_back(&mut self, jobs: impl IntoIterator<Item = GenerationJob>) -> usize {
        let mut added = 0;
        for job in jobs {
            if self.jobs.contains_key(&job.id) {
                continue;
            }
            self.order.push_back(job.id.clone());
            self.jobs.insert(job.id.clone(), job);
            added += 1;
        }
        added
    }

    pub fn get(&self, id: &JobId) -> Option<&GenerationJob> {
        self.jobs.get(id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    /// Applies `f` to the job and returns a copy of the result.
    pub fn update<F>(&mut self, id: &JobId, f: F) -> Option<GenerationJob>
    where
        F: FnOnce(&mut GenerationJob),
    {
        let job = self.jobs.get_mut(id)?;
        f(job);
        Some(job.clone())
    }

    pub fn remove(&mut self, id: &JobId) -> Option<GenerationJob> {
        let job = self.jobs.remove(id)?;
        self.order.retain(|other| other != id);
        Some(job)
    }

    /// Marks a present job as being deleted.
    ///
    /// Returns `false` if the job is absent or already marked.
    pub fn begin_delete(&mut self, id: &JobId) -> bool {
        if !self.jobs.contains_key(id) || self.deleting.contains_key(id) {
            return false;
        }
        let (done, _) = watch::channel(());
        self.deleting.insert(id.clone(), done);
        true
    }

    /// Clears the delete mark, removing the job when `removed` is set.
    ///
    /// Anyone waiting on [`pending_delete`](Self::pending_delete) is released.
    pub fn finish_delete(&mut self, id: &JobId, removed: bool) -> Option<GenerationJob> {
        // Dropping the sender closes every waiting receiver.
        self.deleting.remove(id);
        if removed {
            self.remove(id)
        } else {
            None
        }
    }

    pub fn is_deleting(&self, id: &JobId) -> bool {
        self.deleting.contains_key(id)
    }

    /// A receiver that closes once the in-flight delete of `id` settles.
    pub fn pending_delete(&self, id: &JobId) -> Option<watch::Receiver<()>> {
        self.deleting.get(id).map(watch::Sender::subscribe)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in feed order.
    pub fn ids(&self) -> Vec<JobId> {
        self.order.iter().cloned().collect()
    }

    /// Copies of all jobs in feed order.
    pub fn snapshot(&self) -> Vec<GenerationJob> {
        self.order
            .iter()
            .filter_map(|id| self.jobs.get(id).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidra_core::{GenerationParams, JobStatus};

    fn job(prompt: &str) -> GenerationJob {
        GenerationJob::pending(GenerationParams::text(prompt, "veo"))
    }

    #[test]
    fn newest_job_comes_first() {
        let mut registry = JobRegistry::new();
        let a = job("a");
        let b = job("b");
        registry.insert_front(a.clone());
        registry.insert_front(b.clone());
        assert_eq!(registry.ids(), vec![b.id, a.id]);
    }

    #[test]
    fn update_of_absent_id_is_noop() {
        let mut registry = JobRegistry::new();
        registry.insert_front(job("a"));
        let ghost = JobId::from("ghost");
        let mut called = false;
        assert!(registry.update(&ghost, |_| called = true).is_none());
        assert!(!called);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn update_returns_modified_copy() {
        let mut registry = JobRegistry::new();
        let a = job("a");
        registry.insert_front(a.clone());
        let updated = registry.update(&a.id, |j| j.fail("nope")).unwrap();
        assert_eq!(updated.status, JobStatus::Error);
        assert_eq!(registry.get(&a.id).unwrap().status, JobStatus::Error);
    }

    #[test]
    fn remove_preserves_order_of_rest() {
        let mut registry = JobRegistry::new();
        let (a, b, c) = (job("a"), job("b"), job("c"));
        for j in [&a, &b, &c] {
            registry.insert_front(j.clone());
        }
        assert!(registry.remove(&b.id).is_some());
        assert_eq!(registry.ids(), vec![c.id.clone(), a.id.clone()]);
        assert!(registry.remove(&b.id).is_none());
    }

    #[test]
    fn reinserting_moves_to_front_without_duplicating() {
        let mut registry = JobRegistry::new();
        let (a, b) = (job("a"), job("b"));
        registry.insert_front(a.clone());
        registry.insert_front(b.clone());
        registry.insert_front(a.clone());
        assert_eq!(registry.ids(), vec![a.id, b.id]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn delete_mark_is_exclusive_and_cleared() {
        let mut registry = JobRegistry::new();
        let a = job("a");
        registry.insert_front(a.clone());

        assert!(!registry.begin_delete(&JobId::from("ghost")));
        assert!(registry.begin_delete(&a.id));
        assert!(!registry.begin_delete(&a.id));
        assert!(registry.is_deleting(&a.id));

        assert!(registry.finish_delete(&a.id, false).is_none());
        assert!(!registry.is_deleting(&a.id));
        assert!(registry.contains(&a.id));

        assert!(registry.begin_delete(&a.id));
        assert_eq!(registry.finish_delete(&a.id, true).map(|j| j.id), Some(a.id.clone()));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn pending_delete_closes_when_settled() {
        let mut registry = JobRegistry::new();
        let a = job("a");
        registry.insert_front(a.clone());
        assert!(registry.pending_delete(&a.id).is_none());

        registry.begin_delete(&a.id);
        let mut done = registry.pending_delete(&a.id).unwrap();
        registry.finish_delete(&a.id, true);
        assert!(done.changed().await.is_err());
    }

    #[test]
    fn extend_back_skips_known_ids() {
        let mut registry = JobRegistry::new();
        let live = job("live");
        registry.insert_front(live.clone());

        let stored = vec![job("older"), live.clone(), job("oldest")];
        assert_eq!(registry.extend_back(stored.clone()), 2);
        assert_eq!(
            registry.ids(),
            vec![live.id, stored[0].id.clone(), stored[2].id.clone()]
        );
    }
}
