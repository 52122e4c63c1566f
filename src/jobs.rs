//! Per-fire job queues.
//!
//! Two FIFO queues per fire: chop jobs and expeditions. While an expedition
//! is pending its front job takes priority over any chop job; the requester's
//! position is ignored, oldest-first wins.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::grid::Coordinate;

/// Fixed work duration once a job is ready, in simulation seconds.
pub const JOB_DURATION: f32 = 5.0;

/// Workers an expedition needs on site before any progress counts.
pub const EXPEDITION_REQUIRED_WORKERS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Chop,
    Expedition,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub coordinate: Coordinate,
    pub kind: JobKind,
    pub required_workers: u32,
    pub workers_assigned: u32,
    pub workers_arrived: u32,
}

impl Job {
    pub fn new(coordinate: Coordinate, kind: JobKind) -> Self {
        let required_workers = match kind {
            JobKind::Chop => 1,
            JobKind::Expedition => EXPEDITION_REQUIRED_WORKERS,
        };
        Self {
            coordinate,
            kind,
            required_workers,
            workers_assigned: 0,
            workers_arrived: 0,
        }
    }

    pub fn arrived(&mut self) {
        self.workers_arrived += 1;
    }

    pub fn is_ready(&self) -> bool {
        self.workers_arrived >= self.required_workers
    }

    pub fn duration(&self) -> f32 {
        JOB_DURATION
    }
}

/// Shared progress for an expedition whose workers are en route. Workers
/// carry copies of the job; the canonical assigned/arrived counts live here.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpeditionProgress {
    pub assigned: u32,
    pub arrived: u32,
}

#[derive(Debug, Default)]
pub struct JobDispatcher {
    chop_queue: VecDeque<Job>,
    expedition_queue: VecDeque<Job>,
    /// Chop coordinates currently pending or assigned. Guards against a tile
    /// being enqueued twice across influence recomputations.
    queued_chops: HashSet<Coordinate>,
    expeditions_in_flight: HashMap<Coordinate, ExpeditionProgress>,
}

impl JobDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a job. Chop jobs are idempotent per coordinate: a tile that is
    /// already pending or assigned is not enqueued again.
    pub fn queue_job(&mut self, coordinate: Coordinate, kind: JobKind) {
        match kind {
            JobKind::Chop => {
                if self.queued_chops.insert(coordinate) {
                    self.chop_queue.push_back(Job::new(coordinate, kind));
                }
            }
            JobKind::Expedition => {
                self.expedition_queue.push_back(Job::new(coordinate, kind));
            }
        }
    }

    /// Return a chop job whose worker failed to path to it. The idempotence
    /// entry is still held, so the tile cannot be double-queued meanwhile.
    pub fn requeue(&mut self, job: Job) {
        debug_assert_eq!(job.kind, JobKind::Chop);
        self.chop_queue.push_back(job);
    }

    /// Oldest-first dispatch, expeditions ahead of chops while one is
    /// pending. The front expedition is cloned rather than popped: it stays
    /// claimable until enough workers committed.
    pub fn next_available_job(&mut self, _requester: Coordinate) -> Option<Job> {
        if let Some(front) = self.expedition_queue.front() {
            return Some(front.clone());
        }
        self.chop_queue.pop_front()
    }

    /// Record an assignment against the front expedition. Progress keeps
    /// being tracked for the workers already en route even after the job
    /// leaves the queue.
    pub fn expedition_worker_assigned(&mut self) {
        if let Some(front) = self.expedition_queue.front_mut() {
            front.workers_assigned += 1;
            let coordinate = front.coordinate;
            self.expeditions_in_flight
                .entry(coordinate)
                .or_default()
                .assigned += 1;
        }
        self.dequeue_expedition_if_ready();
    }

    /// Remove the front expedition the instant its crew is fully assigned,
    /// so no further workers can claim it.
    pub fn dequeue_expedition_if_ready(&mut self) {
        if let Some(front) = self.expedition_queue.front() {
            if front.workers_assigned >= front.required_workers {
                self.expedition_queue.pop_front();
            }
        }
    }

    /// A committed worker reached the expedition site.
    pub fn expedition_worker_arrived(&mut self, coordinate: Coordinate) {
        if let Some(progress) = self.expeditions_in_flight.get_mut(&coordinate) {
            progress.arrived += 1;
        }
    }

    /// An expedition is ready once every required worker stands on site.
    pub fn expedition_ready(&self, coordinate: Coordinate) -> bool {
        self.expeditions_in_flight
            .get(&coordinate)
            .map(|p| p.arrived >= EXPEDITION_REQUIRED_WORKERS)
            .unwrap_or(false)
    }

    /// Whether an expedition crew is still working toward this site. Goes
    /// false once the first crew member completes the job; stragglers use
    /// this to stand down.
    pub fn expedition_in_flight(&self, coordinate: Coordinate) -> bool {
        self.expeditions_in_flight.contains_key(&coordinate)
    }

    pub fn expedition_finished(&mut self, coordinate: Coordinate) {
        self.expeditions_in_flight.remove(&coordinate);
    }

    /// Clear the idempotence entry once a chop job completed or its tile
    /// stopped being a tree.
    pub fn release_chop(&mut self, coordinate: Coordinate) {
        self.queued_chops.remove(&coordinate);
    }

    pub fn is_chop_queued(&self, coordinate: Coordinate) -> bool {
        self.queued_chops.contains(&coordinate)
    }

    pub fn has_jobs(&self) -> bool {
        !self.chop_queue.is_empty() || !self.expedition_queue.is_empty()
    }

    pub fn job_count(&self) -> usize {
        self.chop_queue.len() + self.expedition_queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chop_enqueue_is_idempotent() {
        let mut jobs = JobDispatcher::new();
        let c = Coordinate::new(3, 4);
        jobs.queue_job(c, JobKind::Chop);
        jobs.queue_job(c, JobKind::Chop);
        assert_eq!(jobs.job_count(), 1);
        assert!(jobs.is_chop_queued(c));

        // Still guarded while assigned; free again after release.
        let job = jobs.next_available_job(Coordinate::new(0, 0)).unwrap();
        jobs.queue_job(job.coordinate, JobKind::Chop);
        assert_eq!(jobs.job_count(), 0);
        jobs.release_chop(c);
        assert!(!jobs.is_chop_queued(c));
        jobs.queue_job(c, JobKind::Chop);
        assert_eq!(jobs.job_count(), 1);
    }

    #[test]
    fn test_expeditions_served_before_chops() {
        let mut jobs = JobDispatcher::new();
        jobs.queue_job(Coordinate::new(1, 1), JobKind::Chop);
        jobs.queue_job(Coordinate::new(9, 9), JobKind::Expedition);
        let job = jobs.next_available_job(Coordinate::new(0, 0)).unwrap();
        assert_eq!(job.kind, JobKind::Expedition);
        // The expedition is exposed, not consumed.
        assert_eq!(jobs.job_count(), 2);
    }

    #[test]
    fn test_expedition_removed_once_fully_assigned() {
        let mut jobs = JobDispatcher::new();
        jobs.queue_job(Coordinate::new(5, 5), JobKind::Expedition);
        for _ in 0..EXPEDITION_REQUIRED_WORKERS {
            assert!(jobs.has_jobs());
            jobs.expedition_worker_assigned();
        }
        assert!(!jobs.has_jobs(), "satisfied expedition must leave the queue");
    }

    #[test]
    fn test_chops_are_fifo() {
        let mut jobs = JobDispatcher::new();
        jobs.queue_job(Coordinate::new(1, 0), JobKind::Chop);
        jobs.queue_job(Coordinate::new(2, 0), JobKind::Chop);
        // Requester sits next to the second job; oldest still wins.
        let job = jobs.next_available_job(Coordinate::new(2, 1)).unwrap();
        assert_eq!(job.coordinate, Coordinate::new(1, 0));
    }
}
