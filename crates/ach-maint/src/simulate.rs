//! Review race simulator
//!
//! Drives many concurrent verify/reject calls at the same submitted
//! achievement over in-memory stores and checks that exactly one reviewer
//! wins each race and that every history chain stays valid.

use ach_core::{EngineConfig, Stores, WorkflowEngine, WorkflowError};
use ach_model::{
    verify_chain, AchievementContent, AchievementStatus, Actor, LecturerProfile, ReferenceId,
    StudentProfile, UserId,
};
use ach_store::memory::{
    InMemoryDirectory, InMemoryDocumentStore, InMemoryHistoryLog, InMemoryLedger,
    InMemoryNotificationSink,
};
use ach_store::HistoryLog;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

/// Simulator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Achievements raced, one after another
    pub rounds: usize,
    /// Concurrent reviewers per race, alternating verify and reject
    pub reviewers: usize,
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            rounds: 100,
            reviewers: 4,
            stop_on_first_violation: false,
        }
    }
}

/// Counters gathered during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorStats {
    pub races: usize,
    pub verified: usize,
    pub rejected: usize,
    /// Losers that hit the compare-and-swap
    pub conflicts: usize,
    /// Losers that saw the terminal status on load
    pub invalid_transitions: usize,
    pub elapsed_ms: u64,
}

/// Broken guarantee observed in one race
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    WinnerCount { reference: ReferenceId, winners: usize },
    UnexpectedError { reference: ReferenceId, error: String },
    BrokenHistory { reference: ReferenceId, error: String },
    NonTerminal { reference: ReferenceId, status: AchievementStatus },
}

/// Outcome of a simulator run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: SimulatorStats,
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Whether every race held
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== Review Race Report ===\n");
        let _ = writeln!(report, "Rounds: {}", self.config.rounds);
        let _ = writeln!(report, "Reviewers per race: {}", self.config.reviewers);
        let _ = writeln!(report, "Races run: {}", self.stats.races);
        let _ = writeln!(report, "Verified: {}", self.stats.verified);
        let _ = writeln!(report, "Rejected: {}", self.stats.rejected);
        let _ = writeln!(report, "Lost on conflict: {}", self.stats.conflicts);
        let _ = writeln!(report, "Lost on transition check: {}", self.stats.invalid_transitions);
        let _ = writeln!(report, "Elapsed: {}ms", self.stats.elapsed_ms);
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            let _ = writeln!(report, "\n=== Violations ===");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

struct World {
    engine: WorkflowEngine,
    history: Arc<InMemoryHistoryLog>,
    student: Actor,
    reviewers: Vec<Actor>,
}

fn build_world(reviewers: usize) -> World {
    let directory = Arc::new(InMemoryDirectory::new());
    let advisor = LecturerProfile::new(UserId::new(), "SIM-L");
    let student = StudentProfile::new(UserId::new(), "SIM-S").with_advisor(advisor.id);
    let advisor_actor = Actor::lecturer(advisor.user_id);
    let student_actor = Actor::student(student.user_id);
    directory.insert_lecturer(advisor);
    directory.insert_student(student);

    // advisor and admins take turns
    let reviewers = (0..reviewers.max(2))
        .map(|i| {
            if i % 2 == 0 {
                advisor_actor
            } else {
                Actor::admin(UserId::new())
            }
        })
        .collect();

    let history = Arc::new(InMemoryHistoryLog::new());
    let stores = Stores {
        documents: Arc::new(InMemoryDocumentStore::new()),
        ledger: Arc::new(InMemoryLedger::new()),
        history: history.clone(),
        notifications: Arc::new(InMemoryNotificationSink::new()),
        directory,
    };
    let config = EngineConfig::new().with_notify_advisor_on_submit(false);

    World {
        engine: WorkflowEngine::new(stores, config),
        history,
        student: student_actor,
        reviewers,
    }
}

/// Run the simulator on the current tokio runtime
pub async fn run_simulator(config: SimulatorConfig) -> anyhow::Result<SimulatorReport> {
    let world = build_world(config.reviewers);
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();
    let start = Instant::now();

    for round in 0..config.rounds {
        let reference = world
            .engine
            .create(
                &world.student,
                AchievementContent::new(format!("Simulated entry {round}"), "competition"),
            )
            .await?;
        world.engine.submit(&world.student, reference.id).await?;

        let tasks = world.reviewers.iter().enumerate().map(|(i, reviewer)| {
            let engine = world.engine.clone();
            let reviewer = *reviewer;
            let id = reference.id;
            tokio::spawn(async move {
                if i % 2 == 0 {
                    engine.verify(&reviewer, id).await
                } else {
                    engine.reject(&reviewer, id, "simulated rejection").await
                }
            })
        });
        let outcomes = futures::future::join_all(tasks).await;
        stats.races += 1;

        let mut winners = 0;
        for outcome in outcomes {
            match outcome? {
                Ok(updated) => {
                    winners += 1;
                    match updated.status {
                        AchievementStatus::Verified => stats.verified += 1,
                        AchievementStatus::Rejected => stats.rejected += 1,
                        status => violations.push(Violation::NonTerminal {
                            reference: reference.id,
                            status,
                        }),
                    }
                }
                Err(WorkflowError::Conflict(_)) => stats.conflicts += 1,
                Err(WorkflowError::InvalidTransition { .. }) => stats.invalid_transitions += 1,
                Err(err) => violations.push(Violation::UnexpectedError {
                    reference: reference.id,
                    error: err.to_string(),
                }),
            }
        }
        if winners != 1 {
            violations.push(Violation::WinnerCount {
                reference: reference.id,
                winners,
            });
        }

        let chain = world.history.list_for_reference(reference.id).await?;
        if let Err(err) = verify_chain(reference.id, &chain) {
            violations.push(Violation::BrokenHistory {
                reference: reference.id,
                error: err.to_string(),
            });
        }

        if config.stop_on_first_violation && !violations.is_empty() {
            tracing::warn!(round, "stopping on first violation");
            break;
        }
    }

    stats.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(SimulatorReport {
        config,
        stats,
        violations,
    })
}
