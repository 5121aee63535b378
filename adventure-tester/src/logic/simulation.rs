use anyhow::{Result, anyhow};
use std::sync::Arc;

use adventure_game::{
    Answer, Challenge, ChallengeError, ChallengeId, ChallengeKind, ChallengeMeta,
    ChallengeOutcome, ChallengeRegistry, ChallengeRound, ChallengeSetup, ClientError,
    ClientSession, FixedSelection, LocalApi, MERCY_THRESHOLD, Manifest, MemorySessionStore,
    NODE_COUNT, NodeResult, OutcomeReporter, ProgressService, ProgressionEngine, Prompt,
    RoundStatus, STAR_AWARD, Session, Stage, StartSessionRequest, SyncMode, Transition,
};

use super::network::{NetworkProfile, SimulatedNetwork};
use super::policy::GameplayStrategy;

/// Challenge whose only answers are "pass" and "fail", so a scripted
/// player decides the outcome.
pub struct ScriptedChallenge {
    meta: ChallengeMeta,
}

impl ScriptedChallenge {
    pub const ID: &'static str = "scripted";

    pub fn new() -> Self {
        Self {
            meta: ChallengeMeta::new(Self::ID, "Scripted Check", ChallengeKind::Logic),
        }
    }
}

impl Challenge for ScriptedChallenge {
    fn meta(&self) -> &ChallengeMeta {
        &self.meta
    }

    fn start(
        &self,
        stage: &mut dyn Stage,
        _setup: ChallengeSetup,
        reporter: OutcomeReporter,
    ) -> Result<(), ChallengeError> {
        stage.mount(
            &self.meta.name,
            Box::new(ScriptedRound {
                reporter,
                status: RoundStatus::Pending,
            }),
        );
        Ok(())
    }
}

struct ScriptedRound {
    reporter: OutcomeReporter,
    status: RoundStatus,
}

impl ChallengeRound for ScriptedRound {
    fn prompt(&self) -> Prompt {
        Prompt::Choice {
            question: "Pass or fail?".to_string(),
            options: vec!["pass".to_string(), "fail".to_string()],
        }
    }

    fn submit(&mut self, answer: Answer) -> RoundStatus {
        if let (RoundStatus::Pending, Answer::Pick(index @ 0..=1)) = (self.status, answer) {
            let outcome = ChallengeOutcome::from(index == 0);
            self.status = RoundStatus::Finished(outcome);
            self.reporter.report(outcome);
        }
        self.status
    }
}

/// Stage that answers the mounted round on the player's behalf.
struct PolicyStage {
    pass: bool,
}

impl Stage for PolicyStage {
    fn mount(&mut self, _title: &str, mut round: Box<dyn ChallengeRound>) {
        let pick = if self.pass { 0 } else { 1 };
        round.submit(Answer::Pick(pick));
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn = Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub network: NetworkProfile,
    pub max_attempts: usize,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    /// Enough attempts for a mercy-only run.
    pub const DEFAULT_MAX_ATTEMPTS: usize = (NODE_COUNT as usize) * (MERCY_THRESHOLD as usize);

    pub const fn new(strategy: GameplayStrategy, network: NetworkProfile) -> Self {
        Self {
            strategy,
            network,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            expectations: Vec::new(),
        }
    }

    pub const fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub node: u32,
    pub passed: bool,
    pub transition: Option<Transition>,
    pub error: Option<String>,
}

/// Complete record of a simulated playthrough.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub network: NetworkProfile,
    pub mode: SyncMode,
    pub steps: Vec<StepRecord>,
    pub final_session: Session,
    /// Server record of the session, when one exists.
    pub server_copy: Option<Session>,
    pub stored_sessions: usize,
    pub transport_errors: usize,
    pub violations: Vec<String>,
}

impl SimulationSummary {
    pub const fn victory(&self) -> bool {
        self.final_session.is_finished()
    }

    pub fn count(&self, result: NodeResult) -> usize {
        self.final_session
            .node_history
            .iter()
            .filter(|record| record.result == result)
            .count()
    }

    pub fn retries(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step.transition, Some(Transition::Retry { .. })))
            .count()
    }

    pub fn status_label(&self) -> &'static str {
        if self.victory() { "victory" } else { "halted" }
    }
}

/// Check one applied step against the progression invariants.
fn check_step(
    before: &Session,
    after: &Session,
    failures: u8,
    transition: Transition,
) -> Vec<String> {
    let mut violations = Vec::new();
    if after.current_node > NODE_COUNT {
        violations.push(format!("node {} beyond path end", after.current_node));
    }
    if after.total_stars < before.total_stars {
        violations.push("stars decreased".to_string());
    }
    if failures >= MERCY_THRESHOLD {
        violations.push(format!("failure counter reached {failures}"));
    }
    if let Err(err) = after.validate() {
        violations.push(err.to_string());
    }
    match transition {
        Transition::Cleared { .. } => {
            if after.current_node != before.current_node + 1
                || after.total_stars != before.total_stars + STAR_AWARD
                || after.mercy_mode
            {
                violations.push(format!("bad clear at node {}", before.current_node));
            }
        }
        Transition::Mercy { .. } => {
            if after.current_node != before.current_node + 1
                || after.total_stars != before.total_stars
                || !after.mercy_mode
            {
                violations.push(format!("bad mercy advance at node {}", before.current_node));
            }
        }
        Transition::Retry { .. } | Transition::Unchanged | Transition::Finished => {
            if after != before {
                violations.push(format!("{transition:?} changed the session"));
            }
        }
    }
    violations
}

/// Play one session to the end (or the attempt budget) under `plan`.
pub async fn run_plan(plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
    let service = Arc::new(ProgressService::new(
        MemorySessionStore::new(),
        Manifest::default(),
    ));
    let network = SimulatedNetwork::new(LocalApi::new(Arc::clone(&service)), plan.network, seed);
    let request = StartSessionRequest::new("Tester", "robot", "space");
    let mut client = ClientSession::start(network, request).await?;

    let registry = ChallengeRegistry::new().with(ScriptedChallenge::new())?;
    let engine = ProgressionEngine::new(
        registry,
        FixedSelection(ChallengeId::new(ScriptedChallenge::ID)),
    )?;
    let mut policy = plan.strategy.create_policy(seed);

    let mut steps = Vec::new();
    let mut violations = Vec::new();
    let mut transport_errors = 0;
    let mut node_attempts = 0;
    let mut last_node = None;

    while !client.session().is_finished() && steps.len() < plan.max_attempts {
        let node = client.session().current_node;
        if last_node != Some(node) {
            last_node = Some(node);
            node_attempts = 0;
        }
        node_attempts += 1;
        let passed = policy.attempt(node, node_attempts);

        let mut stage = PolicyStage { pass: passed };
        let mut attempt = client.begin(&engine, node, &mut stage)?;
        if attempt.try_outcome()?.is_none() {
            return Err(anyhow!("scripted round at node {node} did not resolve"));
        }

        let before = client.session().clone();
        let failures_before = client.failures();
        let step = match client.complete(&mut attempt).await {
            Ok(transition) => {
                violations.extend(check_step(
                    &before,
                    client.session(),
                    client.failures().get(),
                    transition,
                ));
                StepRecord {
                    node,
                    passed,
                    transition: Some(transition),
                    error: None,
                }
            }
            Err(ClientError::Api(err)) if err.is_transient() => {
                transport_errors += 1;
                if client.session() != &before || client.failures() != failures_before {
                    violations.push(format!("transport error at node {node} changed local state"));
                }
                StepRecord {
                    node,
                    passed,
                    transition: None,
                    error: Some(err.to_string()),
                }
            }
            Err(err) => return Err(err.into()),
        };
        log::debug!("seed {seed} step {}: {step:?}", steps.len() + 1);
        steps.push(step);
    }

    let dropped = client.api().dropped();
    if transport_errors > dropped {
        violations.push(format!(
            "{transport_errors} transport errors but only {dropped} calls were dropped"
        ));
    }
    log::debug!("seed {seed}: {dropped} calls dropped by the {} network", plan.network);

    let final_session = client.session().clone();
    let server_copy = match client.mode() {
        SyncMode::Online => service.session(&final_session.session_id).ok(),
        SyncMode::Offline => None,
    };
    Ok(SimulationSummary {
        seed,
        strategy: plan.strategy,
        network: plan.network,
        mode: client.mode(),
        steps,
        final_session,
        server_copy,
        stored_sessions: service.sessions()?.len(),
        transport_errors,
        violations,
    })
}
