use anyhow::{Result, bail, ensure};

use adventure_game::{NODE_COUNT, NodeResult, STAR_AWARD, SyncMode};

use crate::logic::{GameplayStrategy, NetworkProfile, SimulationPlan, SimulationSummary};

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

const CATALOG: [(&str, &str); 5] = [
    ("smoke", "Perfect player clears every node first try"),
    ("mercy-path", "Player who always fails still finishes through mercy"),
    ("mixed-play", "Coin-flip player; stars match cleared nodes"),
    ("flaky-network", "Streaky player over a lossy link; server and client agree"),
    ("offline-fallback", "Server unreachable at start; local offline session"),
];

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG.to_vec()
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let plan = match name {
        "smoke" => SimulationPlan::new(GameplayStrategy::AlwaysPass, NetworkProfile::Reliable)
            .with_expectation(expect_victory)
            .with_expectation(expect_server_agrees)
            .with_expectation(expect_perfect_run),
        "mercy-path" => SimulationPlan::new(GameplayStrategy::AlwaysFail, NetworkProfile::Reliable)
            .with_expectation(expect_victory)
            .with_expectation(expect_server_agrees)
            .with_expectation(expect_mercy_only_run),
        "mixed-play" => SimulationPlan::new(GameplayStrategy::CoinFlip, NetworkProfile::Reliable)
            .with_expectation(expect_victory)
            .with_expectation(expect_server_agrees)
            .with_expectation(expect_stars_match_clears),
        "flaky-network" => SimulationPlan::new(
            GameplayStrategy::Streaky,
            NetworkProfile::Flaky { drop_percent: 25 },
        )
        .with_max_attempts(SimulationPlan::DEFAULT_MAX_ATTEMPTS * 10)
        .with_expectation(expect_victory)
        .with_expectation(expect_server_agrees)
        .with_expectation(expect_stars_match_clears),
        "offline-fallback" => SimulationPlan::new(GameplayStrategy::CoinFlip, NetworkProfile::Down)
            .with_expectation(expect_victory)
            .with_expectation(expect_offline_session),
        _ => return None,
    };
    Some(TestScenario::simulation(name, plan))
}

fn expect_victory(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.victory(),
        "no victory after {} attempts (node {})",
        summary.steps.len(),
        summary.final_session.current_node
    );
    Ok(())
}

fn expect_server_agrees(summary: &SimulationSummary) -> Result<()> {
    match &summary.server_copy {
        Some(server) if server == &summary.final_session => Ok(()),
        Some(server) => bail!(
            "server copy at node {} stars {} differs from client at node {} stars {}",
            server.current_node,
            server.total_stars,
            summary.final_session.current_node,
            summary.final_session.total_stars
        ),
        None => bail!("server has no record of the session"),
    }
}

fn expect_perfect_run(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.steps.len() == NODE_COUNT as usize,
        "expected {NODE_COUNT} attempts, saw {}",
        summary.steps.len()
    );
    ensure!(
        summary.final_session.total_stars == NODE_COUNT * STAR_AWARD,
        "expected {} stars, saw {}",
        NODE_COUNT * STAR_AWARD,
        summary.final_session.total_stars
    );
    ensure!(summary.count(NodeResult::Mercy) == 0, "mercy granted to a perfect player");
    Ok(())
}

fn expect_mercy_only_run(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.count(NodeResult::Mercy) == NODE_COUNT as usize,
        "expected every node to end in mercy"
    );
    ensure!(summary.final_session.total_stars == 0, "stars awarded without a clear");
    ensure!(summary.final_session.mercy_mode, "mercy mode off after a mercy finish");
    Ok(())
}

fn expect_stars_match_clears(summary: &SimulationSummary) -> Result<()> {
    let cleared = u32::try_from(summary.count(NodeResult::Cleared))?;
    ensure!(
        summary.final_session.total_stars == cleared * STAR_AWARD,
        "{} stars for {cleared} cleared nodes",
        summary.final_session.total_stars
    );
    Ok(())
}

fn expect_offline_session(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.mode == SyncMode::Offline, "client did not fall back to offline play");
    ensure!(
        summary.final_session.session_id.is_offline(),
        "offline session id {} lacks the offline prefix",
        summary.final_session.session_id
    );
    ensure!(
        summary.stored_sessions == 0,
        "offline play wrote {} sessions to the server",
        summary.stored_sessions
    );
    Ok(())
}
