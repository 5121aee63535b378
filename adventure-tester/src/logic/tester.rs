use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::simulation::{SimulationPlan, SimulationSummary, run_plan};
use crate::scenarios::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub async fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (player: {} network: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    scenario.plan.network,
                    seed
                );
            }

            results.push(self.run_single_scenario(scenario, seed, iterations).await);
        }

        results
    }

    async fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let (successes, failures, performance_data) =
            self.run_simulation_iterations(&scenario.plan, seed, iterations).await;

        let avg_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration: avg_duration,
            performance_data,
        }
    }

    async fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> (usize, Vec<String>, Vec<Duration>) {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match run_plan(plan, iteration_seed).await {
                Ok(summary) => summary,
                Err(err) => {
                    failures.push(format!(
                        "Iteration {} (seed {iteration_seed}): simulation aborted: {err:#}",
                        i + 1
                    ));
                    continue;
                }
            };

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let session = &summary.final_session;
                failures.push(format!(
                    "Iteration {} (player {}, network {}, seed {}, attempts {}, status {}): {} | {} | final node {} stars {} mercy {}",
                    i + 1,
                    summary.strategy,
                    summary.network,
                    summary.seed,
                    summary.steps.len(),
                    summary.status_label(),
                    err,
                    summarize_recent_steps(&summary),
                    session.current_node,
                    session.total_stars,
                    session.mercy_mode
                ));

                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.clone().red()
                    );
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) attempts:{} retries:{} drops:{} stars:{} mode:{:?}",
                        i + 1,
                        iterations,
                        summary.steps.len(),
                        summary.retries(),
                        summary.transport_errors,
                        summary.final_session.total_stars,
                        summary.mode
                    );
                }
            }
        }

        (successes, failures, performance_data)
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    if let Some(violation) = summary.violations.first() {
        return Some(format!("invariant violated: {violation}"));
    }
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn summarize_recent_steps(summary: &SimulationSummary) -> String {
    if summary.steps.is_empty() {
        return "no attempts recorded".to_string();
    }

    summary
        .steps
        .iter()
        .rev()
        .take(3)
        .map(|step| {
            let result = match (&step.transition, &step.error) {
                (Some(transition), _) => format!("{transition:?}"),
                (None, Some(error)) => format!("error: {error}"),
                (None, None) => "-".to_string(),
            };
            format!(
                "node {} ({}) -> {result}",
                step.node,
                if step.passed { "pass" } else { "fail" }
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
