use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use ninja_team::agent::{Agent, AgentRegistry};
use ninja_team::engine::executor::TaskRunner;
use ninja_team::engine::ExecutionEngine;
use ninja_team::error::Result;
use ninja_team::graph::BuildGraph;
use ninja_team::ninja::{BuildOutcome, BuildTool};
use ninja_team::scheduler::{plan_tasks, TaskQueue};

/// Build tool that serves a fixed graph and records build invocations.
/// Targets may be configured to fail a number of times before succeeding.
struct RecordingTool {
    listings: Vec<(String, Vec<String>)>,
    builds: Mutex<Vec<String>>,
    failures_left: Mutex<HashMap<String, u32>>,
    build_delay: Duration,
}

impl RecordingTool {
    fn new(pairs: &[(&str, &[&str])]) -> Self {
        Self {
            listings: pairs
                .iter()
                .map(|(t, d)| (t.to_string(), d.iter().map(|s| s.to_string()).collect()))
                .collect(),
            builds: Mutex::new(Vec::new()),
            failures_left: Mutex::new(HashMap::new()),
            build_delay: Duration::from_millis(20),
        }
    }

    fn failing(self, target: &str, times: u32) -> Self {
        self.failures_left
            .lock()
            .unwrap()
            .insert(target.to_string(), times);
        self
    }

    fn graph(&self) -> BuildGraph {
        BuildGraph::from_listings(self.listings.clone())
    }

    fn build_order(&self) -> Vec<String> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildTool for RecordingTool {
    async fn list_targets(&self, _build_dir: &Path) -> Result<Vec<String>> {
        Ok(self.listings.iter().map(|(t, _)| t.clone()).collect())
    }

    async fn dependencies(&self, _build_dir: &Path, target: &str) -> Result<Vec<String>> {
        Ok(self
            .listings
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, d)| d.clone())
            .unwrap_or_default())
    }

    async fn build(&self, _build_dir: &Path, target: &str) -> Result<BuildOutcome> {
        self.builds.lock().unwrap().push(target.to_string());
        tokio::time::sleep(self.build_delay).await;

        let should_fail = {
            let mut failures = self.failures_left.lock().unwrap();
            match failures.get_mut(target) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        };

        Ok(BuildOutcome {
            success: !should_fail,
            diagnostics: if should_fail {
                format!("error: {} exploded", target)
            } else {
                String::new()
            },
        })
    }
}

fn local_agent(name: &str, cores: usize) -> Agent {
    Agent::new(name.to_string(), "localhost".to_string(), 8374, cores, 8192)
}

async fn run_engine(
    tool: Arc<RecordingTool>,
    agents: Vec<Agent>,
    max_retries: u32,
    stop: CancellationToken,
) -> Arc<RwLock<TaskQueue>> {
    let mut reg = AgentRegistry::new();
    for agent in agents {
        reg.register(agent);
    }
    let registry = Arc::new(RwLock::new(reg));

    let tasks = plan_tasks(&tool.graph(), &PathBuf::from("build"));
    let queue = Arc::new(RwLock::new(TaskQueue::new(tasks, max_retries)));

    let runner = TaskRunner::new(tool).with_remote_delay(Duration::from_millis(10));
    let engine = ExecutionEngine::new(queue.clone(), registry, runner, stop, 8);
    engine.run().await;
    queue
}

#[tokio::test]
async fn scenario_dependency_fanout_with_two_agents() {
    // Graph {A: [], B: [A], C: [A]} with two idle agents.
    let tool = Arc::new(RecordingTool::new(&[
        ("A", &[]),
        ("B", &["A"]),
        ("C", &["A"]),
    ]));
    let queue = run_engine(
        tool.clone(),
        vec![local_agent("one", 8), local_agent("two", 8)],
        3,
        CancellationToken::new(),
    )
    .await;

    let queue = queue.read().await;
    assert_eq!(queue.completed_len(), 3);
    assert_eq!(queue.failed_len(), 0);

    // A must be built first.
    assert_eq!(tool.build_order()[0], "A");

    let completed = queue.completed_tasks();
    let find = |t: &str| completed.iter().find(|x| x.target == t).unwrap();
    let a_end = find("A").end_time.unwrap();
    assert!(a_end <= find("B").start_time.unwrap());
    assert!(a_end <= find("C").start_time.unwrap());
}

#[tokio::test]
async fn dependency_chain_builds_in_order() {
    let tool = Arc::new(RecordingTool::new(&[
        ("lib.o", &[]),
        ("app", &["lib.o", "main.o"]),
        ("main.o", &[]),
    ]));
    let queue = run_engine(
        tool.clone(),
        vec![local_agent("one", 4)],
        3,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(queue.read().await.completed_len(), 3);
    let order = tool.build_order();
    assert_eq!(order.last().unwrap(), "app");
}

#[tokio::test]
async fn failing_task_is_retried_and_recovers() {
    let tool = Arc::new(RecordingTool::new(&[("flaky", &[]), ("after", &["flaky"])]).failing("flaky", 2));
    let queue = run_engine(
        tool.clone(),
        vec![local_agent("one", 4)],
        5,
        CancellationToken::new(),
    )
    .await;

    let queue = queue.read().await;
    assert_eq!(queue.completed_len(), 2);

    let flaky = queue
        .completed_tasks()
        .iter()
        .find(|t| t.target == "flaky")
        .unwrap();
    // Two failed attempts recorded before the successful third.
    assert_eq!(flaky.attempts, 2);
    assert_eq!(tool.build_order().iter().filter(|t| *t == "flaky").count(), 3);
}

#[tokio::test]
async fn exhausted_task_fails_run_without_hanging() {
    let tool = Arc::new(RecordingTool::new(&[("doomed", &[]), ("blocked", &["doomed"])]).failing("doomed", 10));
    let queue = run_engine(
        tool.clone(),
        vec![local_agent("one", 4)],
        2,
        CancellationToken::new(),
    )
    .await;

    let queue = queue.read().await;
    assert_eq!(queue.completed_len(), 0);
    // doomed exhausted its retries; blocked was drained as permanently stuck.
    assert_eq!(queue.failed_len(), 2);
}

#[tokio::test]
async fn pre_cancelled_stop_prevents_dispatch() {
    let tool = Arc::new(RecordingTool::new(&[("A", &[])]));
    let stop = CancellationToken::new();
    stop.cancel();

    let queue = run_engine(tool.clone(), vec![local_agent("one", 4)], 3, stop).await;

    assert_eq!(queue.read().await.completed_len(), 0);
    assert!(tool.build_order().is_empty());
}

#[tokio::test]
async fn remote_agent_execution_is_simulated() {
    // A single remote agent: every build is the simulated remote call, so
    // the local build tool is never invoked and everything succeeds.
    let tool = Arc::new(RecordingTool::new(&[("A", &[]), ("B", &["A"])]));
    let remote = Agent::new("builder".to_string(), "10.9.9.9".to_string(), 8374, 16, 16384);

    let queue = run_engine(tool.clone(), vec![remote], 3, CancellationToken::new()).await;

    let queue = queue.read().await;
    assert_eq!(queue.completed_len(), 2);
    assert!(tool.build_order().is_empty());
}
