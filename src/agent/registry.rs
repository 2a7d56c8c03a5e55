use chrono::{DateTime, Duration, Utc};

pub const LOCAL_HOST: &str = "localhost";

/// An agent silent for this many heartbeat intervals is marked unavailable.
const STALE_INTERVALS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Busy,
    Unavailable,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A worker endpoint capable of executing one build task at a time.
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub cores: usize,
    pub status: AgentStatus,
    /// Target of the task this agent is executing. Set exactly while busy.
    pub current_task: Option<String>,
    /// Available memory in MB, as reported at discovery time.
    pub available_memory: u64,
    pub last_seen: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: String, host: String, port: u16, cores: usize, available_memory: u64) -> Self {
        Self {
            name,
            host,
            port,
            cores,
            status: AgentStatus::Idle,
            current_task: None,
            available_memory,
            last_seen: Utc::now(),
        }
    }

    /// The local agent is always reachable and exempt from staleness checks.
    pub fn is_local(&self) -> bool {
        self.host == LOCAL_HOST
    }
}

/// Tracks known agents and their reservation state.
///
/// Held behind a lock by the orchestrator; each method is one critical
/// section, so a reserve is an atomic check-and-set and two workers can never
/// claim the same agent.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    // Vec keeps registration order, which breaks reservation ties
    // deterministically.
    agents: Vec<Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an agent, replacing any existing agent with the same name.
    pub fn register(&mut self, agent: Agent) {
        tracing::info!(
            name = %agent.name,
            host = %agent.host,
            cores = agent.cores,
            memory_mb = agent.available_memory,
            "Registered build agent"
        );
        if let Some(existing) = self.agents.iter_mut().find(|a| a.name == agent.name) {
            *existing = agent;
        } else {
            self.agents.push(agent);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn all_agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Reserve the idle agent with the most cores for the given target.
    ///
    /// Ties go to the earliest-registered agent. Returns a snapshot of the
    /// reserved agent, or `None` when no agent is idle. The check and the
    /// transition to busy happen in this single call.
    pub fn reserve_best(&mut self, target: &str) -> Option<Agent> {
        let mut best: Option<usize> = None;
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.status != AgentStatus::Idle {
                continue;
            }
            match best {
                Some(b) if self.agents[b].cores >= agent.cores => {}
                _ => best = Some(i),
            }
        }

        let idx = best?;
        let agent = &mut self.agents[idx];
        agent.status = AgentStatus::Busy;
        agent.current_task = Some(target.to_string());
        Some(agent.clone())
    }

    /// Return an agent to the idle pool and detach its task.
    pub fn release(&mut self, name: &str) {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.name == name) {
            agent.status = AgentStatus::Idle;
            agent.current_task = None;
        }
    }

    /// Record a heartbeat. An unavailable agent that reports in is revived.
    pub fn mark_heartbeat(&mut self, name: &str, now: DateTime<Utc>) {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.name == name) {
            agent.last_seen = now;
            if agent.status == AgentStatus::Unavailable {
                tracing::info!(name = %agent.name, "Agent recovered");
                agent.status = AgentStatus::Idle;
                agent.current_task = None;
            }
        }
    }

    /// Demote remote agents that have been silent for three intervals.
    ///
    /// The local agent is refreshed instead, since it is always reachable.
    /// Agents are never removed, so a stale agent can recover on a later
    /// heartbeat. Returns the names of agents demoted by this sweep.
    pub fn mark_stale(&mut self, now: DateTime<Utc>, interval: Duration) -> Vec<String> {
        let mut demoted = Vec::new();
        for agent in &mut self.agents {
            if agent.is_local() {
                agent.last_seen = now;
                continue;
            }
            if agent.status != AgentStatus::Unavailable
                && now - agent.last_seen > interval * STALE_INTERVALS
            {
                tracing::warn!(
                    name = %agent.name,
                    last_seen = %agent.last_seen,
                    "Agent missed heartbeats, marking unavailable"
                );
                if let Some(target) = &agent.current_task {
                    // Known gap: the in-flight task is not requeued here.
                    tracing::warn!(
                        name = %agent.name,
                        target = %target,
                        "Unavailable agent still holds a running task"
                    );
                }
                agent.status = AgentStatus::Unavailable;
                demoted.push(agent.name.clone());
            }
        }
        demoted
    }

    pub fn idle_count(&self) -> usize {
        self.agents
            .iter()
            .filter(|a| a.status == AgentStatus::Idle)
            .count()
    }

    pub fn busy_agents(&self) -> Vec<&Agent> {
        self.agents
            .iter()
            .filter(|a| a.status == AgentStatus::Busy)
            .collect()
    }
}
