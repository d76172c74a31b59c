//! Thread groups: prepare the plan once, then run one OS thread per virtual user

use crate::error::{ExecutionError, ExecutionResult};
use crate::executor::SampleExecutor;
use crate::stop::StopSignal;
use crate::user::{UserSummary, VirtualUser};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;
use volley_config::{EngineConfig, IncludeConfig, ThreadsConfig, VolleyConfig};
use volley_control::{
    CompiledPlan, FilePlanLoader, GeneratorFactory, PlanLoader, PlanNode, ResolutionReport,
    ResolveMode, Resolver, SharedState, Traversal, TraversalOptions,
};
use volley_core::{ThreadContext, Variables};

/// Outcome of one thread group run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub group: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub report: ResolutionReport,
    pub users: Vec<UserSummary>,
}

impl RunSummary {
    pub fn total_samples(&self) -> u64 {
        self.users.iter().map(|u| u.samples).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.users.iter().map(|u| u.failures).sum()
    }

    /// Users that stopped on an error
    pub fn failed_users(&self) -> impl Iterator<Item = &UserSummary> {
        self.users.iter().filter(|u| u.error.is_some())
    }
}

/// A plan plus the users that run it
pub struct ThreadGroup {
    pub name: String,
    pub plan: PlanNode,
    pub config: ThreadsConfig,
    engine: EngineConfig,
    include: IncludeConfig,
    variables: Variables,
    loader: Arc<dyn PlanLoader>,
    generator_factory: Option<GeneratorFactory>,
    shared: Arc<SharedState>,
}

impl ThreadGroup {
    pub fn new(plan: PlanNode, config: &VolleyConfig) -> Self {
        Self {
            name: config.threads.group_name.clone(),
            plan,
            config: config.threads.clone(),
            engine: config.engine.clone(),
            include: config.include.clone(),
            variables: Variables::new(),
            loader: Arc::new(FilePlanLoader::new(config.include.base_dir.clone())),
            generator_factory: None,
            shared: Arc::new(SharedState::new()),
        }
    }

    /// Initial variables of every virtual user
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn PlanLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_generator_factory(mut self, factory: GeneratorFactory) -> Self {
        self.generator_factory = Some(factory);
        self
    }

    /// State shared by all users: locks, throughput counters, include cache
    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Resolve modules and includes, wrap the plan in the main loop and compile it
    pub fn prepare(&self, mode: ResolveMode) -> ExecutionResult<(CompiledPlan, ResolutionReport)> {
        let mut resolver = Resolver::new(&self.plan, &*self.loader, mode);
        if self.include.cache {
            resolver = resolver.with_cache(&self.shared.includes);
        }
        let (resolved, report) = resolver.resolve(&self.plan)?;

        let main = PlanNode::loop_controller(self.name.clone(), self.config.loops, false)
            .with_child(resolved);
        let compiled = CompiledPlan::compile(&main)?;
        Ok((compiled, report))
    }

    /// Run every virtual user to completion
    ///
    /// Plan preparation errors abort before any user starts. Errors inside a
    /// user (runaway traversal, panics) end that user only and show up in its
    /// [`UserSummary`].
    pub fn run(
        &self,
        executor: Arc<dyn SampleExecutor>,
        stop: &StopSignal,
    ) -> ExecutionResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let num_threads = self.config.num_threads;
        info!(
            %run_id,
            group = %self.name,
            threads = num_threads,
            loops = self.config.loops,
            "Starting thread group"
        );

        self.shared.test_started();
        let (compiled, report) = match self.prepare(ResolveMode::Running) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(%run_id, group = %self.name, error = %e, "Thread group aborted before start");
                self.shared.test_ended();
                return Err(e);
            }
        };
        let plan = Arc::new(compiled);
        let deadline = self.config.duration.map(|d| Instant::now() + d);
        let options = TraversalOptions {
            max_steps: self.engine.max_steps_per_call,
            seed: self.engine.random_seed,
            generator_factory: self.generator_factory.clone(),
            yield_idle_passes: true,
        };
        // Only an endless run without a duration can wait on an idle plan forever
        let idle_limit = (self.config.loops < 0 && deadline.is_none())
            .then_some(self.engine.max_idle_passes);

        let mut handles = Vec::with_capacity(num_threads);
        let mut spawn_error = None;
        for thread_num in 0..num_threads {
            let thread_name = format!("{} 1-{}", self.name, thread_num + 1);
            let ctx = ThreadContext::new(thread_num, thread_name.clone())
                .with_vars(self.variables.clone());
            let delay = ramp_up_delay(self.config.ramp_up, thread_num, num_threads);
            let plan = plan.clone();
            let shared = self.shared.clone();
            let executor = executor.clone();
            let stop_user = stop.clone();
            let options = options.clone();

            let spawned = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    if !stop_user.sleep(delay) {
                        return UserSummary::new(&ctx);
                    }
                    let traversal = Traversal::new(plan, shared, &ctx, options);
                    let mut user = VirtualUser::new(ctx, traversal, executor, stop_user, deadline);
                    if let Some(limit) = idle_limit {
                        user = user.with_idle_limit(limit);
                    }
                    user.run()
                });
            match spawned {
                Ok(handle) => handles.push((thread_num, thread_name, handle)),
                Err(e) => {
                    error!(thread = %thread_name, error = %e, "Failed to spawn virtual user");
                    stop.stop();
                    spawn_error = Some(ExecutionError::ThreadSpawn {
                        name: thread_name,
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        let users = handles
            .into_iter()
            .map(|(thread_num, thread_name, handle)| match handle.join() {
                Ok(summary) => summary,
                Err(_) => {
                    error!(thread = %thread_name, "Virtual user panicked");
                    UserSummary::panicked(thread_num, thread_name)
                }
            })
            .collect::<Vec<_>>();
        self.shared.test_ended();

        if let Some(e) = spawn_error {
            return Err(e);
        }

        let summary = RunSummary {
            run_id,
            group: self.name.clone(),
            started_at,
            finished_at: Utc::now(),
            report,
            users,
        };
        info!(
            %run_id,
            group = %self.name,
            samples = summary.total_samples(),
            failures = summary.total_failures(),
            "Thread group finished"
        );
        Ok(summary)
    }
}

/// Start offset of user `thread_num` when `num_threads` users start over `ramp_up`
fn ramp_up_delay(ramp_up: Duration, thread_num: usize, num_threads: usize) -> Duration {
    if num_threads == 0 {
        return Duration::ZERO;
    }
    ramp_up * thread_num as u32 / num_threads as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_up_spreads_starts() {
        let ramp = Duration::from_secs(30);
        assert_eq!(ramp_up_delay(ramp, 0, 3), Duration::ZERO);
        assert_eq!(ramp_up_delay(ramp, 1, 3), Duration::from_secs(10));
        assert_eq!(ramp_up_delay(ramp, 2, 3), Duration::from_secs(20));
        assert_eq!(ramp_up_delay(Duration::ZERO, 5, 10), Duration::ZERO);
    }

    #[test]
    fn test_prepare_wraps_plan_in_main_loop() {
        let config = VolleyConfig::default();
        let plan = PlanNode::simple("plan").with_child(PlanNode::sampler("home"));
        let group = ThreadGroup::new(plan, &config);

        let (compiled, report) = group.prepare(ResolveMode::Validating).unwrap();
        assert!(report.is_clean());
        assert_eq!(compiled.node(compiled.root()).name, config.threads.group_name);
        assert_eq!(compiled.len(), 3);
    }
}
