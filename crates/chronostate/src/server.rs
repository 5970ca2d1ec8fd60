//! The state server: prefix lifecycle and dispatch.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chronostate_core::segment::{segment_at, Segment};
use chronostate_core::{encode_payload, Name};
use chronostate_face::{Data, Face, Interest, InterestHandler, RegisteredPrefixId};
use chronostate_store::Stores;
use serde::Serialize;

use crate::config::StateServerConfig;
use crate::error::Result;
use crate::handlers::{self, restore::RestoreLocks};
use crate::router::{Request, RouteTable, Scope};
use crate::scheduler::Scheduler;

/// Everything a handler needs, shared between the network context and
/// the scheduler's workers.
pub(crate) struct ServerContext {
    pub(crate) face: Arc<dyn Face>,
    pub(crate) stores: Stores,
    pub(crate) config: StateServerConfig,
    pub(crate) restore_locks: RestoreLocks,
    routes: RouteTable,
    scheduler: Scheduler,
    info_prefix: Name,
    cmd_prefix: Name,
}

impl ServerContext {
    /// Network-context entry point. Routes and schedules; never blocks.
    fn on_interest(self: &Arc<Self>, scope: Scope, interest: Interest) {
        let prefix = match scope {
            Scope::Info => &self.info_prefix,
            Scope::Cmd => &self.cmd_prefix,
        };
        let Some(suffix) = interest.name.strip_prefix(prefix) else {
            return;
        };
        let Some(request) = self.routes.resolve(scope, suffix) else {
            tracing::debug!(name = %interest.name, "ignoring unrecognized request");
            return;
        };

        tracing::debug!(name = %interest.name, ?request, "dispatching request");
        let ctx = self.clone();
        let name = interest.name;
        if !self.scheduler.schedule(async move { ctx.execute(name, request).await }) {
            tracing::debug!("scheduler stopped, dropping request");
        }
    }

    /// Worker-context body of every request.
    async fn execute(&self, name: Name, request: Request) {
        let result = match request {
            Request::State { .. } => handlers::state::execute(self, &name).await,
            Request::Actions { file, segment, .. } => {
                handlers::actions::execute(self, &name, file.as_deref(), segment).await
            }
            Request::FileState { segment, .. } => {
                handlers::filestate::execute(self, &name, segment).await
            }
            Request::Restore { args } => handlers::restore::execute(self, &name, &args).await,
        };

        if let Err(e) = result {
            tracing::warn!(name = %name, error = %e, "request failed, no response published");
        }
    }

    /// Publish one payload under `name`.
    pub(crate) async fn publish<P: Serialize>(
        &self,
        name: &Name,
        payload: &P,
        final_segment: Option<u64>,
    ) -> Result<()> {
        let content = encode_payload(payload, self.config.payload_format)?;
        let mut data = Data::new(name.clone(), content).with_freshness(self.config.freshness);
        if let Some(last) = final_segment {
            data = data.with_final_segment(last);
        }
        self.face.put_data(data).await?;
        Ok(())
    }

    /// Publish a command outcome. Command names carry no nonce, so the
    /// packet is stale on arrival and a resubmitted command reaches the
    /// server again instead of a cached answer.
    pub(crate) async fn publish_outcome<P: Serialize>(&self, name: &Name, payload: &P) -> Result<()> {
        let content = encode_payload(payload, self.config.payload_format)?;
        let data = Data::new(name.clone(), content).with_freshness(Some(Duration::ZERO));
        self.face.put_data(data).await?;
        Ok(())
    }

    /// Cut segment `index` out of a fully enumerated listing and publish it.
    ///
    /// Returns `false` without publishing if `index` is past the last segment.
    pub(crate) async fn publish_segment<R, P>(
        &self,
        name: &Name,
        records: &[R],
        index: u64,
    ) -> Result<bool>
    where
        R: Clone,
        P: From<Segment<R>> + Serialize,
    {
        let Some(segment) = segment_at(records, self.config.page_limit, index) else {
            tracing::debug!(name = %name, index, total = records.len(), "segment out of range");
            return Ok(false);
        };
        let last = segment.last_index;
        let count = segment.records.len();
        self.publish(name, &P::from(segment), Some(last)).await?;
        tracing::trace!(name = %name, index, last, count, "published segment");
        Ok(true)
    }
}

/// Serves a sync node's state to local consumers.
///
/// Registers the query and command prefixes on start. Handler bodies run on
/// the server's own [`Scheduler`], never on the face's delivery context.
pub struct StateServer {
    ctx: Arc<ServerContext>,
    registrations: Mutex<Vec<RegisteredPrefixId>>,
}

impl StateServer {
    /// Validate `config`, then register both prefixes on `face`.
    ///
    /// Must be called within a tokio runtime.
    pub async fn start(face: Arc<dyn Face>, stores: Stores, config: StateServerConfig) -> Result<Self> {
        config.validate()?;

        let ctx = Arc::new(ServerContext {
            info_prefix: config.info_prefix(),
            cmd_prefix: config.cmd_prefix(),
            scheduler: Scheduler::new(config.workers),
            routes: RouteTable::new(),
            restore_locks: RestoreLocks::default(),
            face: face.clone(),
            stores,
            config,
        });

        let info = face
            .register_prefix(ctx.info_prefix.clone(), handler(&ctx, Scope::Info))
            .await?;
        let cmd = match face
            .register_prefix(ctx.cmd_prefix.clone(), handler(&ctx, Scope::Cmd))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                let _ = face.unregister_prefix(info).await;
                ctx.scheduler.shutdown().await;
                return Err(e.into());
            }
        };

        tracing::info!(
            info = %ctx.info_prefix,
            cmd = %ctx.cmd_prefix,
            workers = ctx.config.workers,
            "state server started"
        );

        Ok(Self {
            ctx,
            registrations: Mutex::new(vec![info, cmd]),
        })
    }

    /// Prefix queries are served under.
    pub fn info_prefix(&self) -> &Name {
        &self.ctx.info_prefix
    }

    /// Prefix commands are accepted under.
    pub fn cmd_prefix(&self) -> &Name {
        &self.ctx.cmd_prefix
    }

    pub fn config(&self) -> &StateServerConfig {
        &self.ctx.config
    }

    /// Number of scheduled requests that have finished executing.
    pub fn completed_requests(&self) -> u64 {
        self.ctx.scheduler.completed()
    }

    /// Deregister both prefixes, then let in-flight requests finish.
    pub async fn shutdown(&self) -> Result<()> {
        let ids = self.take_registrations();
        let mut first_err = None;
        for id in ids {
            if let Err(e) = self.ctx.face.unregister_prefix(id).await {
                first_err.get_or_insert(e);
            }
        }
        self.ctx.scheduler.shutdown().await;
        tracing::info!(info = %self.ctx.info_prefix, "state server stopped");

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn take_registrations(&self) -> Vec<RegisteredPrefixId> {
        std::mem::take(&mut *self.registrations.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Drop for StateServer {
    fn drop(&mut self) {
        let ids = self.take_registrations();
        if ids.is_empty() {
            return;
        }
        // Handlers only hold a weak reference, so they go inert regardless;
        // this just tidies the face's table when a runtime is available.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let face = self.ctx.face.clone();
            runtime.spawn(async move {
                for id in ids {
                    let _ = face.unregister_prefix(id).await;
                }
            });
        }
    }
}

fn handler(ctx: &Arc<ServerContext>, scope: Scope) -> InterestHandler {
    let ctx: Weak<ServerContext> = Arc::downgrade(ctx);
    Arc::new(move |_prefix: &Name, interest: Interest| {
        if let Some(ctx) = ctx.upgrade() {
            ctx.on_interest(scope, interest);
        }
    })
}
