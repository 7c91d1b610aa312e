//! Drives a [`MapController`] against a [`RegionSource`].
//!
//! Fetches run as tokio tasks; their results are handed back to the
//! controller between ticks, in completion order. The controller decides
//! which of them still matter.

use std::sync::Arc;

use formats::RegionCollection;
use gpu::RenderBackend;
use scene::camera::Viewport;
use serde::Deserialize;
use streaming::{Request, Transition};
use tokio::task::JoinSet;

use crate::controller::MapController;
use crate::source::{FetchError, RegionSource};

type Fetched = (Request, Result<RegionCollection, FetchError>);

/// One scripted input. Coordinates are CSS pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptStep {
    PointerMove {
        x: f64,
        y: f64,
    },
    /// Move the pointer over a feature's centroid.
    PointerOver {
        code: u32,
    },
    PointerLeave,
    DoubleClick {
        x: f64,
        y: f64,
    },
    DoubleClickOn {
        code: u32,
    },
    Resize {
        width: f64,
        height: f64,
        #[serde(default = "default_pixel_ratio")]
        pixel_ratio: f64,
    },
    Tick {
        #[serde(default = "default_dt")]
        dt: f64,
    },
    /// Wait for every in-flight fetch and deliver it.
    Settle,
}

fn default_pixel_ratio() -> f64 {
    1.0
}

fn default_dt() -> f64 {
    1.0 / 60.0
}

pub fn parse_script(payload: &str) -> Result<Vec<ScriptStep>, serde_json::Error> {
    serde_json::from_str(payload)
}

pub struct Session<B: RenderBackend> {
    controller: MapController<B>,
    source: Arc<dyn RegionSource>,
    inflight: JoinSet<Fetched>,
}

impl<B: RenderBackend> Session<B> {
    pub fn new(controller: MapController<B>, source: Arc<dyn RegionSource>) -> Self {
        Self {
            controller,
            source,
            inflight: JoinSet::new(),
        }
    }

    pub fn controller(&self) -> &MapController<B> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut MapController<B> {
        &mut self.controller
    }

    pub fn into_controller(self) -> MapController<B> {
        self.controller
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// Request the root scope and wait for it.
    pub async fn load_root(&mut self) {
        let root = self.controller.start();
        self.launch(root);
        self.settle().await;
    }

    pub fn launch(&mut self, transition: Transition) {
        let source = Arc::clone(&self.source);
        let Transition { request, scope } = transition;
        tracing::debug!(
            target: "viewer_native::session",
            request = request.0,
            code = scope.code,
            source = %source.describe(),
            "fetch started"
        );
        self.inflight
            .spawn(async move { (request, source.fetch(scope.code).await) });
    }

    /// Deliver whatever has already completed, without waiting.
    pub fn poll_ready(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(joined) = self.inflight.try_join_next() {
            self.deliver_joined(joined);
            delivered += 1;
        }
        delivered
    }

    /// Wait for every in-flight fetch.
    pub async fn settle(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(joined) = self.inflight.join_next().await {
            self.deliver_joined(joined);
            delivered += 1;
        }
        delivered
    }

    pub async fn run(&mut self, steps: &[ScriptStep]) {
        for step in steps {
            self.step(step).await;
        }
    }

    pub async fn step(&mut self, step: &ScriptStep) {
        match *step {
            ScriptStep::PointerMove { x, y } => self.controller.pointer_moved(x, y),
            ScriptStep::PointerOver { code } => match self.controller.feature_screen_px(code) {
                Some([x, y]) => self.controller.pointer_moved(x, y),
                None => tracing::warn!(target: "viewer_native::session", code, "feature not on screen"),
            },
            ScriptStep::PointerLeave => self.controller.pointer_left(),
            ScriptStep::DoubleClick { x, y } => self.double_click(x, y),
            ScriptStep::DoubleClickOn { code } => match self.controller.feature_screen_px(code) {
                Some([x, y]) => self.double_click(x, y),
                None => tracing::warn!(target: "viewer_native::session", code, "feature not on screen"),
            },
            ScriptStep::Resize {
                width,
                height,
                pixel_ratio,
            } => {
                self.controller
                    .resized(Viewport::new(width, height, pixel_ratio));
            }
            ScriptStep::Tick { dt } => {
                self.poll_ready();
                self.controller.tick(dt);
            }
            ScriptStep::Settle => {
                self.settle().await;
            }
        }
    }

    fn double_click(&mut self, x: f64, y: f64) {
        if let Some(transition) = self.controller.double_clicked(x, y) {
            self.launch(transition);
        }
    }

    fn deliver_joined(&mut self, joined: Result<Fetched, tokio::task::JoinError>) {
        match joined {
            Ok((request, result)) => {
                self.controller.deliver(request, result);
            }
            Err(err) => {
                tracing::error!(target: "viewer_native::session", error = %err, "fetch task aborted");
            }
        }
    }
}
