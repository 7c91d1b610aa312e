use std::collections::BTreeMap;

use foundation::math::{LonLat, ProjectionParams};
use scene::components::{AdminLevel, FeatureMetadata};

use crate::request::Request;

/// What is being shown: an administrative code and its projection.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationScope {
    pub code: u32,
    pub params: ProjectionParams,
    /// Name of the activated region; `None` for the root scope.
    pub name: Option<String>,
}

impl NavigationScope {
    pub fn root(code: u32, params: ProjectionParams) -> Self {
        Self {
            code,
            params,
            name: None,
        }
    }
}

/// Zoom scale per administrative level. Levels without an entry have no
/// further detail.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTable {
    entries: BTreeMap<AdminLevel, f64>,
}

impl ScaleTable {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (AdminLevel, f64)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn with(mut self, level: AdminLevel, scale: f64) -> Self {
        self.entries.insert(level, scale);
        self
    }

    pub fn scale_for(&self, level: AdminLevel) -> Option<f64> {
        self.entries.get(&level).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ScaleTable {
    fn default() -> Self {
        Self::new()
            .with(AdminLevel::Province, 200.0)
            .with(AdminLevel::City, 400.0)
            .with(AdminLevel::District, 600.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub request: Request,
    pub scope: NavigationScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDetailReason {
    /// The feed reports zero child regions.
    NoChildren,
    /// The scale table has no entry for this level.
    NoScale(AdminLevel),
    /// Neither centroid nor center is available to re-target on.
    NoCentroid,
    /// The resulting projection parameters are unusable.
    InvalidParams,
}

impl std::fmt::Display for NoDetailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoDetailReason::NoChildren => write!(f, "region has no child regions"),
            NoDetailReason::NoScale(level) => write!(f, "no zoom scale configured for level {level}"),
            NoDetailReason::NoCentroid => write!(f, "region has no centroid"),
            NoDetailReason::InvalidParams => write!(f, "region yields invalid projection parameters"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrillDown {
    /// A fetch for the new scope should be started with this ticket.
    Requested(Transition),
    NoFurtherDetail { code: u32, reason: NoDetailReason },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The response matched the pending transition; the scope is now current.
    Accepted(NavigationScope),
    /// The response belongs to a superseded (or unknown) request.
    Stale,
}

/// Current scope plus at most one pending transition.
///
/// Only the most recently issued request can be accepted, so responses
/// arriving out of order never overwrite a newer scope.
#[derive(Debug, Clone)]
pub struct NavigationStateMachine {
    root: NavigationScope,
    current: NavigationScope,
    pending: Option<Transition>,
    next_request: u64,
    scales: ScaleTable,
}

impl NavigationStateMachine {
    pub fn new(root: NavigationScope, scales: ScaleTable) -> Self {
        Self {
            current: root.clone(),
            root,
            pending: None,
            next_request: 0,
            scales,
        }
    }

    /// Scope the machine was created with, regardless of later drill-downs.
    pub fn root(&self) -> &NavigationScope {
        &self.root
    }

    pub fn current(&self) -> &NavigationScope {
        &self.current
    }

    pub fn pending(&self) -> Option<&Transition> {
        self.pending.as_ref()
    }

    pub fn scales(&self) -> &ScaleTable {
        &self.scales
    }

    /// Compute the child scope for an activated feature and make it pending.
    pub fn request_drill_down(&mut self, meta: &FeatureMetadata) -> DrillDown {
        match self.child_scope(meta) {
            Ok(scope) => DrillDown::Requested(self.request_scope(scope)),
            Err(reason) => {
                tracing::debug!(target: "streaming::navigation", code = meta.code, %reason, "no further detail");
                DrillDown::NoFurtherDetail {
                    code: meta.code,
                    reason,
                }
            }
        }
    }

    /// Make `scope` the pending transition, superseding any earlier one.
    pub fn request_scope(&mut self, scope: NavigationScope) -> Transition {
        self.next_request += 1;
        let transition = Transition {
            request: Request(self.next_request),
            scope,
        };
        if let Some(prev) = self.pending.replace(transition.clone()) {
            tracing::debug!(
                target: "streaming::navigation",
                superseded = prev.request.0,
                by = transition.request.0,
                "pending transition superseded"
            );
        }
        transition
    }

    pub fn is_pending(&self, request: Request) -> bool {
        self.pending.as_ref().is_some_and(|t| t.request == request)
    }

    /// Commit the pending scope if `request` is the one we are waiting for.
    pub fn accept(&mut self, request: Request) -> TransitionOutcome {
        if !self.is_pending(request) {
            tracing::warn!(target: "streaming::navigation", request = request.0, "stale response discarded");
            return TransitionOutcome::Stale;
        }
        let Some(transition) = self.pending.take() else {
            return TransitionOutcome::Stale;
        };
        self.current = transition.scope.clone();
        TransitionOutcome::Accepted(transition.scope)
    }

    /// Drop the pending transition after its fetch failed. The current scope
    /// is untouched. Returns `false` for stale requests.
    pub fn fail(&mut self, request: Request) -> bool {
        if !self.is_pending(request) {
            return false;
        }
        self.pending = None;
        true
    }

    fn child_scope(&self, meta: &FeatureMetadata) -> Result<NavigationScope, NoDetailReason> {
        if !meta.may_have_children() {
            return Err(NoDetailReason::NoChildren);
        }
        let scale = self
            .scales
            .scale_for(meta.level)
            .ok_or(NoDetailReason::NoScale(meta.level))?;
        let center: LonLat = meta
            .centroid
            .or(meta.center)
            .ok_or(NoDetailReason::NoCentroid)?;
        let params = ProjectionParams::new(center, scale).map_err(|_| NoDetailReason::InvalidParams)?;
        Ok(NavigationScope {
            code: meta.code,
            params,
            name: Some(meta.name.clone()),
        })
    }
}
