//! All-time spending by category, drawn as a chart.
//!
//! Unlike the list and the aggregator this view does a single fetch and
//! never refreshes on its own. A new fetch happens on [`CategoryVisualizer::load`]
//! or when the signed-in user changes.

use shared::{ChartData, ExpenseCategory};
use tracing::{error, info};

use super::chart_renderer::ChartRenderer;
use super::expense_service::ExpenseService;
use super::session::SessionHandle;
use crate::domain::models::{Amount, UserId};
use crate::storage::Connection;

const FETCH_FAILED: &str = "Failed to fetch stats.";

#[derive(Debug, Clone, PartialEq)]
pub enum VisualizerState {
    SignedOut,
    Loading,
    Empty,
    Ready(ChartData),
    Failed(String),
}

/// Category names and their totals in display units, in grouping order
pub fn chart_data(groups: &[(ExpenseCategory, Amount)]) -> ChartData {
    ChartData {
        labels: groups.iter().map(|(category, _)| category.as_str().to_string()).collect(),
        values: groups.iter().map(|(_, amount)| amount.to_f64()).collect(),
    }
}

pub struct CategoryVisualizer<C: Connection, R: ChartRenderer> {
    service: ExpenseService<C>,
    session: SessionHandle,
    renderer: R,
    user: Option<UserId>,
    state: VisualizerState,
    rendered: Option<R::Output>,
}

impl<C: Connection, R: ChartRenderer> CategoryVisualizer<C, R> {
    pub fn new(service: ExpenseService<C>, session: SessionHandle, renderer: R) -> Self {
        let user = session.user_id();
        Self {
            service,
            session,
            renderer,
            user,
            state: VisualizerState::Loading,
            rendered: None,
        }
    }

    pub fn state(&self) -> &VisualizerState {
        &self.state
    }

    /// Output of the last successful render
    pub fn rendered(&self) -> Option<&R::Output> {
        self.rendered.as_ref()
    }

    /// Fetch the user's expenses once and render them
    pub async fn load(&mut self) {
        self.rendered = None;
        let user = match &self.user {
            Some(user) => user.clone(),
            None => {
                self.state = VisualizerState::SignedOut;
                return;
            }
        };

        self.state = VisualizerState::Loading;
        let data = match self.service.chart(&user).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to fetch chart data for {}: {}", user, e);
                self.state = VisualizerState::Failed(FETCH_FAILED.to_string());
                return;
            }
        };

        if data.is_empty() {
            self.state = VisualizerState::Empty;
            return;
        }

        match self.renderer.render(&data) {
            Ok(output) => {
                info!("Rendered chart with {} categories", data.labels.len());
                self.rendered = Some(output);
                self.state = VisualizerState::Ready(data);
            }
            Err(e) => {
                error!("Chart rendering failed: {}", e);
                self.state = VisualizerState::Failed(e.to_string());
            }
        }
    }

    /// Wait for the signed-in user to change, then fetch again.
    /// Returns `false` once the session has ended.
    pub async fn reload_on_identity_change(&mut self) -> bool {
        loop {
            let user = match self.session.changed().await {
                Some(user) => user.map(|u| u.id),
                None => return false,
            };
            if user != self.user {
                self.user = user;
                self.load().await;
                return true;
            }
        }
    }
}
