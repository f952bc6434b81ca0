//! Settle barrier and wait protocol for the stock grid
//!
//! The grid re-renders asynchronously after searches, filter changes and
//! quantity edits. Every state-changing action goes through [`GridSync`],
//! which starts the action and the "loader appeared" wait together, then waits
//! for the loader to go away. A loader that never shows up within the grace
//! window is taken as a round trip that finished before it could be observed.
//!
//! ```text
//! Idle --(filter)--------> Loading --(loader hidden)----------------> Idle
//! Idle --(panel toggle)--> PanelTransitioning --(aria matches)------> Idle
//! Idle --(quantity edit)-> Loading --(loader hidden, alert shown)--> Notified --(dismiss)--> Idle
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::GridResult;
use crate::locator::Locator;
use crate::page::PageDriver;

/// Where the grid is in its re-render cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridState {
    #[default]
    Idle,
    Loading,
    PanelTransitioning,
    Notified,
}

impl fmt::Display for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GridState::Idle => "IDLE",
            GridState::Loading => "LOADING",
            GridState::PanelTransitioning => "PANEL_TRANSITIONING",
            GridState::Notified => "NOTIFIED",
        };
        f.write_str(s)
    }
}

/// Outcome of one pass through the settle barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    /// Whether the loader was seen before it cleared
    pub loader_observed: bool,
    pub elapsed: Duration,
}

pub struct GridSync {
    config: SyncConfig,
    state: Mutex<GridState>,
}

impl GridSync {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            state: Mutex::new(GridState::Idle),
        }
    }

    /// Bound used for every individual wait
    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    pub fn state(&self) -> GridState {
        *self.state.lock()
    }

    fn enter(&self, next: GridState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!("grid {} -> {}", *state, next);
            *state = next;
        }
    }

    /// Run `trigger` and return once `indicator` has finished its
    /// appear/disappear cycle.
    pub async fn settle<D, F>(&self, driver: &D, trigger: F, indicator: &Locator) -> GridResult<Settled>
    where
        D: PageDriver + ?Sized,
        F: Future<Output = GridResult<()>>,
    {
        let settled = self.barrier(driver, trigger, indicator).await?;
        self.enter(GridState::Idle);
        Ok(settled)
    }

    /// The settle barrier without the final transition, so composite
    /// operations can move on from `Loading` themselves.
    async fn barrier<D, F>(&self, driver: &D, trigger: F, indicator: &Locator) -> GridResult<Settled>
    where
        D: PageDriver + ?Sized,
        F: Future<Output = GridResult<()>>,
    {
        let start = Instant::now();
        self.enter(GridState::Loading);

        // The grace window only starts once the trigger has landed; a click
        // that waits for actionability must not use it up.
        let appeared = driver.wait_for_visible(indicator, self.timeout());
        tokio::pin!(trigger);
        tokio::pin!(appeared);

        let mut early = None;
        let triggered = loop {
            tokio::select! {
                result = &mut trigger => break result,
                result = &mut appeared, if early.is_none() => early = Some(result),
            }
        };
        triggered?;

        let appeared = match early {
            Some(result) => Some(result),
            None => tokio::time::timeout(self.config.appear_grace(), &mut appeared).await.ok(),
        };
        let loader_observed = match appeared {
            Some(Ok(())) => true,
            Some(Err(e)) if !e.is_timeout() => return Err(e),
            _ => {
                debug!("{} not seen within {} ms, assuming fast round trip", indicator, self.config.appear_grace_ms);
                false
            }
        };

        driver.wait_for_hidden(indicator, self.timeout()).await.map_err(|e| {
            warn!("{} did not clear: {}", indicator, e);
            e
        })?;

        let settled = Settled {
            loader_observed,
            elapsed: start.elapsed(),
        };
        debug!(
            "settled on {} in {} ms (loader observed: {})",
            indicator,
            settled.elapsed.as_millis(),
            settled.loader_observed
        );
        Ok(settled)
    }

    /// Wait until `indicator` is hidden, without triggering anything
    pub async fn wait_settled<D>(&self, driver: &D, indicator: &Locator) -> GridResult<()>
    where
        D: PageDriver + ?Sized,
    {
        driver.wait_for_hidden(indicator, self.timeout()).await
    }

    /// Run `trigger` and wait for `locator`'s `name` attribute to equal `value`.
    ///
    /// Used for transitions that do not reload rows, such as opening the
    /// advanced filter panel.
    pub async fn await_attribute<D, F>(
        &self,
        driver: &D,
        trigger: F,
        locator: &Locator,
        name: &str,
        value: &str,
    ) -> GridResult<()>
    where
        D: PageDriver + ?Sized,
        F: Future<Output = GridResult<()>>,
    {
        self.enter(GridState::PanelTransitioning);
        let expected = driver.wait_for_attribute_equals(locator, name, value, self.timeout());
        let (triggered, reached) = tokio::join!(trigger, expected);
        triggered?;
        reached?;
        self.enter(GridState::Idle);
        Ok(())
    }

    /// Run `trigger` through the settle barrier, then read and dismiss the
    /// confirmation notification it raises. Returns the notification text.
    pub async fn settle_and_acknowledge<D, F>(
        &self,
        driver: &D,
        trigger: F,
        indicator: &Locator,
        notification: &Locator,
        dismiss: &Locator,
    ) -> GridResult<String>
    where
        D: PageDriver + ?Sized,
        F: Future<Output = GridResult<()>>,
    {
        self.barrier(driver, trigger, indicator).await?;

        driver.wait_for_visible(notification, self.timeout()).await?;
        self.enter(GridState::Notified);

        let text = driver.read_text(notification, self.timeout()).await?;
        debug!("notification: {}", text);

        driver.click(dismiss, self.timeout()).await?;
        driver.wait_for_hidden(notification, self.timeout()).await?;
        self.enter(GridState::Idle);
        Ok(text)
    }
}
