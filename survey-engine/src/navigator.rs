//! The page state machine: `Page(1)..=Page(N)` plus a terminal `Finished`.
//!
//! Targets are always derived from the current state. A client may ask to go
//! somewhere, but only the immediate neighbors the machine allows are ever
//! granted.

use log::debug;
use survey_engine_types::{NavigationError, Publication, Survey};

/// Where a participant stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// On the page with this 1-based order.
    Page(u32),
    Finished,
}

/// What the client asked for when submitting a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationRequest {
    /// Go to the page with this order.
    Page(u32),
    /// Leave the last page and finish.
    Finish,
}

impl NavigationRequest {
    /// Parse the submitted `navigation` form field: a page order or `finish`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            // "finnish" is what older forms send.
            "finish" | "finnish" => Some(Self::Finish),
            other => other.parse().ok().map(Self::Page),
        }
    }
}

/// What the participant sees after the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Redirect(String),
    Render,
}

/// The terminal action for a publication.
pub fn completion(publication: &Publication) -> Completion {
    match publication.redirect_target() {
        Some(url) => Completion::Redirect(url.to_string()),
        None => Completion::Render,
    }
}

/// Neighbors of the current page, as offered to the page view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub current: u32,
    /// `None` on the first page and on pages that disable going back.
    pub prev_page_id: Option<u32>,
    /// `None` on the last page.
    pub next_page_id: Option<u32>,
}

impl Navigation {
    pub fn is_last(&self) -> bool {
        self.next_page_id.is_none()
    }
}

/// The state machine for one survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    /// `back_button_disabled` per page, index `order - 1`.
    back_disabled: Vec<bool>,
}

impl Navigator {
    pub fn new(survey: &Survey) -> Self {
        Self::from_flags(
            survey
                .pages()
                .iter()
                .map(|page| page.back_button_disabled)
                .collect(),
        )
    }

    /// Build from the `back_button_disabled` flag of each page, in order.
    pub fn from_flags(back_disabled: Vec<bool>) -> Self {
        Self { back_disabled }
    }

    /// Number of pages, `N`.
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.back_disabled.len()).unwrap_or(u32::MAX)
    }

    /// `Page(1)`, or `Finished` for a survey without pages.
    pub fn initial(&self) -> NavState {
        if self.page_count() == 0 {
            NavState::Finished
        } else {
            NavState::Page(1)
        }
    }

    /// Check if `order` names a page of this survey.
    pub fn contains(&self, order: u32) -> bool {
        (1..=self.page_count()).contains(&order)
    }

    /// Check if `retreat` is available from `Page(order)`.
    ///
    /// The flag of the page being left decides; the page being entered does not matter.
    pub fn can_retreat(&self, order: u32) -> bool {
        order > 1 && self.contains(order) && !self.back_disabled[order as usize - 1]
    }

    /// Neighbors of `Page(order)`, or `None` if there is no such page.
    pub fn navigation(&self, order: u32) -> Option<Navigation> {
        if !self.contains(order) {
            return None;
        }
        Some(Navigation {
            current: order,
            prev_page_id: self.can_retreat(order).then(|| order - 1),
            next_page_id: (order < self.page_count()).then(|| order + 1),
        })
    }

    /// Move forward after a successful submission.
    pub fn advance(&self, state: NavState) -> Result<NavState, NavigationError> {
        match state {
            NavState::Finished => Err(NavigationError::AlreadyFinished),
            NavState::Page(order) if order < self.page_count() => Ok(NavState::Page(order + 1)),
            NavState::Page(_) => Ok(NavState::Finished),
        }
    }

    /// Move back one page, if the current page allows it.
    pub fn retreat(&self, state: NavState) -> Result<NavState, NavigationError> {
        match state {
            NavState::Finished => Err(NavigationError::AlreadyFinished),
            NavState::Page(order) if order <= 1 => Err(NavigationError::AtFirstPage(order)),
            NavState::Page(order) if !self.can_retreat(order) => {
                Err(NavigationError::BackDisabled(order))
            }
            NavState::Page(order) => Ok(NavState::Page(order - 1)),
        }
    }

    /// Turn a client request on `Page(current)` into the next state.
    ///
    /// Granted: the next page, the previous page when `retreat` allows it,
    /// staying put, and `Finish` from the last page. Everything else is refused.
    pub fn resolve(
        &self,
        current: u32,
        request: NavigationRequest,
    ) -> Result<NavState, NavigationError> {
        let state = NavState::Page(current);
        let next = match request {
            NavigationRequest::Finish if current == self.page_count() => self.advance(state),
            NavigationRequest::Finish => Err(NavigationError::NotLastPage { current }),
            NavigationRequest::Page(target) if target == current => Ok(state),
            NavigationRequest::Page(target)
                if current.checked_add(1) == Some(target) && target <= self.page_count() =>
            {
                self.advance(state)
            }
            NavigationRequest::Page(target) if current.checked_sub(1) == Some(target) => {
                self.retreat(state)
            }
            NavigationRequest::Page(target) => Err(NavigationError::Unreachable {
                current,
                requested: target,
            }),
        };
        debug!("navigation from page {current} with {request:?}: {next:?}");
        next
    }
}
