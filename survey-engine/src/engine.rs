//! The participant-facing operations: open a link, view a page, submit a page.

use log::{debug, info, warn};
use uuid::Uuid;

use survey_engine_types::{
    Deployment, EngineError, NewParticipant, Page, PageAnswers, ParticipantId, Publication,
    Session, SessionIssuer, StoreError, Survey, SurveyStore,
};

use crate::bootstrap::{Bootstrap, BootstrapState};
use crate::compiler::{self, PageContract};
use crate::navigator::{self, Completion, NavState, Navigation, NavigationRequest, Navigator};
use crate::reconciler;

/// Result of opening a public link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEntry {
    pub publication: Publication,

    /// The participant taking the survey. A newly issued session must be
    /// attached to the response before anything is rendered.
    pub identity: BootstrapState,

    /// Application endpoints started for the participant.
    pub endpoints: Vec<String>,

    /// `None` for application-only publications.
    pub survey: Option<Survey>,

    /// Where the participant starts; `None` when there are no pages to serve.
    pub entry: Option<NavState>,
}

impl LinkEntry {
    pub fn participant_id(&self) -> ParticipantId {
        self.identity.participant_id()
    }

    pub fn session(&self) -> Option<&Session> {
        self.identity.session()
    }
}

/// Everything needed to render one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub page: Page,
    pub contract: PageContract,
    /// Prior answers of the participant, to pre-fill the form.
    pub defaults: PageAnswers,
    pub navigation: Navigation,
}

/// What happens after a page was submitted and saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Show the page with this order next.
    Goto(u32),
    Finished(Completion),
}

/// Runs surveys against a store and a session issuer.
pub struct SurveyEngine<S, I> {
    store: S,
    issuer: I,
}

impl<S, I> SurveyEngine<S, I>
where
    S: SurveyStore,
    I: SessionIssuer,
{
    pub fn new(store: S, issuer: I) -> Self {
        Self { store, issuer }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn issuer(&self) -> &I {
        &self.issuer
    }

    /// Open a public link.
    ///
    /// `identity` is the participant already bound to the caller's session.
    /// Without one, a participant is created from `link` and a session issued.
    /// The publication is then deployed for the participant; a publication that
    /// refuses anonymous participants fails with [`EngineError::AnonymousNotAllowed`].
    pub async fn open_link(
        &self,
        link_id: Uuid,
        identity: Option<ParticipantId>,
        link: &NewParticipant,
    ) -> Result<LinkEntry, EngineError> {
        let publication = self.publication(link_id).await?;
        let identity = Bootstrap::new(&self.store, &self.issuer)
            .run(identity, link)
            .await?;
        let Deployment { endpoints } = self
            .deploy(&publication, identity.participant_id())
            .await?;

        if publication.application_only {
            info!("link {link_id} serves the application only");
            return Ok(LinkEntry {
                publication,
                identity,
                endpoints,
                survey: None,
                entry: None,
            });
        }

        let survey = self.survey(&publication).await?;
        let entry = Navigator::new(&survey).initial();
        info!(
            "participant {} entered survey {} via link {link_id}",
            identity.participant_id(),
            survey.id
        );
        Ok(LinkEntry {
            publication,
            identity,
            endpoints,
            survey: Some(survey),
            entry: Some(entry),
        })
    }

    /// Load page `order` for a participant, with their prior answers as defaults.
    ///
    /// `order` is whatever page the caller says the participant is on. It is
    /// not checked against a position kept on the server.
    pub async fn view_page(
        &self,
        link_id: Uuid,
        participant_id: ParticipantId,
        order: u32,
    ) -> Result<PageView, EngineError> {
        let (_, survey) = self.load(link_id).await?;
        let navigator = Navigator::new(&survey);
        let (page, navigation) = page_at(&survey, &navigator, order)?;

        let stored = self.store.list_answers(participant_id).await?;
        let defaults = reconciler::prefill(page, participant_id, &stored);

        Ok(PageView {
            contract: compiler::compile(page),
            page: page.clone(),
            defaults,
            navigation,
        })
    }

    /// Validate and save a page, then move where the request leads.
    ///
    /// The navigation request is checked first and the answers second; if
    /// either is refused nothing is saved. A failed write aborts the rest.
    ///
    /// As with [`view_page`](Self::view_page), `order` is taken from the caller;
    /// a participant may submit any page of the survey, not only the one last served.
    pub async fn submit_page(
        &self,
        link_id: Uuid,
        participant_id: ParticipantId,
        order: u32,
        answers: &PageAnswers,
        request: NavigationRequest,
    ) -> Result<SubmitOutcome, EngineError> {
        let (publication, survey) = self.load(link_id).await?;
        let navigator = Navigator::new(&survey);
        let (page, _) = page_at(&survey, &navigator, order)?;

        let next = navigator.resolve(order, request)?;
        let validated = compiler::compile(page).validate(answers)?;

        let stored = self.store.list_answers(participant_id).await?;
        let writes = reconciler::plan(page, participant_id, &validated, &stored);
        let saved = reconciler::apply(&self.store, writes).await?;
        debug!(
            "participant {participant_id} saved {} answer(s) on page {order}",
            saved.len()
        );

        Ok(match next {
            NavState::Page(target) => SubmitOutcome::Goto(target),
            NavState::Finished => {
                info!("participant {participant_id} finished survey {}", survey.id);
                SubmitOutcome::Finished(navigator::completion(&publication))
            }
        })
    }

    /// Resolve a link. Unknown and unpublished links are both "not available".
    async fn publication(&self, link_id: Uuid) -> Result<Publication, EngineError> {
        self.store
            .get_publication_by_link_id(link_id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } | StoreError::Forbidden { .. } => {
                    debug!("link {link_id} unavailable: {err}");
                    EngineError::not_found(format!("survey link {link_id}"))
                }
                other => EngineError::Upstream(other),
            })
    }

    async fn deploy(
        &self,
        publication: &Publication,
        participant_id: ParticipantId,
    ) -> Result<Deployment, EngineError> {
        self.store
            .deploy_publication(publication.id, participant_id)
            .await
            .map_err(|err| match err {
                StoreError::Forbidden { .. } => {
                    warn!(
                        "publication {} refused participant {participant_id}",
                        publication.id
                    );
                    EngineError::AnonymousNotAllowed {
                        publication_id: publication.id,
                        participant_id,
                    }
                }
                other => EngineError::Upstream(other),
            })
    }

    async fn survey(&self, publication: &Publication) -> Result<Survey, EngineError> {
        self.store
            .get_survey(publication.project_id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } => EngineError::not_found(format!(
                    "survey of project {}",
                    publication.project_id
                )),
                other => EngineError::Upstream(other),
            })
    }

    /// Publication and survey behind a link that serves pages.
    async fn load(&self, link_id: Uuid) -> Result<(Publication, Survey), EngineError> {
        let publication = self.publication(link_id).await?;
        if publication.application_only {
            return Err(EngineError::not_found(format!(
                "survey pages of link {link_id}"
            )));
        }
        let survey = self.survey(&publication).await?;
        Ok((publication, survey))
    }
}

fn page_at<'a>(
    survey: &'a Survey,
    navigator: &Navigator,
    order: u32,
) -> Result<(&'a Page, Navigation), EngineError> {
    survey
        .page(order)
        .zip(navigator.navigation(order))
        .ok_or_else(|| EngineError::not_found(format!("page {order} of survey {}", survey.id)))
}
