use super::open_session;
use crate::context::AppContext;
use crate::output::Output;
use clap::{ArgAction, Args, ValueEnum};
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use media_compose_core::{
    Composer, ComposerSession, StepOutcome, SubmissionReport, SubmissionStatus, ValidationError,
};
use media_compose_models::{
    Action, AttachmentTarget, EpisodeSelection, Intent, MediaReference, MediaType, Rating, Visibility,
};
use owo_colors::OwoColorize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntentArg {
    Capture,
    Say,
    Play,
}

impl From<IntentArg> for Intent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Capture => Intent::Capture,
            IntentArg::Say => Intent::Say,
            IntentArg::Play => Intent::Play,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Track,
    #[value(alias = "thought")]
    Post,
    HotTake,
    Poll,
    AskForRecs,
    Rank,
    Challenge,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Track => Action::Track,
            ActionArg::Post => Action::Post,
            ActionArg::HotTake => Action::HotTake,
            ActionArg::Poll => Action::Poll,
            ActionArg::AskForRecs => Action::AskForRecs,
            ActionArg::Rank => Action::Rank,
            ActionArg::Challenge => Action::Challenge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VisibilityArg {
    Public,
    Followers,
    Private,
}

impl From<VisibilityArg> for Visibility {
    fn from(arg: VisibilityArg) -> Self {
        match arg {
            VisibilityArg::Public => Visibility::Public,
            VisibilityArg::Followers => Visibility::Followers,
            VisibilityArg::Private => Visibility::Private,
        }
    }
}

#[derive(Debug, Args)]
pub struct ComposeArgs {
    /// What you want to do; defaults to the intent the action belongs to
    #[arg(long, value_enum)]
    pub intent: Option<IntentArg>,

    /// Composition type (required for the play intent)
    #[arg(long, value_enum)]
    pub action: Option<ActionArg>,

    /// Post body, poll question or challenge text
    #[arg(long)]
    pub content: Option<String>,

    /// External id of the media this is about
    #[arg(long, requires = "media_type")]
    pub media_id: Option<String>,

    /// Display title of the media (defaults to the id)
    #[arg(long, requires = "media_id")]
    pub media_title: Option<String>,

    /// movie, tv, book, music, podcast or game
    #[arg(long, requires = "media_id")]
    pub media_type: Option<String>,

    /// Catalog the id comes from (defaults per media type)
    #[arg(long, requires = "media_id")]
    pub source: Option<String>,

    /// Season to log (TV only)
    #[arg(long, requires = "media_id")]
    pub season: Option<u32>,

    /// Episode number within --season
    #[arg(long, requires = "season")]
    pub episode: Option<u32>,

    /// Star rating, 0 to 5 in half steps
    #[arg(long)]
    pub rating: Option<f32>,

    /// Poll option (repeat for each option)
    #[arg(long = "option", value_name = "TEXT")]
    pub options: Vec<String>,

    /// List to track into, by id or title (defaults to the configured system list)
    #[arg(long)]
    pub list: Option<String>,

    /// Rank to add the media to, by id or title
    #[arg(long)]
    pub rank: Option<String>,

    /// Also announce a track or rank entry in the feed
    #[arg(long, action = ArgAction::SetTrue)]
    pub post_to_feed: bool,

    /// Mark the post as containing spoilers
    #[arg(long, action = ArgAction::SetTrue)]
    pub spoilers: bool,

    #[arg(long, value_enum, default_value = "public")]
    pub visibility: VisibilityArg,
}

impl ComposeArgs {
    fn intent(&self) -> Result<Intent> {
        match (self.intent, self.action) {
            (Some(intent), _) => Ok(intent.into()),
            (None, Some(action)) => Ok(Action::from(action).intent()),
            (None, None) => Err(eyre!("Pass --intent, --action, or both")),
        }
    }

    fn media(&self) -> Result<Option<MediaReference>> {
        let (Some(id), Some(kind)) = (&self.media_id, &self.media_type) else {
            return Ok(None);
        };
        let media_type = MediaType::parse_loose(kind).ok_or_else(|| eyre!("Unknown media type '{}'", kind))?;
        let source = self
            .source
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| media_type.default_source().to_string());
        let title = self.media_title.clone().unwrap_or_else(|| id.clone());
        Ok(Some(MediaReference::new(title, media_type, id.clone(), source)))
    }
}

pub async fn run_compose(ctx: &AppContext, offline: bool, args: ComposeArgs, output: &Output) -> Result<()> {
    let session = open_session(ctx, offline)?;
    let composer = session.composer();

    build_draft(&session, &composer, &args).await?;

    if let Err(rule) = composer.validate() {
        output.error(format!("Not ready to submit: {} ({})", describe_rule(rule), rule.code()));
        return Err(eyre!("Draft failed validation: {}", rule));
    }

    let report = composer.submit().await.wrap_err("Submission was refused")?;
    render_report(&report, output);

    match report.error() {
        None => Ok(()),
        Some(e) if report.status == SubmissionStatus::PartiallyFailed => {
            output.warn(format!("{}; the main action was saved", e));
            Ok(())
        }
        Some(e) => Err(eyre!(e)),
    }
}

async fn build_draft(session: &ComposerSession, composer: &Composer, args: &ComposeArgs) -> Result<()> {
    let intent = args.intent()?;
    composer.select_intent(intent)?;
    if let Some(action) = args.action.map(Action::from) {
        if !composer.select_action(action) {
            return Err(eyre!("Action '{}' is not available for intent '{}'", action, intent));
        }
    }

    if let Some(media) = args.media()? {
        debug!(media = %media.key(), "Attaching media");
        composer.set_media(Some(media)).await.wrap_err("Failed to set media")?;
    }

    if let Some(season) = args.season {
        let episodes = composer
            .select_season(season)
            .await
            .wrap_err_with(|| format!("Failed to load season {}", season))?;
        if let Some(number) = args.episode {
            let episode = episodes
                .iter()
                .find(|e| e.number == number)
                .ok_or_else(|| eyre!("Season {} has no episode {}", season, number))?;
            composer.select_episode(Some(EpisodeSelection::from(episode)))?;
        }
    }

    let rating = args.rating.map(Rating::new).transpose()?;
    composer.edit(|draft| {
        if let Some(content) = &args.content {
            draft.set_content(content.as_str())?;
        }
        draft.set_spoilers(args.spoilers)?;
        draft.set_visibility(args.visibility.into())?;
        draft.set_rating(rating)?;
        if !args.options.is_empty() {
            draft.set_poll_options(args.options.clone())?;
        }
        draft.set_post_to_feed(args.post_to_feed)
    })?;

    if let Some(selector) = &args.list {
        let target = resolve(session, selector).await?;
        composer.edit(|draft| draft.attach_list(Some(target)))?;
    }
    if let Some(selector) = &args.rank {
        let target = resolve(session, selector).await?;
        composer.edit(|draft| draft.attach_rank(Some(target)))?;
    }
    Ok(())
}

async fn resolve(session: &ComposerSession, selector: &str) -> Result<AttachmentTarget> {
    session
        .resolve_attachment(selector)
        .await
        .wrap_err("Failed to load lists")?
        .ok_or_else(|| eyre!("No list or rank matches '{}' (see `marquee lists`)", selector))
}

fn describe_rule(rule: ValidationError) -> &'static str {
    match rule {
        ValidationError::MissingAction => "choose an action",
        ValidationError::MissingMedia => "this action needs --media-id and --media-type",
        ValidationError::MissingContent => "write something with --content (or add a --rating for a review)",
        ValidationError::InsufficientOptions => "a poll needs at least two --option values",
        ValidationError::TooManyOptions => "too many --option values for a poll",
        ValidationError::MissingRankTarget => "pick a rank with --rank",
    }
}

fn render_report(report: &SubmissionReport, output: &Output) {
    output.data(report);
    if !output.is_human() {
        return;
    }

    output.table(
        &["Step", "Result"],
        report
            .steps
            .iter()
            .map(|step| {
                let name = if step.primary {
                    format!("{} (main)", step.step)
                } else {
                    step.step.to_string()
                };
                let result = match &step.outcome {
                    StepOutcome::Completed => "done".green().to_string(),
                    StepOutcome::AlreadyPresent => "already there".yellow().to_string(),
                    StepOutcome::Failed { error } => format!("{} {}", "failed:".red(), error),
                };
                vec![name, result]
            })
            .collect(),
    );

    match report.status {
        SubmissionStatus::Succeeded if report.already_present => {
            output.success(format!("{}: already in that list, nothing changed", report.action))
        }
        SubmissionStatus::Succeeded => output.success(format!("{} submitted", report.action)),
        SubmissionStatus::PartiallyFailed => {}
        SubmissionStatus::Failed => output.error(format!("{} was not submitted", report.action)),
    }
    if let Some(hint) = retry_hint(report) {
        output.info(hint);
    }
}

fn retry_hint(report: &SubmissionReport) -> Option<&'static str> {
    (report.status != SubmissionStatus::Succeeded && report.retryable)
        .then_some("The failure looks temporary; run the same command again to retry.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use media_compose_backend::{BackendError, InMemoryBackend, Operation};
    use media_compose_core::DraftState;
    use std::sync::Arc;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ComposeArgs,
    }

    fn parse(argv: &[&str]) -> ComposeArgs {
        Harness::parse_from(std::iter::once("compose").chain(argv.iter().copied())).args
    }

    fn sample_session() -> ComposerSession {
        let backend = Arc::new(crate::context::sample_backend());
        ComposerSession::new(backend.clone(), backend.clone(), backend)
    }

    #[test]
    fn test_intent_from_action() {
        let args = parse(&["--action", "hot-take", "--content", "Sequels are better"]);
        assert_eq!(args.intent().unwrap(), Intent::Say);
        assert!(parse(&["--content", "x"]).intent().is_err());
    }

    #[test]
    fn test_media_defaults_source_and_title() {
        let args = parse(&["--action", "track", "--media-id", "438631", "--media-type", "film"]);
        let media = args.media().unwrap().unwrap();
        assert_eq!(media.key(), "tmdb:438631");
        assert_eq!(media.title, "438631");
    }

    #[tokio::test]
    async fn test_episode_track_builds_ready_draft() {
        let session = sample_session();
        let composer = session.composer();
        let args = parse(&[
            "--action", "track", "--media-id", "1399", "--media-type", "tv",
            "--media-title", "Game of Thrones", "--season", "1", "--episode", "2",
            "--list", "Cozy Rewatches",
        ]);

        build_draft(&session, &composer, &args).await.unwrap();
        assert!(composer.validate().is_ok());

        let draft = composer.snapshot();
        assert_eq!(draft.episode_selection().unwrap().episode_title, "The Kingsroad");
        assert_eq!(draft.attachments().list.as_ref().unwrap().id, "list-cozy");
        assert_eq!(draft.state(), DraftState::Editing);
    }

    #[tokio::test]
    async fn test_unknown_list_is_an_error() {
        let session = sample_session();
        let composer = session.composer();
        let args = parse(&["--action", "track", "--media-id", "438631", "--media-type", "movie", "--list", "Nope"]);
        assert!(build_draft(&session, &composer, &args).await.is_err());
    }

    #[tokio::test]
    async fn test_action_outside_intent_is_refused() {
        let session = sample_session();
        let composer = session.composer();
        let args = parse(&["--intent", "capture", "--action", "poll"]);
        assert!(build_draft(&session, &composer, &args).await.is_err());
    }

    #[tokio::test]
    async fn test_poll_submits_through_pipeline() {
        let backend = Arc::new(InMemoryBackend::new());
        let session = ComposerSession::new(backend.clone(), backend.clone(), backend.clone());
        let composer = session.composer();
        let args = parse(&[
            "--intent", "play", "--action", "poll", "--content", "Best trilogy?",
            "--option", "Lord of the Rings", "--option", "Before Sunrise",
        ]);

        build_draft(&session, &composer, &args).await.unwrap();
        let report = composer.submit().await.unwrap();
        assert!(report.is_success());
        assert_eq!(backend.polls().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_hint_only_for_transient_failures() {
        let backend = Arc::new(InMemoryBackend::new());
        let session = ComposerSession::new(backend.clone(), backend.clone(), backend.clone());
        let args = parse(&["--action", "hot-take", "--content", "Sequels are better"]);

        backend.fail_once(Operation::CreateFeedPost, BackendError::Network("connection reset".into()));
        let composer = session.composer();
        build_draft(&session, &composer, &args).await.unwrap();
        let report = composer.submit().await.unwrap();
        assert_eq!(report.status, SubmissionStatus::Failed);
        assert!(retry_hint(&report).is_some());

        backend.fail_once(Operation::CreateFeedPost, BackendError::Unauthorized);
        let composer = session.composer();
        build_draft(&session, &composer, &args).await.unwrap();
        let report = composer.submit().await.unwrap();
        assert_eq!(report.status, SubmissionStatus::Failed);
        assert_eq!(retry_hint(&report), None);
    }
}
