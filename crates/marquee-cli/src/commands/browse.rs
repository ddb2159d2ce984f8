use super::open_session;
use crate::context::AppContext;
use crate::output::Output;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use media_compose_core::{AttachmentResolver, SearchOutcome};
use media_compose_models::{MediaReference, MediaType};
use serde_json::json;

pub async fn run_search(ctx: &AppContext, offline: bool, query: &str, output: &Output) -> Result<()> {
    let session = open_session(ctx, offline)?;

    let results = match session.search().search(query).await.wrap_err("Search failed")? {
        SearchOutcome::Results(results) => results,
        SearchOutcome::EmptyQuery => {
            output.warn("Nothing to search for");
            return Ok(());
        }
        // Only one query runs per invocation
        SearchOutcome::Superseded => return Ok(()),
    };

    output.data(&json!({ "query": query, "results": results }));
    if results.is_empty() {
        output.info(format!("No results for \"{}\"", query));
        return Ok(());
    }
    output.table(
        &["Title", "Type", "Creator", "Id"],
        results
            .iter()
            .map(|media| {
                vec![
                    media.title.clone(),
                    media.media_type.to_string(),
                    media.creator.clone().unwrap_or_default(),
                    media.key(),
                ]
            })
            .collect(),
    );
    Ok(())
}

pub async fn run_seasons(ctx: &AppContext, offline: bool, parent_id: &str, output: &Output) -> Result<()> {
    let session = open_session(ctx, offline)?;
    let seasons = session
        .cache()
        .get_seasons(parent_id)
        .await
        .wrap_err_with(|| format!("Failed to load seasons for {}", parent_id))?;

    output.data(&json!({ "parent_id": parent_id, "seasons": seasons }));
    if seasons.is_empty() {
        output.warn(format!("No seasons found for {}", parent_id));
        return Ok(());
    }
    output.table(
        &["Season", "Name", "Episodes"],
        seasons
            .iter()
            .map(|season| {
                vec![
                    season.number.to_string(),
                    season.name.clone().unwrap_or_default(),
                    season.episode_count.map(|c| c.to_string()).unwrap_or_default(),
                ]
            })
            .collect(),
    );
    Ok(())
}

pub async fn run_episodes(ctx: &AppContext, offline: bool, parent_id: &str, season: u32, output: &Output) -> Result<()> {
    let session = open_session(ctx, offline)?;
    let episodes = session
        .cache()
        .get_episodes(parent_id, season)
        .await
        .wrap_err_with(|| format!("Failed to load episodes for {} season {}", parent_id, season))?;

    output.data(&json!({ "parent_id": parent_id, "season": season, "episodes": episodes }));
    if episodes.is_empty() {
        output.warn(format!("No episodes found for {} season {}", parent_id, season));
        return Ok(());
    }
    output.table(
        &["Episode", "Title", "Aired"],
        episodes
            .iter()
            .map(|episode| {
                vec![
                    format!("S{:02}E{:02}", episode.season, episode.number),
                    episode.title.clone(),
                    episode.air_date.map(|d| d.to_string()).unwrap_or_default(),
                ]
            })
            .collect(),
    );
    Ok(())
}

pub async fn run_lists(ctx: &AppContext, offline: bool, output: &Output) -> Result<()> {
    let session = open_session(ctx, offline)?;
    let catalog = session.load_catalog().await.wrap_err("Failed to load lists")?;
    let resolver = AttachmentResolver::new();

    let classified: Vec<_> = catalog
        .iter()
        .map(|entry| (entry, resolver.classify(entry)))
        .collect();

    output.data(&json!({
        "lists": classified
            .iter()
            .map(|(entry, target)| json!({
                "title": entry.title,
                "kind": entry.kind,
                "target": target,
            }))
            .collect::<Vec<_>>()
    }));
    output.table(
        &["Id", "Title", "Kind", "System", "Type"],
        classified
            .iter()
            .map(|(entry, target)| {
                vec![
                    entry.id.clone(),
                    entry.title.clone(),
                    format!("{:?}", entry.kind).to_lowercase(),
                    if target.is_system_list { "yes" } else { "no" }.to_string(),
                    target.inferred_type.clone().unwrap_or_default(),
                ]
            })
            .collect(),
    );
    Ok(())
}

pub async fn run_genres(ctx: &AppContext, offline: bool, specs: &[String], top: usize, output: &Output) -> Result<()> {
    let media = specs
        .iter()
        .map(|spec| parse_media_spec(spec))
        .collect::<Result<Vec<_>>>()?;

    let session = open_session(ctx, offline)?;
    let profile = session.genres().aggregate(&media).await;

    output.data(&profile);
    for key in &profile.failed {
        output.warn(format!("Genre lookup failed for {}", key));
    }
    let ranked = profile.top(top);
    if ranked.is_empty() {
        output.info("No genres found");
        return Ok(());
    }
    output.table(
        &["Genre", "Items"],
        ranked
            .into_iter()
            .map(|(genre, count)| vec![genre.to_string(), count.to_string()])
            .collect(),
    );
    Ok(())
}

/// `TYPE:ID` or `TYPE:SOURCE:ID`. The id doubles as the title.
fn parse_media_spec(spec: &str) -> Result<MediaReference> {
    let mut parts = spec.splitn(3, ':');
    let (Some(kind), Some(second)) = (parts.next(), parts.next()) else {
        return Err(eyre!("Invalid media '{}': expected TYPE:ID or TYPE:SOURCE:ID", spec));
    };
    let media_type =
        MediaType::parse_loose(kind).ok_or_else(|| eyre!("Unknown media type '{}' in '{}'", kind, spec))?;

    let (source, id) = match parts.next() {
        Some(id) => (second.to_lowercase(), id),
        None => (media_type.default_source().to_string(), second),
    };
    if id.trim().is_empty() {
        return Err(eyre!("Invalid media '{}': empty id", spec));
    }
    Ok(MediaReference::new(id, media_type, id, source))
}
