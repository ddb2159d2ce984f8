use media_compose_models::{Episode, ListCatalogEntry, MediaReference, Rating, Season, VoteChoice};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::types::{FeedPostPayload, PollId, PostId, TrackDestination, TrackOptions, TrackReceipt};

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
struct TrackResponse {
    #[serde(default)]
    already_present: bool,
}

/// Search responses come either as a bare array or wrapped in `results`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Bare(Vec<Value>),
    Wrapped { results: Vec<Value> },
}

#[derive(Debug, Serialize)]
struct TrackRequest<'a> {
    media: &'a MediaReference,
    #[serde(flatten)]
    options: &'a TrackOptions,
}

#[derive(Debug, Serialize)]
struct RatingRequest<'a> {
    media: &'a MediaReference,
    rating: Rating,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PollRequest<'a> {
    question: &'a str,
    options: &'a [String],
}

#[derive(Debug, Serialize)]
struct MediaRequest<'a> {
    media: &'a MediaReference,
}

#[derive(Debug, Serialize)]
struct VoteRequest {
    choice: VoteChoice,
}

/// Ids come from external sources (OpenLibrary keys contain `/`), so every
/// path segment is percent-encoded.
fn seg(raw: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(raw)
}

fn request(client: &Client, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
    let builder = client
        .request(method, url)
        .header("Accept", "application/json");
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn error_from_response(response: Response) -> BackendError {
    let status = response.status();
    let url = response.url().to_string();
    let message = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
        StatusCode::NOT_FOUND => BackendError::NotFound(url),
        _ => BackendError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
    let response = builder.send().await?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str, token: Option<&str>) -> Result<T, BackendError> {
    debug!(url = %url, "GET");
    let response = send(request(client, Method::GET, url, token)).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::Parse(format!("{}: {}", url, e)))
}

pub async fn search_media(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    query: &str,
) -> Result<Vec<Value>, BackendError> {
    let url = format!("{}/search", base_url);
    debug!(url = %url, query, "Searching media");
    let response = send(request(client, Method::GET, &url, token).query(&[("q", query)])).await?;
    let parsed: SearchResponse = response
        .json()
        .await
        .map_err(|e| BackendError::Parse(format!("search response: {}", e)))?;
    Ok(match parsed {
        SearchResponse::Bare(results) => results,
        SearchResponse::Wrapped { results } => results,
    })
}

pub async fn get_seasons(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    parent_id: &str,
) -> Result<Vec<Season>, BackendError> {
    let url = format!("{}/media/{}/seasons", base_url, seg(parent_id));
    get_json(client, &url, token).await
}

pub async fn get_episodes(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    parent_id: &str,
    season: u32,
) -> Result<Vec<Episode>, BackendError> {
    let url = format!("{}/media/{}/seasons/{}/episodes", base_url, seg(parent_id), season);
    get_json(client, &url, token).await
}

pub async fn get_genres(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    media: &MediaReference,
) -> Result<Vec<String>, BackendError> {
    let url = format!(
        "{}/media/{}/{}/genres",
        base_url,
        seg(&media.external_source),
        seg(&media.external_id)
    );
    get_json(client, &url, token).await
}

pub async fn list_catalog(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
) -> Result<Vec<ListCatalogEntry>, BackendError> {
    let url = format!("{}/lists", base_url);
    get_json(client, &url, token).await
}

/// System lists and user lists are separate resources; a 409 from either
/// means the item is already there.
pub async fn track_media(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    media: &MediaReference,
    destination: &TrackDestination,
    options: &TrackOptions,
) -> Result<TrackReceipt, BackendError> {
    let url = match destination {
        TrackDestination::System { list_type } => format!("{}/lists/system/{}/items", base_url, seg(list_type)),
        TrackDestination::Custom { list_id } => format!("{}/lists/{}/items", base_url, seg(list_id)),
    };
    debug!(url = %url, media = %media.key(), "Tracking media");

    let response = request(client, Method::POST, &url, token)
        .json(&TrackRequest { media, options })
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::CONFLICT {
        debug!(media = %media.key(), destination = %destination, "Already in list");
        return Ok(TrackReceipt { already_present: true });
    }
    if !status.is_success() {
        return Err(error_from_response(response).await);
    }

    // Some deployments answer 204 with no body
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(TrackReceipt { already_present: false });
    }
    let parsed: TrackResponse = serde_json::from_str(&body).unwrap_or_else(|e| {
        warn!("Unexpected track response body ({}), assuming item was added", e);
        TrackResponse::default()
    });
    Ok(TrackReceipt {
        already_present: parsed.already_present,
    })
}

pub async fn create_feed_post(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    payload: &FeedPostPayload,
) -> Result<PostId, BackendError> {
    let url = format!("{}/posts", base_url);
    let response = send(request(client, Method::POST, &url, token).json(payload)).await?;
    let created: CreatedResponse = response
        .json()
        .await
        .map_err(|e| BackendError::Parse(format!("post response: {}", e)))?;
    Ok(PostId(created.id))
}

pub async fn rate_media(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    media: &MediaReference,
    rating: Rating,
    review: Option<&str>,
) -> Result<(), BackendError> {
    let url = format!("{}/ratings", base_url);
    send(request(client, Method::PUT, &url, token).json(&RatingRequest { media, rating, review })).await?;
    Ok(())
}

pub async fn create_poll(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    question: &str,
    options: &[String],
) -> Result<PollId, BackendError> {
    let url = format!("{}/polls", base_url);
    let response = send(request(client, Method::POST, &url, token).json(&PollRequest { question, options })).await?;
    let created: CreatedResponse = response
        .json()
        .await
        .map_err(|e| BackendError::Parse(format!("poll response: {}", e)))?;
    Ok(PollId(created.id))
}

pub async fn add_rank_item(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    rank_id: &str,
    media: &MediaReference,
) -> Result<(), BackendError> {
    let url = format!("{}/ranks/{}/items", base_url, seg(rank_id));
    let response = request(client, Method::POST, &url, token)
        .json(&MediaRequest { media })
        .send()
        .await?;
    let status = response.status();
    if status.is_success() || status == StatusCode::CONFLICT {
        Ok(())
    } else {
        Err(error_from_response(response).await)
    }
}

pub async fn set_vote(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    target_id: &str,
    choice: VoteChoice,
) -> Result<(), BackendError> {
    let url = format!("{}/reactions/{}/vote", base_url, seg(target_id));
    send(request(client, Method::PUT, &url, token).json(&VoteRequest { choice })).await?;
    Ok(())
}

/// DELETE on a reaction resource (`vote` or `like`).
pub async fn remove_reaction(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    target_id: &str,
    reaction: &str,
) -> Result<(), BackendError> {
    let url = format!("{}/reactions/{}/{}", base_url, seg(target_id), reaction);
    send(request(client, Method::DELETE, &url, token)).await?;
    Ok(())
}

pub async fn set_like(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    target_id: &str,
) -> Result<(), BackendError> {
    let url = format!("{}/reactions/{}/like", base_url, seg(target_id));
    send(request(client, Method::PUT, &url, token)).await?;
    Ok(())
}
