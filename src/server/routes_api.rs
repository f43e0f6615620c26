//! Catalog browsing routes.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use anilib_common::{AnimeId, Error};
use anilib_db::models::{Anime, Episode, Subtitle};
use anilib_db::pool::get_conn;
use anilib_db::queries::{animes, episodes, subtitles};
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use super::AppContext;
use crate::metadata::rank_by_similarity;
use crate::scanner::title::sort_by_numeric_sum;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/anime", get(list_anime))
        .route("/anime/:id", get(get_anime))
        .route("/anime/:id/episodes", get(list_anime_episodes))
}

#[derive(Debug, Default, Deserialize)]
pub struct AnimeListQuery {
    /// Rank by title similarity and drop anime that share nothing with it.
    pub search: Option<String>,
}

/// An episode with its attached subtitle files.
#[derive(Debug, Serialize)]
pub struct EpisodeResponse {
    #[serde(flatten)]
    pub episode: Episode,
    pub subtitles: Vec<Subtitle>,
}

fn parse_anime_id(id: &str) -> Result<AnimeId, Error> {
    id.parse()
        .map_err(|_| Error::invalid_input(format!("invalid anime id: {id}")))
}

async fn list_anime(
    State(ctx): State<AppContext>,
    Query(query): Query<AnimeListQuery>,
) -> ApiResult<Json<Vec<Anime>>> {
    let conn = get_conn(&ctx.pool)?;
    let all = animes::list_animes(&conn)?;

    let result = match query.search.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => rank_by_similarity(all, text)
            .into_iter()
            .filter(|scored| scored.score > 0.0)
            .map(|scored| scored.item)
            .collect(),
        _ => all,
    };
    Ok(Json(result))
}

async fn get_anime(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Anime>> {
    let id = parse_anime_id(&id)?;
    let conn = get_conn(&ctx.pool)?;
    let anime = animes::get_anime(&conn, id)?.ok_or_else(|| Error::not_found("anime", id))?;
    Ok(Json(anime))
}

/// Episodes of one anime in display order.
async fn list_anime_episodes(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<EpisodeResponse>>> {
    let id = parse_anime_id(&id)?;
    let conn = get_conn(&ctx.pool)?;
    if animes::get_anime(&conn, id)?.is_none() {
        return Err(Error::not_found("anime", id).into());
    }

    let mut list = episodes::list_episodes_by_anime(&conn, id)?;
    sort_by_numeric_sum(&mut list);

    let mut response = Vec::with_capacity(list.len());
    for episode in list {
        let subtitles = subtitles::list_by_episode(&conn, episode.id)?;
        response.push(EpisodeResponse { episode, subtitles });
    }
    Ok(Json(response))
}
