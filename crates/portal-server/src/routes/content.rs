use crate::catalog::{self, BlogPost, DocSection};
use crate::error::ApiError;
use axum::{
    extract::Path,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

async fn list_posts() -> Json<&'static [BlogPost]> {
    Json(catalog::posts())
}

async fn get_post(Path(id): Path<String>) -> Result<Json<&'static BlogPost>, ApiError> {
    catalog::find_post(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Blog post '{}' not found", id)))
}

async fn list_docs() -> Json<&'static [DocSection]> {
    Json(catalog::doc_sections())
}

async fn sitemap() -> impl IntoResponse {
    let today = chrono::Utc::now().date_naive();
    (
        [
            (header::CONTENT_TYPE, "application/xml"),
            (
                header::CACHE_CONTROL,
                "public, s-maxage=3600, stale-while-revalidate=86400",
            ),
        ],
        catalog::sitemap(today),
    )
}

pub fn routes() -> Router {
    Router::new()
        .route("/blog", get(list_posts))
        .route("/blog/:id", get(get_post))
        .route("/docs", get(list_docs))
        .route("/sitemap.xml", get(sitemap))
}
