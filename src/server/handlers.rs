use super::{
    error::{ApiError, ApiResult},
    AppState,
};
use crate::{
    error::Prompt2ImageError,
    models::{GenerationParams, GenerationRequest},
    storage::filename::dotted_extension,
};
use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub image_id: String,
    pub image_url: String,
    pub filename: String,
    pub prompt: String,
}

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to Prompt2Image API",
        "description": "Generate images from text descriptions",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "generate": "POST /generate - create a new image",
            "gallery": "GET /gallery - list stored images",
            "image": "GET /image/{filename} - fetch one image",
            "delete": "DELETE /image/{filename} - remove one image",
            "stats": "GET /stats - storage statistics",
            "models": "GET /models - available models",
            "config": "GET /config - effective settings",
            "health": "GET /health - liveness check",
        }
    }))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "started_at": state.started_at,
        "huggingface_configured": state.config.huggingface_token.is_some(),
    }))
}

pub async fn models(state: web::Data<AppState>) -> HttpResponse {
    let registry = state.pipeline.client().registry();
    HttpResponse::Ok().json(json!({
        "success": true,
        "default": state.config.default_model,
        "models": registry.entries(),
    }))
}

pub async fn config_summary(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.config.summary())
}

pub async fn generate(
    state: web::Data<AppState>,
    body: web::Json<GenerationParams>,
) -> ApiResult<HttpResponse> {
    if !state.limiter.try_acquire() {
        return Err(Prompt2ImageError::RateLimited(format!(
            "at most {} generations per minute",
            state.limiter.limit()
        ))
        .into());
    }

    let request = GenerationRequest::from_params(body.into_inner(), &state.config)?;
    log::info!("🎨 Generation requested: \"{}\"", request.prompt_preview());

    let outcome = state.pipeline.generate(&request).await?;

    Ok(HttpResponse::Ok().json(GenerateResponse {
        success: true,
        message: "Image generated successfully".to_string(),
        image_url: format!("/output/{}", outcome.filename),
        image_id: outcome.image_id,
        filename: outcome.filename,
        prompt: outcome.prompt,
    }))
}

pub async fn gallery(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let images = state.store.list().await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": images.len(),
        "images": images,
    })))
}

pub async fn get_image(
    state: web::Data<AppState>,
    filename: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let filename = filename.into_inner();
    let bytes = state.store.read(&filename).await?;
    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&filename))
        .body(bytes))
}

pub async fn delete_image(
    state: web::Data<AppState>,
    filename: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let filename = filename.into_inner();
    if !state.store.delete_by_filename(&filename).await? {
        return Err(ApiError(Prompt2ImageError::NotFound(filename)));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Image {} deleted", filename),
    })))
}

pub async fn stats(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let info = state.store.storage_info().await?;
    Ok(HttpResponse::Ok().json(json!({
        "total_images": info.total_files,
        "total_size_mb": info.total_size_mb,
        "average_size_mb": info.average_size_mb,
    })))
}

fn content_type_for(filename: &str) -> &'static str {
    match dotted_extension(filename).as_deref() {
        Some(".png") => "image/png",
        Some(".jpg") | Some(".jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }
}
