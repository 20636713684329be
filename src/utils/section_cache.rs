use anyhow::Result;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::{sync::Arc, time::Duration};

/// Distinct section list backing the report filter dropdown. A single entry
/// with a short TTL; writes to the students table invalidate it eagerly.
static SECTION_CACHE: Lazy<Cache<&'static str, Arc<Vec<String>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(Duration::from_secs(300))
        .build()
});

const KEY: &str = "sections";

pub async fn cached_sections(pool: &MySqlPool) -> Result<Arc<Vec<String>>> {
    if let Some(hit) = SECTION_CACHE.get(KEY).await {
        return Ok(hit);
    }

    let sections = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT section FROM students ORDER BY section",
    )
    .fetch_all(pool)
    .await?;

    let sections = Arc::new(sections);
    SECTION_CACHE.insert(KEY, sections.clone()).await;
    Ok(sections)
}

pub async fn invalidate_sections() {
    SECTION_CACHE.invalidate(KEY).await;
}

pub async fn warmup_section_cache(pool: &MySqlPool) -> Result<()> {
    let sections = cached_sections(pool).await?;
    tracing::info!(count = sections.len(), "Section cache warmed up");
    Ok(())
}
