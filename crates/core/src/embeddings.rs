use crate::models::{Catalog, ProductRecord};
use providers::{EmbeddingProvider, ProviderError, RetryPolicy};
use tracing::{debug, info, warn};

/// Embeds `texts` in chunks of at most `batch_size`, one provider call per chunk.
///
/// Output order matches input order. A chunk whose response length differs
/// from its input length is an invalid response.
pub async fn embed_batched(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    retry: &RetryPolicy,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(texts.len());
    for (n, batch) in texts.chunks(batch_size).enumerate() {
        let resp = retry
            .run("embedding batch", || provider.embed(batch))
            .await?;
        if resp.vectors.len() != batch.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "{} embeddings returned for {} inputs",
                resp.vectors.len(),
                batch.len()
            )));
        }
        debug!("embedded batch {} ({} names)", n + 1, batch.len());
        vectors.extend(resp.vectors);
    }
    Ok(vectors)
}

/// Attaches an embedding to every record with a non-blank cleaned name.
///
/// Records with a blank cleaned name are passed through without a vector and
/// never reach the provider.
pub async fn embed_catalog(
    catalog: Catalog,
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
    retry: &RetryPolicy,
) -> Result<Catalog, ProviderError> {
    let side = catalog.side;
    let records = catalog.into_records();
    let texts: Vec<String> = records
        .iter()
        .filter(|r| !r.cleaned_name.trim().is_empty())
        .map(|r| r.cleaned_name.clone())
        .collect();
    let skipped = records.len() - texts.len();
    if skipped > 0 {
        warn!("{} {} records have no cleaned name; not embedded", skipped, side);
    }

    let mut vectors = embed_batched(provider, &texts, batch_size, retry)
        .await?
        .into_iter();
    let records: Vec<ProductRecord> = records
        .into_iter()
        .map(|r| {
            if r.cleaned_name.trim().is_empty() {
                return r;
            }
            match vectors.next() {
                Some(v) => r.with_embedding(v),
                None => r,
            }
        })
        .collect();

    let catalog = Catalog::new(side, records);
    info!(
        "embedded {}/{} {} records",
        catalog.embedded_count(),
        catalog.len(),
        side
    );
    Ok(catalog)
}
