//! Onboarding policy text: chunking for the index and lookup by query.

use std::future::Future;

use ekyc_shared::Result;
use ekyc_storage::{PolicyExcerpt, Storage};
use tracing::{info, instrument};

/// Target chunk length in characters.
pub const CHUNK_SIZE: usize = 500;

/// Characters repeated at the start of the following chunk.
pub const CHUNK_OVERLAP: usize = 50;

/// Searchable policy text consulted by the decision engine.
pub trait PolicyLookup: Send + Sync {
    fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<PolicyExcerpt>>> + Send;
}

impl<T: PolicyLookup> PolicyLookup for &T {
    fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<PolicyExcerpt>>> + Send {
        (**self).search(query, limit)
    }
}

impl PolicyLookup for Storage {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<PolicyExcerpt>> {
        self.search_policy(query, limit).await
    }
}

/// Split text into chunks of at most `size` characters that break on word
/// boundaries, each starting with up to `overlap` characters of the previous
/// chunk's trailing words. A single word longer than `size` forms its own
/// chunk.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let mut end = start;
        let mut len = 0;
        while end < words.len() {
            let add = words[end].chars().count() + usize::from(end > start);
            if len + add > size && end > start {
                break;
            }
            len += add;
            end += 1;
        }
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }

        // Walk back over trailing words that fit in the overlap, always
        // advancing by at least one word.
        let mut next = end;
        let mut carried = 0;
        while next > start + 1 {
            let add = words[next - 1].chars().count() + 1;
            if carried + add > overlap {
                break;
            }
            carried += add;
            next -= 1;
        }
        start = next;
    }
    chunks
}

/// Chunk `text` and replace the indexed chunks of `source`.
#[instrument(skip_all, fields(source))]
pub async fn index_policy_text(storage: &Storage, source: &str, text: &str) -> Result<usize> {
    let chunks = chunk_text(text, CHUNK_SIZE, CHUNK_OVERLAP);
    let count = storage.index_policy(source, &chunks).await?;
    info!(chunks = count, "policy text indexed");
    Ok(count)
}
