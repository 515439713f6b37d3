//! Text embeddings

use crate::client::CompletionApi;
use crate::config::DEFAULT_EMBEDDING_MODEL;
use crate::types::EmbeddingRequest;
use crate::{Error, Result};
use std::ops::Deref;

/// A vector embedding of a text.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Dot product of two embeddings.
    ///
    /// For normalized vectors, which the API returns, this is the cosine
    /// similarity. Normalization is assumed, not checked. Extra trailing
    /// elements of the longer vector are ignored.
    pub fn dot(&self, other: &Embedding) -> f32 {
        self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl Deref for Embedding {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Computes the embedding of `text` with [`DEFAULT_EMBEDDING_MODEL`].
///
/// Also returns how many tokens the API counted in `text`, which tells how
/// large the text is to the model, e.g. when sizing chunks for retrieval.
///
/// ```rust,no_run
/// use toolchat::{embed, OpenAiClient};
///
/// # async fn example() -> toolchat::Result<()> {
/// let client = OpenAiClient::from_env()?;
/// let (cat, _) = embed(&client, "cat").await?;
/// let (kitten, tokens) = embed(&client, "kitten").await?;
/// println!("similarity {} ({} tokens)", cat.dot(&kitten), tokens);
/// # Ok(())
/// # }
/// ```
pub async fn embed(api: &dyn CompletionApi, text: &str) -> Result<(Embedding, u32)> {
    let request = EmbeddingRequest {
        model: DEFAULT_EMBEDDING_MODEL.to_string(),
        input: vec![text.to_string()],
    };
    let response = api.create_embeddings(&request).await?;

    let data = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| Error::unexpected_response("API returned no embeddings"))?;
    Ok((Embedding(data.embedding), response.usage.prompt_tokens))
}
