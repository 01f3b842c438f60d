//! GraphQL schema: `health` and `models` queries, `chat` mutation.
//!
//! ```graphql
//! mutation {
//!   chat(input: { message: "Hi", history: [{ role: USER, content: "Hello" }] }) {
//!     content
//!     trimmedMessages
//!     usage { totalTokens }
//!   }
//! }
//! ```
//!
//! Provider failures surface as GraphQL errors whose `extensions` carry the
//! machine-readable `code` and the HTTP-equivalent `status`.

use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, Object, Schema, SimpleObject,
};
use axum::response::{Html, IntoResponse};
use chatrelay::ApiError;
use chatrelay::context::known_models;

use crate::service::{ChatInput, ChatReply, ChatService, Health};

pub type RelaySchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with the shared service attached as context data.
pub fn build_schema(service: Arc<ChatService>) -> RelaySchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}

/// A model and its context window.
#[derive(SimpleObject, Clone, Debug)]
pub struct ModelLimit {
    pub id: String,
    pub context_window: u32,
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Liveness check.
    async fn health(&self, ctx: &Context<'_>) -> async_graphql::Result<Health> {
        let service = ctx.data::<Arc<ChatService>>()?;
        Ok(service.health())
    }

    /// Known models and their context windows. Unlisted models get 4096.
    async fn models(&self) -> Vec<ModelLimit> {
        known_models()
            .into_iter()
            .map(|m| ModelLimit {
                id: m.id,
                context_window: u32::try_from(m.context_window).unwrap_or(u32::MAX),
            })
            .collect()
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Relay one chat turn. History is trimmed to fit the model's context window.
    async fn chat(
        &self,
        ctx: &Context<'_>,
        input: ChatInput,
    ) -> async_graphql::Result<ChatReply> {
        let service = ctx.data::<Arc<ChatService>>()?;
        service.chat(input).await.map_err(to_graphql_error)
    }
}

/// Convert an [`ApiError`] into a GraphQL error with `code`/`status` extensions.
pub fn to_graphql_error(err: ApiError) -> async_graphql::Error {
    let code = err.code();
    let status = i32::from(err.outbound_status());
    async_graphql::Error::new(err.user_message()).extend_with(|_, e| {
        e.set("code", code);
        e.set("status", status);
    })
}

/// GET /graphql — GraphiQL explorer.
pub async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}
