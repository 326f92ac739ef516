//! The `resource-with-subscribers` endpoint.
//!
//! Combines a primary resource (`{"data": [{"id", "title", ...}]}`) with its
//! subscription list (`{"data": [{"subscriber": {"first_name", ...}}, ...]}`)
//! into `{"id", "title", "names"}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::aggregate::fetch::{decode, expand_template, fetch_pair};
use crate::aggregate::registry::Aggregator;
use crate::aggregate::types::{AggregationError, RETRIEVE_COMMAND};
use crate::request::ParsedRequest;
use crate::upstream::Upstream;

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    id: Value,
    title: Value,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    subscriber: Subscriber,
}

#[derive(Debug, Deserialize)]
struct Subscriber {
    first_name: Value,
}

/// Merged output document. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub id: Value,
    pub title: Value,
    /// Subscriber first names in upstream order.
    pub names: Vec<Value>,
}

/// Aggregator for a resource and its subscribers.
pub struct ResourceWithSubscribers {
    upstream: Arc<dyn Upstream>,
    resource_uri: String,
    subscriptions_uri: String,
}

impl ResourceWithSubscribers {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        resource_uri: impl Into<String>,
        subscriptions_uri: impl Into<String>,
    ) -> Self {
        Self {
            upstream,
            resource_uri: resource_uri.into(),
            subscriptions_uri: subscriptions_uri.into(),
        }
    }

    /// Build from configured templates: `[resource, subscriptions]`.
    pub fn from_uris(upstream: Arc<dyn Upstream>, uris: &[String]) -> Option<Self> {
        match uris {
            [resource, subscriptions] => Some(Self::new(upstream, resource, subscriptions)),
            _ => None,
        }
    }

    fn merge(
        resource_uri: &str,
        resource: Value,
        subscriptions_uri: &str,
        subscriptions: Value,
    ) -> Result<ResourceSummary, AggregationError> {
        let resource: DataEnvelope<Resource> = decode(resource_uri, resource)?;
        let subscriptions: DataEnvelope<Subscription> = decode(subscriptions_uri, subscriptions)?;

        let first = resource.data.into_iter().next().ok_or_else(|| AggregationError::MalformedPayload {
            uri: resource_uri.to_string(),
            reason: "empty data array".to_string(),
        })?;

        Ok(ResourceSummary {
            id: first.id,
            title: first.title,
            names: subscriptions
                .data
                .into_iter()
                .map(|s| s.subscriber.first_name)
                .collect(),
        })
    }
}

#[async_trait]
impl Aggregator for ResourceWithSubscribers {
    async fn resolve(&self, request: &ParsedRequest) -> Result<String, AggregationError> {
        if request.command != RETRIEVE_COMMAND {
            return Err(AggregationError::UnsupportedOperation {
                command: request.command.clone(),
                endpoint: request.endpoint.clone(),
            });
        }

        let resource_uri = expand_template(&self.resource_uri, &request.endpoint_param);
        let subscriptions_uri = expand_template(&self.subscriptions_uri, &request.endpoint_param);

        let (resource, subscriptions) = fetch_pair(
            self.upstream.as_ref(),
            &resource_uri,
            &subscriptions_uri,
            &request.headers,
        )
        .await?;

        let summary = Self::merge(&resource_uri, resource, &subscriptions_uri, subscriptions)?;
        tracing::debug!(
            endpoint = %request.endpoint,
            param = %request.endpoint_param,
            names = summary.names.len(),
            "Aggregated resource with subscribers"
        );

        serde_json::to_string(&summary).map_err(|e| AggregationError::MalformedPayload {
            uri: resource_uri,
            reason: e.to_string(),
        })
    }
}
