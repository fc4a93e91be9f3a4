use crate::config::AiConfig;
use crate::describe::clean_description;
use crate::llm::client::ChatCompletionsClient;
use crate::llm::types::DescriptionEvent;
use crate::schema::{GenerationWarning, InvoiceSkeleton};
use futures::future::join_all;
use log::{info, warn};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::mpsc::UnboundedSender;

/// Async counterpart of [`crate::describe::enrich_descriptions`].
///
/// Distinct item names are described concurrently; each failure keeps the
/// catalog name and becomes a warning.
pub async fn enrich_descriptions_async(
    client: &ChatCompletionsClient,
    ai: &AiConfig,
    invoices: &mut [InvoiceSkeleton],
    progress: Option<UnboundedSender<DescriptionEvent>>,
) -> Vec<GenerationWarning> {
    let send = |event: DescriptionEvent| {
        if let Some(tx) = &progress {
            let _ = tx.send(event);
        }
    };

    let names: Vec<String> = invoices
        .iter()
        .flat_map(|i| i.line_items.iter().map(|l| l.description.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    send(DescriptionEvent::Starting {
        distinct_items: names.len(),
    });
    info!("Describing {} distinct line items with {}", names.len(), ai.model);

    let results = join_all(
        names
            .iter()
            .map(|name| client.describe(ai, name, &ai.line_item_description_prompt)),
    )
    .await;

    let mut warnings = Vec::new();
    let mut described: HashMap<&str, String> = HashMap::new();
    for (name, result) in names.iter().zip(results) {
        let reason = match result {
            Ok(text) => match clean_description(&text) {
                Some(clean) => {
                    send(DescriptionEvent::Described {
                        item_name: name.clone(),
                    });
                    described.insert(name.as_str(), clean);
                    continue;
                }
                None => "empty description".to_string(),
            },
            Err(e) => e.to_string(),
        };

        warn!("Description for '{}' fell back: {}", name, reason);
        send(DescriptionEvent::Fallback {
            item_name: name.clone(),
            reason: reason.clone(),
        });
        warnings.push(GenerationWarning::DescriptionFallback {
            item_name: name.clone(),
            reason,
        });
    }

    for line in invoices.iter_mut().flat_map(|i| i.line_items.iter_mut()) {
        if let Some(text) = described.get(line.description.as_str()) {
            line.description = text.clone();
        }
    }

    send(DescriptionEvent::Finished);
    warnings
}
