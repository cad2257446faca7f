//! Embed rendering for notices.

use serde::Serialize;
use streamcast_core::chat::Notice;

/// Message body for create/edit endpoints: a single embed.
#[derive(Debug, Serialize)]
pub(crate) struct MessageBody {
    embeds: [Embed; 1],
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
}

pub(crate) fn render(notice: &Notice) -> MessageBody {
    let fields = notice
        .link
        .iter()
        .map(|link| EmbedField {
            name: link.clone(),
            value: String::new(),
        })
        .collect();

    MessageBody {
        embeds: [Embed {
            title: notice.title.clone(),
            description: notice.description.clone(),
            color: notice.color,
            fields,
        }],
    }
}
