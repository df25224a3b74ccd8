//! Notion push adapter.
//!
//! Pages land in a database partitioned by publish date. The database id is
//! resolved once per process: a previously created id is read from the state
//! file and validated; failing that, the configured parent id is tried as a
//! database directly; failing that, it is treated as a page and a fresh
//! database is created inside it, then remembered for the next run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use html_escape::decode_html_entities;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

use crate::app::{EstuaryError, Result};
use crate::domain::{ContentItem, Platform};
use crate::push::{PushError, Pusher};

const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const DATABASE_TITLE: &str = "Estuary - synced feed items";

/// Notion's title property limit.
const TITLE_LIMIT: usize = 100;
/// Rich-text property limit, with safety margin.
const SUMMARY_LIMIT: usize = 1900;
/// Per-paragraph block limit for page bodies.
const PARAGRAPH_LIMIT: usize = 1800;

#[derive(Debug, Default, Serialize, Deserialize)]
struct NotionState {
    database_id: Option<String>,
    parent_id: Option<String>,
    created_at: Option<String>,
}

pub struct NotionPusher {
    client: Client,
    token: String,
    database_id: String,
}

impl NotionPusher {
    /// Resolve the target database and verify the connection. Any failure
    /// here is a startup configuration error: no job can make progress
    /// without a reachable store.
    pub async fn connect(token: String, parent_id: &str, state_file: &Path) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("estuary/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let state = load_state(state_file);
        if let Some(database_id) = state.database_id {
            if retrieve_database(&client, &token, &database_id).await.is_ok() {
                info!(database_id = %database_id, "using saved Notion database");
                return Ok(Self {
                    client,
                    token,
                    database_id,
                });
            }
            warn!(database_id = %database_id, "saved Notion database id is no longer valid");
        }

        // The configured id may already point at a database.
        if retrieve_database(&client, &token, parent_id).await.is_ok() {
            info!(database_id = %parent_id, "configured id is an existing Notion database");
            save_state(state_file, parent_id, parent_id)?;
            return Ok(Self {
                client,
                token,
                database_id: parent_id.to_string(),
            });
        }

        // Otherwise treat it as a page and create the database inside it.
        let database_id = create_database(&client, &token, parent_id).await?;
        info!(database_id = %database_id, "created Notion database");
        save_state(state_file, &database_id, parent_id)?;

        Ok(Self {
            client,
            token,
            database_id,
        })
    }
}

#[async_trait]
impl Pusher for NotionPusher {
    async fn push(&self, item: &ContentItem) -> std::result::Result<(), PushError> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": page_properties(item),
            "children": page_children(item),
        });

        let response = self
            .client
            .post(format!("{NOTION_API}/pages"))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| PushError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(PushError::Rejected(format!(
            "{}: {}",
            status,
            truncate_chars(&detail, 200)
        )))
    }
}

fn load_state(path: &Path) -> NotionState {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Notion state file is corrupt, rebootstrapping");
                NotionState::default()
            }
        },
        Err(_) => NotionState::default(),
    }
}

fn save_state(path: &Path, database_id: &str, parent_id: &str) -> Result<()> {
    let state = NotionState {
        database_id: Some(database_id.to_string()),
        parent_id: Some(parent_id.to_string()),
        created_at: Some(Utc::now().to_rfc3339()),
    };
    let tmp: PathBuf = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(&state)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

async fn retrieve_database(client: &Client, token: &str, id: &str) -> Result<()> {
    let response = client
        .get(format!("{NOTION_API}/databases/{id}"))
        .bearer_auth(token)
        .header("Notion-Version", NOTION_VERSION)
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(EstuaryError::Push(format!(
            "database {} not retrievable: {}",
            id,
            response.status()
        )))
    }
}

async fn create_database(client: &Client, token: &str, page_id: &str) -> Result<String> {
    let body = json!({
        "parent": { "type": "page_id", "page_id": page_id },
        "title": [{ "type": "text", "text": { "content": DATABASE_TITLE } }],
        "properties": {
            "Title": { "title": {} },
            "Link": { "url": {} },
            "Author": { "rich_text": {} },
            "Published": { "date": {} },
            "Platform": {
                "select": {
                    "options": [
                        { "name": "TWITTER", "color": "blue" },
                        { "name": "WEIBO", "color": "red" },
                    ]
                }
            },
            "User": { "rich_text": {} },
            "Status": {
                "select": {
                    "options": [
                        { "name": "New", "color": "green" },
                        { "name": "Read", "color": "gray" },
                    ]
                }
            },
            "Summary": { "rich_text": {} },
        },
    });

    let response = client
        .post(format!("{NOTION_API}/databases"))
        .bearer_auth(token)
        .header("Notion-Version", NOTION_VERSION)
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        return Err(EstuaryError::Push(format!(
            "cannot create database under {}: {} {}",
            page_id,
            status,
            truncate_chars(&detail, 200)
        )));
    }

    let created: Value = response.json().await?;
    created["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| EstuaryError::Push("database creation response carried no id".into()))
}

/// Map an item onto the database schema. The `Published` date is what the
/// store partitions by, so a synthetic timestamp still yields a valid
/// calendar day.
fn page_properties(item: &ContentItem) -> Value {
    let published = item
        .published_at
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut properties = json!({
        "Title": {
            "title": [{ "text": { "content": truncate_chars(item.display_title(), TITLE_LIMIT) } }]
        },
        "Author": {
            "rich_text": [{ "text": { "content": truncate_chars(&item.author, TITLE_LIMIT) } }]
        },
        "Published": { "date": { "start": published } },
        "Platform": { "select": { "name": item.platform.to_string() } },
        "User": {
            "rich_text": [{ "text": { "content": item.user_label.as_str() } }]
        },
        "Status": { "select": { "name": "New" } },
        "Summary": {
            "rich_text": [{ "text": { "content": truncate_chars(&strip_html(&item.summary_html), SUMMARY_LIMIT) } }]
        },
    });

    if !item.link.is_empty() {
        properties["Link"] = json!({ "url": item.link.as_str() });
    }

    properties
}

/// Page body: summary paragraphs, plus an embed of the original post for
/// Twitter status links.
fn page_children(item: &ContentItem) -> Vec<Value> {
    let mut children = paragraph_blocks(&strip_html(&item.summary_html));

    if item.platform == Platform::Twitter && is_twitter_status_url(&item.link) {
        children.push(json!({
            "object": "block",
            "type": "embed",
            "embed": { "url": item.link.as_str() },
        }));
        children.push(json!({
            "object": "block",
            "type": "divider",
            "divider": {},
        }));
    }

    children
}

/// Split long text into paragraph blocks the API will accept.
fn paragraph_blocks(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(PARAGRAPH_LIMIT)
        .map(|chunk| chunk.iter().collect::<String>())
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": {
                    "rich_text": [{ "type": "text", "text": { "content": segment } }]
                },
            })
        })
        .collect()
}

/// Drop HTML tags, decode entities, and collapse whitespace. Summaries reach
/// this adapter verbatim; any stripping and length limits live here.
fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    decode_html_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

fn is_twitter_status_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    let is_twitter_host = matches!(
        host,
        "twitter.com" | "x.com" | "mobile.twitter.com" | "m.twitter.com"
    );
    is_twitter_host && url.path().contains("/status/")
}
