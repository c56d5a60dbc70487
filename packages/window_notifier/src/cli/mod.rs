//! Client subcommands: flip the window, read it, or follow it live.

pub mod error;

use futures::StreamExt;
use reqwest::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::protocol::BroadcastMessage;
use crate::state::WindowState;
pub use error::ClientError;

/// Where a running notifier can be reached.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub host: String,
    pub control_port: u16,
    pub ws_port: u16,
}

impl Endpoints {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.control_port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/", self.host, self.ws_port)
    }
}

async fn post_command(endpoints: &Endpoints, path: &str) -> Result<(), ClientError> {
    let url = format!("{}/{}", endpoints.base_url(), path);
    let resp = reqwest::Client::new()
        .post(&url)
        .send()
        .await
        .map_err(|e| ClientError::control(&url, e))?;
    if resp.status() != StatusCode::NO_CONTENT {
        return Err(ClientError::Rejected {
            url,
            status: resp.status(),
        });
    }
    Ok(())
}

/// `POST /open`
pub async fn open_command(endpoints: &Endpoints) -> Result<(), ClientError> {
    post_command(endpoints, "open").await
}

/// `POST /close`
pub async fn close_command(endpoints: &Endpoints) -> Result<(), ClientError> {
    post_command(endpoints, "close").await
}

/// Fetch the current state without subscribing.
pub async fn fetch_state(endpoints: &Endpoints) -> Result<WindowState, ClientError> {
    let url = format!("{}/state", endpoints.base_url());
    let resp = reqwest::get(&url)
        .await
        .map_err(|e| ClientError::control(&url, e))?;
    if !resp.status().is_success() {
        return Err(ClientError::Rejected {
            url,
            status: resp.status(),
        });
    }
    let body = resp
        .text()
        .await
        .map_err(|e| ClientError::control(&url, e))?;
    parse_state(&body)
}

fn parse_state(text: &str) -> Result<WindowState, ClientError> {
    serde_json::from_str::<BroadcastMessage>(text)
        .map(WindowState::from)
        .map_err(|_| ClientError::BadFrame(text.to_string()))
}

pub async fn status_command(endpoints: &Endpoints) -> Result<(), ClientError> {
    let state = fetch_state(endpoints).await?;
    println!("{}", state);
    Ok(())
}

/// Follow state changes, calling `on_state` for every frame until the server
/// closes the connection.
pub async fn watch<F>(endpoints: &Endpoints, mut on_state: F) -> Result<(), ClientError>
where
    F: FnMut(WindowState),
{
    let url = endpoints.ws_url();
    let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| ClientError::notification(&url, e))?;
    let (_write, mut read) = stream.split();

    while let Some(msg) = read.next().await {
        match msg.map_err(|e| ClientError::notification(&url, e))? {
            Message::Text(text) => on_state(parse_state(text.as_str())?),
            Message::Close(_) => break,
            other => debug!("Ignoring frame: {:?}", other),
        }
    }
    Ok(())
}

pub async fn watch_command(endpoints: &Endpoints) -> Result<(), ClientError> {
    watch(endpoints, |state| println!("{}", state)).await?;
    eprintln!("[window-notifier: connection closed]");
    Ok(())
}
