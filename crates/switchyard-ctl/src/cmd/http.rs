//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use switchyard_core::normalize_peer_url;

pub fn endpoint(gateway: &str, path: &str) -> String {
    format!("{}{}", normalize_peer_url(gateway), path)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to gateway at {} — is it running?", url))?
        .json::<T>()
        .await
        .context("failed to parse response")
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<(u16, R)>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to gateway at {} — is it running?", url))?;
    let status = resp.status().as_u16();
    let body = resp.json::<R>().await.context("failed to parse response")?;
    Ok((status, body))
}
